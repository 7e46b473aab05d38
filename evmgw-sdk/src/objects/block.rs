use alloy_primitives::{B256, U64};
use serde::{Deserialize, Serialize};

/// Payload pushed to `newHeads` subscribers.
///
/// Only the fields the gateway indexes are populated; it is a subset of the
/// header object returned by `eth_getBlockByNumber`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadSummary {
    pub hash: B256,
    pub number: U64,
    pub parent_hash: B256,
    pub receipts_root: B256,
    pub transactions: Vec<B256>,
}
