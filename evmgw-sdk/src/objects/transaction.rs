use alloy_primitives::{Address, B256, Bytes, U64, U128, U256};
use serde::{Deserialize, Serialize};

/// Fully decorated transaction object, as returned by
/// `eth_getTransactionByHash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    pub block_hash: B256,
    pub block_number: U64,
    pub from: Address,
    pub gas: U64,
    pub gas_price: U128,
    pub hash: B256,
    pub input: Bytes,
    pub nonce: U64,
    pub to: Option<Address>,
    pub transaction_index: U64,
    pub value: U256,
    #[serde(rename = "type")]
    pub tx_type: U64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<U64>,
}

/// Payload pushed to `newPendingTransactions` subscribers.
///
/// Subscribers asking for full transactions receive [`Self::Full`], everyone
/// else only the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PendingTransaction {
    Hash(B256),
    Full(Box<RpcTransaction>),
}

impl PendingTransaction {
    /// Hash of the announced transaction, whichever form was requested.
    pub fn hash(&self) -> B256 {
        match self {
            Self::Hash(hash) => *hash,
            Self::Full(tx) => tx.hash,
        }
    }
}
