use alloy_primitives::{Address, B256, Bytes};

/// Outcome of a transaction as recorded by the execution layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Failed,
    Successful,
}

/// A log emitted during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// An indexed transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: B256,
    pub block_number: u64,
    pub transaction_index: u64,
    pub status: ReceiptStatus,
    pub gas_used: u64,
    pub cumulative_gas_used: u64,
    pub contract_address: Option<Address>,
    pub logs: Vec<Log>,
    pub revert_reason: Bytes,
    /// Encoded precompiled-contract calls observed during execution; replay
    /// needs them to reproduce the same outcome.
    pub precompiled_calls: Bytes,
}

impl Receipt {
    pub fn is_successful(&self) -> bool {
        self.status == ReceiptStatus::Successful
    }
}
