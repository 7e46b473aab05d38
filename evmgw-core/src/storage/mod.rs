//! Read contract of the chain-data store.
//!
//! The indexer that fills the store runs independently of the event
//! stream; asking for a height past the indexed frontier yields
//! [`StorageError::NotFound`], which the stream treats as "retry later".

mod memory;

pub use memory::InMemoryStore;

use crate::models::{Block, Receipt, Transaction};
use alloy_primitives::B256;
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested entity is not (yet) indexed.
    #[error("entity not found")]
    NotFound,

    /// Any other backend failure.
    #[error("storage failure: {0}")]
    Internal(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Block lookups by height.
#[async_trait]
pub trait BlockIndexer: Send + Sync {
    async fn get_by_height(&self, height: u64) -> Result<Block, StorageError>;

    /// Highest indexed height, the frontier. `0` for an empty store.
    async fn latest_evm_height(&self) -> Result<u64, StorageError>;
}

/// Transaction lookups by hash.
#[async_trait]
pub trait TransactionIndexer: Send + Sync {
    async fn get(&self, hash: B256) -> Result<Transaction, StorageError>;
}

/// Receipt lookups by transaction hash.
#[async_trait]
pub trait ReceiptIndexer: Send + Sync {
    async fn get_by_transaction_id(&self, hash: B256) -> Result<Receipt, StorageError>;
}

/// Write side used by the ingestion hook.
#[async_trait]
pub trait ChainWriter: BlockIndexer {
    /// Persist a block together with its transactions and receipts.
    async fn store_block(
        &self,
        block: Block,
        transactions: Vec<Transaction>,
        receipts: Vec<Receipt>,
    ) -> Result<(), StorageError>;
}
