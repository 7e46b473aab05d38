//! In-memory storage backend.
//!
//! Keeps every indexed block, transaction and receipt in RAM. Used by the
//! server binary and by tests.

use std::collections::{BTreeMap, HashMap};

use alloy_primitives::B256;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BlockIndexer, ChainWriter, ReceiptIndexer, StorageError, TransactionIndexer};
use crate::models::{Block, Receipt, Transaction};

#[derive(Default)]
struct Tables {
    blocks: BTreeMap<u64, Block>,
    transactions: HashMap<B256, Transaction>,
    receipts: HashMap<B256, Receipt>,
}

/// In-memory chain-data store.
///
/// All data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed blocks.
    pub async fn block_count(&self) -> usize {
        self.tables.read().await.blocks.len()
    }
}

#[async_trait]
impl BlockIndexer for InMemoryStore {
    async fn get_by_height(&self, height: u64) -> Result<Block, StorageError> {
        self.tables
            .read()
            .await
            .blocks
            .get(&height)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn latest_evm_height(&self) -> Result<u64, StorageError> {
        Ok(self
            .tables
            .read()
            .await
            .blocks
            .last_key_value()
            .map(|(height, _)| *height)
            .unwrap_or(0))
    }
}

#[async_trait]
impl TransactionIndexer for InMemoryStore {
    async fn get(&self, hash: B256) -> Result<Transaction, StorageError> {
        self.tables
            .read()
            .await
            .transactions
            .get(&hash)
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl ReceiptIndexer for InMemoryStore {
    async fn get_by_transaction_id(&self, hash: B256) -> Result<Receipt, StorageError> {
        self.tables
            .read()
            .await
            .receipts
            .get(&hash)
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl ChainWriter for InMemoryStore {
    async fn store_block(
        &self,
        block: Block,
        transactions: Vec<Transaction>,
        receipts: Vec<Receipt>,
    ) -> Result<(), StorageError> {
        // One write guard for the whole block, so readers never see the
        // block without its transactions and receipts.
        let mut tables = self.tables.write().await;
        for tx in transactions {
            tables.transactions.insert(tx.hash(), tx);
        }
        for receipt in receipts {
            tables.receipts.insert(receipt.tx_hash, receipt);
        }
        tables.blocks.insert(block.height, block);
        Ok(())
    }
}
