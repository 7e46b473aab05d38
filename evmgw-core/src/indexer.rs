//! Ingestion hook.
//!
//! The `Ingestor` is responsible for:
//! - Checking that a new block extends the indexed frontier without a gap
//! - Checking that the transactions and receipts belong to the block
//! - Writing everything through a [`ChainWriter`]
//! - Waking the transactions, logs and blocks [`Broadcaster`]s afterwards
//!
//! [`Broadcaster`]: crate::events::Broadcaster

use std::sync::Arc;

use alloy_primitives::B256;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::events::Broadcasters;
use crate::models::{Block, Receipt, Transaction};
use crate::storage::{ChainWriter, StorageError};

/// Errors that can occur while indexing a block.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The block does not directly follow the indexed frontier.
    #[error("block {height} does not extend frontier {frontier}")]
    OutOfOrder { frontier: u64, height: u64 },

    /// Transaction list differs from the block's transaction hashes.
    #[error("transaction {index} ({hash}) does not match the block")]
    TransactionMismatch { index: usize, hash: B256 },

    /// Receipt list differs from the block's transactions.
    #[error("receipt {index} ({hash}) does not match the block")]
    ReceiptMismatch { index: usize, hash: B256 },

    #[error("block lists {expected} transactions, got {transactions} transactions and {receipts} receipts")]
    CountMismatch {
        expected: usize,
        transactions: usize,
        receipts: usize,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Writes indexed blocks and signals subscribers.
pub struct Ingestor {
    writer: Arc<dyn ChainWriter>,
    broadcasters: Broadcasters,
    /// Serializes the frontier check with the write.
    lock: Mutex<()>,
}

impl Ingestor {
    pub fn new(writer: Arc<dyn ChainWriter>, broadcasters: Broadcasters) -> Self {
        Self {
            writer,
            broadcasters,
            lock: Mutex::new(()),
        }
    }

    /// Index one block. Heights start at 1 and must be contiguous.
    pub async fn index_block(
        &self,
        block: Block,
        transactions: Vec<Transaction>,
        receipts: Vec<Receipt>,
    ) -> Result<(), IngestError> {
        validate(&block, &transactions, &receipts)?;

        let _guard = self.lock.lock().await;
        let frontier = self.writer.latest_evm_height().await?;
        if block.height != frontier + 1 {
            return Err(IngestError::OutOfOrder {
                frontier,
                height: block.height,
            });
        }

        let height = block.height;
        let count = transactions.len();
        self.writer.store_block(block, transactions, receipts).await?;
        debug!(height, "block stored, signalling subscribers");

        self.broadcasters.transactions.publish();
        self.broadcasters.logs.publish();
        self.broadcasters.blocks.publish();

        info!(height, transactions = count, "indexed block");
        Ok(())
    }
}

fn validate(block: &Block, transactions: &[Transaction], receipts: &[Receipt]) -> Result<(), IngestError> {
    let expected = block.transaction_hashes.len();
    if transactions.len() != expected || receipts.len() != expected {
        return Err(IngestError::CountMismatch {
            expected,
            transactions: transactions.len(),
            receipts: receipts.len(),
        });
    }

    for (index, (hash, tx)) in block.transaction_hashes.iter().zip(transactions).enumerate() {
        if tx.hash() != *hash {
            return Err(IngestError::TransactionMismatch {
                index,
                hash: tx.hash(),
            });
        }
    }
    for (index, (hash, receipt)) in block.transaction_hashes.iter().zip(receipts).enumerate() {
        if receipt.tx_hash != *hash || receipt.block_number != block.height {
            return Err(IngestError::ReceiptMismatch {
                index,
                hash: receipt.tx_hash,
            });
        }
    }
    Ok(())
}
