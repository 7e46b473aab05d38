//! Per-category fetchers binding stored chain data to outbound payloads.

use std::sync::Arc;

use alloy_primitives::{B256, U64, U128};
use async_trait::async_trait;
use evmgw_sdk::objects::{FilterCriteria, HeadSummary, PendingTransaction, RpcLog, RpcTransaction};

use super::filter::BlockLogFilter;
use crate::models::{Block, Receipt, Transaction};
use crate::storage::{BlockIndexer, ReceiptIndexer, TransactionIndexer};
use crate::stream::{FetchError, HeightFetcher};

async fn block_at(blocks: &dyn BlockIndexer, height: u64) -> Result<Block, FetchError> {
    blocks
        .get_by_height(height)
        .await
        .map_err(|err| FetchError::storage(height, err))
}

/// Project a stored transaction into its RPC form.
pub fn rpc_transaction(tx: &Transaction, receipt: &Receipt, block_hash: B256) -> RpcTransaction {
    RpcTransaction {
        block_hash,
        block_number: U64::from(receipt.block_number),
        from: tx.from(),
        gas: U64::from(tx.gas_limit()),
        gas_price: U128::from(tx.gas_price()),
        hash: tx.hash(),
        input: tx.input().clone(),
        nonce: U64::from(tx.nonce()),
        to: tx.to(),
        transaction_index: U64::from(receipt.transaction_index),
        value: tx.value(),
        tx_type: U64::from(tx.tx_type()),
        chain_id: tx.chain_id().map(U64::from),
    }
}

/// `newHeads`: one head summary per block.
pub struct NewHeadsFetcher {
    blocks: Arc<dyn BlockIndexer>,
}

impl NewHeadsFetcher {
    pub fn new(blocks: Arc<dyn BlockIndexer>) -> Self {
        Self { blocks }
    }
}

#[async_trait]
impl HeightFetcher for NewHeadsFetcher {
    type Output = HeadSummary;

    async fn fetch(&self, height: u64) -> Result<Option<HeadSummary>, FetchError> {
        let block = block_at(self.blocks.as_ref(), height).await?;
        Ok(Some(HeadSummary {
            hash: block.hash(),
            number: U64::from(block.height),
            parent_hash: block.parent_block_hash,
            receipts_root: block.receipt_root,
            transactions: block.transaction_hashes,
        }))
    }
}

/// `newPendingTransactions`: the single transaction of each block, as a
/// hash or as a full object.
pub struct PendingTransactionsFetcher {
    blocks: Arc<dyn BlockIndexer>,
    transactions: Arc<dyn TransactionIndexer>,
    receipts: Arc<dyn ReceiptIndexer>,
    full_tx: bool,
}

impl PendingTransactionsFetcher {
    /// `full_tx` of `None` or `Some(false)` announces hashes only.
    pub fn new(
        blocks: Arc<dyn BlockIndexer>,
        transactions: Arc<dyn TransactionIndexer>,
        receipts: Arc<dyn ReceiptIndexer>,
        full_tx: Option<bool>,
    ) -> Self {
        Self {
            blocks,
            transactions,
            receipts,
            full_tx: full_tx.unwrap_or(false),
        }
    }
}

#[async_trait]
impl HeightFetcher for PendingTransactionsFetcher {
    type Output = PendingTransaction;

    async fn fetch(&self, height: u64) -> Result<Option<PendingTransaction>, FetchError> {
        let block = block_at(self.blocks.as_ref(), height).await?;

        // TODO: announce every transaction once blocks can carry more than one
        let [hash] = block.transaction_hashes.as_slice() else {
            return Err(FetchError::UnexpectedTransactionCount {
                height,
                count: block.transaction_hashes.len(),
            });
        };
        let hash = *hash;

        let tx = self
            .transactions
            .get(hash)
            .await
            .map_err(|err| FetchError::storage(height, err))?;
        let receipt = self
            .receipts
            .get_by_transaction_id(hash)
            .await
            .map_err(|err| FetchError::storage(height, err))?;

        if !self.full_tx {
            return Ok(Some(PendingTransaction::Hash(tx.hash())));
        }
        Ok(Some(PendingTransaction::Full(Box::new(rpc_transaction(
            &tx,
            &receipt,
            block.hash(),
        )))))
    }
}

/// `logs`: the logs of each block that match the subscriber's criteria.
/// Blocks without a match produce nothing.
pub struct LogsFetcher {
    blocks: Arc<dyn BlockIndexer>,
    receipts: Arc<dyn ReceiptIndexer>,
    criteria: FilterCriteria,
}

impl LogsFetcher {
    pub fn new(
        blocks: Arc<dyn BlockIndexer>,
        receipts: Arc<dyn ReceiptIndexer>,
        criteria: FilterCriteria,
    ) -> Self {
        Self {
            blocks,
            receipts,
            criteria,
        }
    }
}

#[async_trait]
impl HeightFetcher for LogsFetcher {
    type Output = Vec<RpcLog>;

    async fn fetch(&self, height: u64) -> Result<Option<Vec<RpcLog>>, FetchError> {
        let block = block_at(self.blocks.as_ref(), height).await?;
        let logs = BlockLogFilter::new(&block, block.hash(), &self.criteria)
            .matches(self.receipts.as_ref())
            .await
            .map_err(|err| FetchError::storage(height, err))?;
        Ok((!logs.is_empty()).then_some(logs))
    }
}
