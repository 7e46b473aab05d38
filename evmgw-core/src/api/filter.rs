//! Log matching for a single block.

use alloy_primitives::{B256, U64};
use evmgw_sdk::objects::{FilterCriteria, RpcLog};

use crate::models::Block;
use crate::storage::{ReceiptIndexer, StorageError};

/// Matches logs of one block, identified by its hash, against criteria.
pub struct BlockLogFilter<'a> {
    block: &'a Block,
    block_hash: B256,
    criteria: &'a FilterCriteria,
}

impl<'a> BlockLogFilter<'a> {
    pub fn new(block: &'a Block, block_hash: B256, criteria: &'a FilterCriteria) -> Self {
        Self {
            block,
            block_hash,
            criteria,
        }
    }

    /// Every matching log of the block, in execution order.
    ///
    /// `log_index` counts all logs of the block, matching or not.
    pub async fn matches(&self, receipts: &dyn ReceiptIndexer) -> Result<Vec<RpcLog>, StorageError> {
        let mut matched = Vec::new();
        let mut log_index = 0u64;

        for tx_hash in &self.block.transaction_hashes {
            let receipt = receipts.get_by_transaction_id(*tx_hash).await?;
            for log in &receipt.logs {
                if self.criteria.matches(&log.address, &log.topics) {
                    matched.push(RpcLog {
                        address: log.address,
                        topics: log.topics.clone(),
                        data: log.data.clone(),
                        block_number: U64::from(self.block.height),
                        transaction_hash: *tx_hash,
                        transaction_index: U64::from(receipt.transaction_index),
                        block_hash: self.block_hash,
                        log_index: U64::from(log_index),
                        removed: false,
                    });
                }
                log_index += 1;
            }
        }

        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Log;
    use crate::storage::{ChainWriter, InMemoryStore};
    use crate::test_utils;
    use alloy_primitives::{Address, Bytes};

    fn log(address: u8, topic: u8) -> Log {
        Log {
            address: Address::repeat_byte(address),
            topics: vec![B256::repeat_byte(topic)],
            data: Bytes::from(vec![address, topic]),
        }
    }

    #[tokio::test]
    async fn test_log_index_runs_across_transactions() {
        let store = InMemoryStore::new();
        let first = test_utils::transaction(0);
        let second = test_utils::transaction(1);
        let block = test_utils::block(1, B256::ZERO, &[&first, &second]);
        let receipts = vec![
            test_utils::receipt_with_logs(&first, 1, 0, vec![log(0xaa, 1), log(0xbb, 1)]),
            test_utils::receipt_with_logs(&second, 1, 1, vec![log(0xaa, 2)]),
        ];
        store
            .store_block(block.clone(), vec![first, second.clone()], receipts)
            .await
            .unwrap();

        let criteria = FilterCriteria {
            addresses: vec![Address::repeat_byte(0xaa)],
            topics: vec![],
        };
        let logs = BlockLogFilter::new(&block, block.hash(), &criteria)
            .matches(&store)
            .await
            .unwrap();

        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].log_index, U64::from(0));
        assert_eq!(logs[1].log_index, U64::from(2));
        assert_eq!(logs[1].transaction_hash, second.hash());
        assert_eq!(logs[1].transaction_index, U64::from(1));
        assert_eq!(logs[1].block_hash, block.hash());
    }

    #[tokio::test]
    async fn test_no_match_is_empty() {
        let store = InMemoryStore::new();
        let tx = test_utils::transaction(0);
        let block = test_utils::block(1, B256::ZERO, &[&tx]);
        let receipt = test_utils::receipt_with_logs(&tx, 1, 0, vec![log(0xaa, 1)]);
        store
            .store_block(block.clone(), vec![tx], vec![receipt])
            .await
            .unwrap();

        let criteria = FilterCriteria {
            addresses: vec![],
            topics: vec![vec![B256::repeat_byte(0x77)]],
        };
        let logs = BlockLogFilter::new(&block, block.hash(), &criteria)
            .matches(&store)
            .await
            .unwrap();
        assert!(logs.is_empty());
    }
}
