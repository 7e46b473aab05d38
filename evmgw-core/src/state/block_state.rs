//! Replays indexed transactions against forked state.

use std::sync::Arc;

use alloy_primitives::B256;
use thiserror::Error;
use tracing::{debug, warn};

use super::context::{
    BlockContext, BlockHashes, DIRECT_CALL_BASE_GAS_USAGE, DIRECT_CALL_GAS_PRICE,
};
use super::emulator::{Emulator, EmulatorError, ExecutionResult, StateReader};
use crate::config::ChainConfig;
use crate::models::{Block, Receipt, Transaction};
use crate::storage::{BlockIndexer, ReceiptIndexer, StorageError};

/// Errors that can occur while replaying a transaction.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("emulator error: {0}")]
    Emulator(#[from] EmulatorError),

    /// The replay disagrees with the indexed receipt. Callers should fall
    /// back to the remote node.
    #[error(
        "replay of {tx_hash} diverged from its receipt: failed {replayed_failed} vs {indexed_failed}, gas {replayed_gas} vs {indexed_gas}"
    )]
    ReceiptMismatch {
        tx_hash: B256,
        indexed_failed: bool,
        replayed_failed: bool,
        indexed_gas: u64,
        replayed_gas: u64,
    },
}

/// State of the chain as of one indexed block.
pub struct BlockState {
    block: Block,
    chain: ChainConfig,
    emulator: Arc<dyn Emulator>,
    blocks: Arc<dyn BlockIndexer>,
    receipts: Arc<dyn ReceiptIndexer>,
}

impl BlockState {
    pub fn new(
        block: Block,
        chain: ChainConfig,
        emulator: Arc<dyn Emulator>,
        blocks: Arc<dyn BlockIndexer>,
        receipts: Arc<dyn ReceiptIndexer>,
    ) -> Self {
        Self {
            block,
            chain,
            emulator,
            blocks,
            receipts,
        }
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Read view of the forked state.
    pub fn reader(&self) -> Arc<dyn StateReader> {
        self.emulator.state()
    }

    /// Re-execute `tx` in this block and check the outcome against its
    /// indexed receipt.
    pub async fn execute(&self, tx: &Transaction) -> Result<ExecutionResult, StateError> {
        let tx_hash = tx.hash();
        let receipt = self.receipts.get_by_transaction_id(tx_hash).await?;

        if !receipt.is_successful() {
            warn!(
                %tx_hash,
                revert_reason = %String::from_utf8_lossy(&receipt.revert_reason),
                "replaying unsuccessful transaction"
            );
        }

        let ctx = self.block_context(&receipt).await?;
        let mut view = self.emulator.new_block_view(ctx)?;

        let result = match tx {
            Transaction::DirectCall(call) => {
                debug!(%tx_hash, kind = ?call.kind, "executing direct call");
                view.direct_call(call)?
            }
            Transaction::TransactionCall(call) => {
                debug!(%tx_hash, "executing transaction call");
                view.run_transaction(call)?
            }
        };

        let indexed_failed = !receipt.is_successful();
        if result.failed() != indexed_failed || result.gas_consumed != receipt.gas_used {
            return Err(StateError::ReceiptMismatch {
                tx_hash,
                indexed_failed,
                replayed_failed: result.failed(),
                indexed_gas: receipt.gas_used,
                replayed_gas: result.gas_consumed,
            });
        }

        Ok(result)
    }

    async fn block_context(&self, receipt: &Receipt) -> Result<BlockContext, StateError> {
        let block_hashes = BlockHashes::load(self.blocks.as_ref(), self.block.height).await?;
        Ok(BlockContext {
            chain_id: self.chain.chain_id,
            block_number: self.block.height,
            block_timestamp: self.block.timestamp,
            direct_call_base_gas_usage: DIRECT_CALL_BASE_GAS_USAGE,
            direct_call_gas_price: DIRECT_CALL_GAS_PRICE,
            gas_fee_collector: self.chain.coinbase,
            random: self.block.prev_randao,
            block_hashes,
            precompiled_calls: receipt.precompiled_calls.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DirectCall, DirectCallKind, ReceiptStatus, TransactionCall};
    use crate::state::emulator::{BlockView, ExecutionFailure};
    use crate::state::testing::MockState;
    use crate::storage::{ChainWriter, InMemoryStore};
    use crate::test_utils;
    use alloy_primitives::{Address, Bytes, U256};
    use std::sync::Mutex;

    /// Replays everything with a fixed outcome and records the contexts.
    struct FixedEmulator {
        gas: u64,
        failure: Option<ExecutionFailure>,
        executed: Arc<Mutex<Vec<(&'static str, BlockContext)>>>,
    }

    struct FixedView {
        ctx: BlockContext,
        gas: u64,
        failure: Option<ExecutionFailure>,
        executed: Arc<Mutex<Vec<(&'static str, BlockContext)>>>,
    }

    impl FixedView {
        fn run(&mut self, label: &'static str, tx_hash: B256) -> ExecutionResult {
            self.executed.lock().unwrap().push((label, self.ctx.clone()));
            ExecutionResult {
                tx_hash,
                gas_consumed: self.gas,
                returned_data: Bytes::new(),
                failure: self.failure.clone(),
            }
        }
    }

    impl BlockView for FixedView {
        fn direct_call(&mut self, call: &DirectCall) -> Result<ExecutionResult, EmulatorError> {
            Ok(self.run("direct", call.hash()))
        }

        fn run_transaction(&mut self, tx: &TransactionCall) -> Result<ExecutionResult, EmulatorError> {
            Ok(self.run("transaction", tx.hash))
        }
    }

    impl Emulator for FixedEmulator {
        fn new_block_view(&self, ctx: BlockContext) -> Result<Box<dyn BlockView>, EmulatorError> {
            Ok(Box::new(FixedView {
                ctx,
                gas: self.gas,
                failure: self.failure.clone(),
                executed: self.executed.clone(),
            }))
        }

        fn state(&self) -> Arc<dyn StateReader> {
            Arc::new(MockState::default())
        }
    }

    fn direct_call() -> Transaction {
        Transaction::DirectCall(DirectCall {
            kind: DirectCallKind::Deposit,
            from: Address::ZERO,
            to: Address::repeat_byte(3),
            data: Bytes::new(),
            value: U256::from(5u64),
            gas_limit: 21_000,
            nonce: 0,
        })
    }

    struct Setup {
        state: BlockState,
        executed: Arc<Mutex<Vec<(&'static str, BlockContext)>>>,
        txs: Vec<Transaction>,
    }

    /// Three blocks; block 3 holds a direct call, block 2 a signed transaction.
    async fn setup(gas: u64, failure: Option<ExecutionFailure>, status: ReceiptStatus) -> Setup {
        let store = Arc::new(InMemoryStore::new());
        let txs = vec![test_utils::transaction(0), test_utils::transaction(1), direct_call()];
        let mut last = None;
        for (i, tx) in txs.iter().enumerate() {
            let height = i as u64 + 1;
            let block = test_utils::block(height, B256::ZERO, &[tx]);
            let mut receipt = test_utils::receipt(tx, height, 0);
            receipt.status = status;
            receipt.precompiled_calls = Bytes::from_static(b"calls");
            store
                .store_block(block.clone(), vec![tx.clone()], vec![receipt])
                .await
                .unwrap();
            last = Some(block);
        }

        let executed = Arc::new(Mutex::new(Vec::new()));
        let emulator = Arc::new(FixedEmulator {
            gas,
            failure,
            executed: executed.clone(),
        });
        let chain = ChainConfig {
            chain_id: 646,
            coinbase: Address::repeat_byte(0xcb),
        };
        let state = BlockState::new(
            last.unwrap(),
            chain,
            emulator,
            store.clone(),
            store,
        );
        Setup {
            state,
            executed,
            txs,
        }
    }

    #[tokio::test]
    async fn test_dispatch_by_transaction_kind() {
        let setup = setup(21_000, None, ReceiptStatus::Successful).await;

        setup.state.execute(&setup.txs[2]).await.unwrap();
        setup.state.execute(&setup.txs[1]).await.unwrap();

        let executed = setup.executed.lock().unwrap();
        assert_eq!(executed[0].0, "direct");
        assert_eq!(executed[1].0, "transaction");

        let ctx = &executed[0].1;
        assert_eq!(ctx.chain_id, 646);
        assert_eq!(ctx.block_number, 3);
        assert_eq!(ctx.gas_fee_collector, Address::repeat_byte(0xcb));
        assert_eq!(ctx.block_hashes.len(), 2);
        assert_ne!(ctx.block_hashes.get(2), B256::ZERO);
        assert_eq!(ctx.precompiled_calls, Bytes::from_static(b"calls"));
    }

    #[tokio::test]
    async fn test_gas_divergence_is_reported() {
        let setup = setup(50_000, None, ReceiptStatus::Successful).await;
        let err = setup.state.execute(&setup.txs[0]).await.unwrap_err();
        assert!(matches!(
            err,
            StateError::ReceiptMismatch {
                indexed_gas: 21_000,
                replayed_gas: 50_000,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_failed_receipt_replays_as_failure() {
        let setup = setup(
            21_000,
            Some(ExecutionFailure::Reverted),
            ReceiptStatus::Failed,
        )
        .await;
        let result = setup.state.execute(&setup.txs[0]).await.unwrap();
        assert!(result.failed());

        let setup = setup_mismatch().await;
        assert!(matches!(
            setup.state.execute(&setup.txs[0]).await.unwrap_err(),
            StateError::ReceiptMismatch {
                indexed_failed: false,
                replayed_failed: true,
                ..
            }
        ));
    }

    async fn setup_mismatch() -> Setup {
        setup(
            21_000,
            Some(ExecutionFailure::Failed("out of gas".into())),
            ReceiptStatus::Successful,
        )
        .await
    }

    #[tokio::test]
    async fn test_missing_receipt_is_a_storage_error() {
        let setup = setup(21_000, None, ReceiptStatus::Successful).await;
        let unknown = test_utils::transaction(99);
        assert!(matches!(
            setup.state.execute(&unknown).await.unwrap_err(),
            StateError::Storage(StorageError::NotFound)
        ));
    }
}
