//! Contract of the execution engine used for local replay.
//!
//! The engine itself is a black box: it opens a view on forked state for a
//! given block context and executes calls or transactions in it.

use alloy_primitives::{Address, B256, Bytes, U256};
use thiserror::Error;

use super::context::BlockContext;
use crate::models::{DirectCall, TransactionCall};

/// Errors raised by the engine itself, as opposed to a failed execution.
#[derive(Debug, Error)]
pub enum EmulatorError {
    /// The transaction was rejected before execution (nonce, balance, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("emulator failure: {0}")]
    Internal(String),
}

/// Why an execution did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionFailure {
    /// Reverted; the returned data carries the revert reason.
    Reverted,
    /// Any other VM error.
    Failed(String),
}

/// Outcome of executing one call or transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub tx_hash: B256,
    pub gas_consumed: u64,
    pub returned_data: Bytes,
    pub failure: Option<ExecutionFailure>,
}

impl ExecutionResult {
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Execution view pinned to one block context.
pub trait BlockView: Send {
    fn direct_call(&mut self, call: &DirectCall) -> Result<ExecutionResult, EmulatorError>;

    fn run_transaction(&mut self, tx: &TransactionCall) -> Result<ExecutionResult, EmulatorError>;
}

/// Read access to forked state.
pub trait StateReader: Send + Sync {
    fn balance(&self, address: Address) -> U256;

    fn nonce(&self, address: Address) -> u64;

    fn code(&self, address: Address) -> Bytes;

    fn storage_at(&self, address: Address, slot: B256) -> B256;

    /// Execute `data` from `from` without committing anything.
    fn call(&self, from: Address, data: &Bytes) -> Result<ExecutionResult, EmulatorError>;
}

/// Execution engine over forked state.
pub trait Emulator: Send + Sync {
    fn new_block_view(&self, ctx: BlockContext) -> Result<Box<dyn BlockView>, EmulatorError>;

    /// Read view of the state the engine executes against.
    fn state(&self) -> std::sync::Arc<dyn StateReader>;
}
