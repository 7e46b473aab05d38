//! Local transaction replay and state reads.
//!
//! [`BlockState`] re-executes indexed transactions on an [`Emulator`] so
//! their outcome can be checked against the indexed receipts, and
//! [`LocalClient`] answers read queries from the same forked state.

mod block_state;
mod context;
mod emulator;
mod local_client;

pub use block_state::{BlockState, StateError};
pub use context::{
    BlockContext, BlockHashes, DIRECT_CALL_BASE_GAS_USAGE, DIRECT_CALL_GAS_PRICE, MAX_BLOCK_HASHES,
};
pub use emulator::{
    BlockView, Emulator, EmulatorError, ExecutionFailure, ExecutionResult, StateReader,
};
pub use local_client::{EvmClient, LocalClient, LocalClientError};
