//! Indexed chain data as served by the storage layer.

mod block;
mod receipt;
mod transaction;

pub use block::Block;
pub use receipt::{Log, Receipt, ReceiptStatus};
pub use transaction::{DirectCall, DirectCallKind, Transaction, TransactionCall};
