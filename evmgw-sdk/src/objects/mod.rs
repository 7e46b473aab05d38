//! Objects exchanged with subscribers of the gateway event stream.

pub mod block;
pub mod log;
pub mod rpc;
pub mod subscription;
pub mod transaction;

pub use block::HeadSummary;
pub use log::{FilterCriteria, RpcLog};
pub use rpc::{RpcErrorCode, RpcErrorObject, RpcRequest, RpcResponse, SubscriptionNotification, SubscriptionParams};
pub use subscription::{SubscriptionId, SubscriptionKind};
pub use transaction::{PendingTransaction, RpcTransaction};
