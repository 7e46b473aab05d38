//! Subscription API over the streaming engine.
//!
//! [`StreamApi`] implements `eth_subscribe` for the three categories. The
//! transport is abstracted behind [`Notifier`]; a transport that cannot
//! push passes no notifier and gets
//! [`SubscribeError::NotificationsUnsupported`].

pub mod adapters;
pub mod filter;
mod notifier;
mod stream;

pub use adapters::{LogsFetcher, NewHeadsFetcher, PendingTransactionsFetcher, rpc_transaction};
pub use filter::BlockLogFilter;
pub use notifier::{Notifier, RpcSubscription, TransportError};
pub use stream::{StreamApi, SubscribeError};
