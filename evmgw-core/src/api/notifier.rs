//! Contract between the streaming engine and the push transport.

use async_trait::async_trait;
use evmgw_sdk::objects::SubscriptionId;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Failures reported by, or to, the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("transport connection closed")]
    Closed,
    #[error("subscription cancelled by the client")]
    Unsubscribed,
    #[error("failed to deliver notification: {0}")]
    Delivery(String),
}

impl TransportError {
    /// Whether a failed `notify` means the payload was lost. A client that
    /// unsubscribed mid-delivery is an orderly end.
    pub fn is_delivery_failure(&self) -> bool {
        !matches!(self, Self::Unsubscribed)
    }
}

/// Transport-side registration of one subscription.
pub struct RpcSubscription {
    pub id: SubscriptionId,
    /// Errors the transport reports for this subscription. The transport
    /// keeps the sending half until [`Notifier::drop_subscription`].
    pub err: mpsc::Receiver<TransportError>,
}

/// Push side of one client connection.
///
/// The engine never assumes anything about wire encoding; it hands over
/// JSON values and the transport frames them.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Register a subscription under `id`.
    fn create_subscription(&self, id: SubscriptionId) -> RpcSubscription;

    /// Push `payload` to the client for subscription `id`.
    async fn notify(&self, id: &SubscriptionId, payload: Value) -> Result<(), TransportError>;

    /// Cancelled when the connection goes away.
    fn closed(&self) -> CancellationToken;

    /// Forget subscription `id`. Called once its delivery loop has ended.
    fn drop_subscription(&self, id: &SubscriptionId);
}
