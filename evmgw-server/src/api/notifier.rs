//! Push side of a WebSocket connection.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use evmgw_core::api::{Notifier, RpcSubscription, TransportError};
use evmgw_sdk::objects::{SubscriptionId, SubscriptionNotification};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Frames queued for the socket writer.
const OUTBOUND_CAPACITY: usize = 64;

struct Entry {
    err: mpsc::Sender<TransportError>,
    /// Cancelled once the subscribe response has been queued.
    ready: CancellationToken,
}

/// [`Notifier`] for one WebSocket connection.
///
/// Responses and pushes share one outbound queue drained by the socket
/// writer, so frames leave in the order they were queued.
pub(crate) struct WsNotifier {
    outbound: mpsc::Sender<String>,
    subscriptions: DashMap<SubscriptionId, Entry>,
    closed: CancellationToken,
}

impl WsNotifier {
    /// A notifier and the receiving end of its outbound queue.
    pub fn new() -> (Arc<Self>, mpsc::Receiver<String>) {
        let (outbound, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let notifier = Arc::new(Self {
            outbound,
            subscriptions: DashMap::new(),
            closed: CancellationToken::new(),
        });
        (notifier, rx)
    }

    /// Queue a response frame.
    pub async fn send(&self, text: String) -> Result<(), TransportError> {
        self.outbound
            .send(text)
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Release pushes held for `id`.
    pub fn activate(&self, id: &SubscriptionId) {
        if let Some(entry) = self.subscriptions.get(id) {
            entry.ready.cancel();
        }
    }

    /// Ask the delivery loop of `id` to stop. Returns whether `id` was
    /// active on this connection.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        let Some((_, entry)) = self.subscriptions.remove(id) else {
            return false;
        };
        // capacity 1 and this is the only report ever sent, so it fits
        if entry.err.try_send(TransportError::Unsubscribed).is_err() {
            tracing::debug!(subscription_id = %id, "delivery loop already gone");
        }
        true
    }

    /// Mark the connection as gone; every delivery loop stops.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Subscriptions whose delivery loop has not finished yet.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

#[async_trait]
impl Notifier for WsNotifier {
    fn create_subscription(&self, id: SubscriptionId) -> RpcSubscription {
        let (err, rx) = mpsc::channel(1);
        self.subscriptions.insert(
            id.clone(),
            Entry {
                err,
                ready: CancellationToken::new(),
            },
        );
        RpcSubscription { id, err: rx }
    }

    async fn notify(&self, id: &SubscriptionId, payload: Value) -> Result<(), TransportError> {
        // clone out so no map guard is held across an await;
        // a missing entry was removed by `eth_unsubscribe`
        let ready = self
            .subscriptions
            .get(id)
            .map(|entry| entry.ready.clone())
            .ok_or(TransportError::Unsubscribed)?;

        tokio::select! {
            biased;
            _ = self.closed.cancelled() => return Err(TransportError::Closed),
            _ = ready.cancelled() => {}
        }

        let text = serde_json::to_string(&SubscriptionNotification::new(id.clone(), payload))
            .map_err(|e| TransportError::Delivery(e.to_string()))?;
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(TransportError::Closed),
            sent = self.outbound.send(text) => sent.map_err(|_| TransportError::Closed),
        }
    }

    fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }

    fn drop_subscription(&self, id: &SubscriptionId) {
        self.subscriptions.remove(id);
    }
}
