//! `eth_subscribe` handlers.
//!
//! Every subscription starts at the block after the current frontier, so
//! only future events are delivered. Subscribing spawns two tasks that live
//! as long as the subscription:
//! - the [`Streamer`] that fills the subscription's queue
//! - the delivery loop that forwards queued payloads to the [`Notifier`]
//!
//! The delivery loop closes the subscription when the transport reports an
//! error, when the connection closes, or when the queue ends.

use std::sync::Arc;

use evmgw_sdk::objects::{FilterCriteria, SubscriptionId, SubscriptionKind};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::adapters::{LogsFetcher, NewHeadsFetcher, PendingTransactionsFetcher};
use super::notifier::{Notifier, RpcSubscription, TransportError};
use crate::config::{ConfigStore, StreamConfig};
use crate::events::{Broadcaster, Broadcasters};
use crate::metrics;
use crate::storage::{BlockIndexer, ReceiptIndexer, StorageError, TransactionIndexer};
use crate::stream::{
    HeightFetcher, HeightSubscription, Streamer, SubscriptionHandle, SubscriptionReceiver,
};

/// Subscribe-time failures. No subscription exists after any of them.
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("notifications not supported")]
    NotificationsUnsupported,

    #[error("exceed max topics: {got} > {max}")]
    ExceedMaxTopics { got: usize, max: usize },

    #[error("exceed max addresses: {got} > {max}")]
    ExceedMaxAddresses { got: usize, max: usize },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Subscription endpoints over the indexed chain data.
#[derive(Clone)]
pub struct StreamApi {
    config: ConfigStore<StreamConfig>,
    blocks: Arc<dyn BlockIndexer>,
    transactions: Arc<dyn TransactionIndexer>,
    receipts: Arc<dyn ReceiptIndexer>,
    broadcasters: Broadcasters,
}

impl StreamApi {
    pub fn new(
        config: ConfigStore<StreamConfig>,
        blocks: Arc<dyn BlockIndexer>,
        transactions: Arc<dyn TransactionIndexer>,
        receipts: Arc<dyn ReceiptIndexer>,
        broadcasters: Broadcasters,
    ) -> Self {
        Self {
            config,
            blocks,
            transactions,
            receipts,
            broadcasters,
        }
    }

    /// Highest indexed height.
    pub async fn block_number(&self) -> Result<u64, StorageError> {
        self.blocks.latest_evm_height().await
    }

    /// A push for every new block.
    pub async fn new_heads(
        &self,
        notifier: Option<&Arc<dyn Notifier>>,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let fetcher = NewHeadsFetcher::new(self.blocks.clone());
        self.new_subscription(
            notifier,
            SubscriptionKind::NewHeads,
            &self.broadcasters.blocks,
            fetcher,
        )
        .await
    }

    /// A push for every new transaction: its hash, or the full object when
    /// `full_tx` is `Some(true)`.
    pub async fn new_pending_transactions(
        &self,
        notifier: Option<&Arc<dyn Notifier>>,
        full_tx: Option<bool>,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let fetcher = PendingTransactionsFetcher::new(
            self.blocks.clone(),
            self.transactions.clone(),
            self.receipts.clone(),
            full_tx,
        );
        self.new_subscription(
            notifier,
            SubscriptionKind::NewPendingTransactions,
            &self.broadcasters.transactions,
            fetcher,
        )
        .await
    }

    /// A push for every new block that has logs matching `criteria`.
    pub async fn logs(
        &self,
        notifier: Option<&Arc<dyn Notifier>>,
        criteria: FilterCriteria,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let limits = self.config.read().await.filter;
        if criteria.topics.len() > limits.max_topics {
            return Err(SubscribeError::ExceedMaxTopics {
                got: criteria.topics.len(),
                max: limits.max_topics,
            });
        }
        if criteria.addresses.len() > limits.max_addresses {
            return Err(SubscribeError::ExceedMaxAddresses {
                got: criteria.addresses.len(),
                max: limits.max_addresses,
            });
        }

        let fetcher = LogsFetcher::new(self.blocks.clone(), self.receipts.clone(), criteria);
        self.new_subscription(
            notifier,
            SubscriptionKind::Logs,
            &self.broadcasters.logs,
            fetcher,
        )
        .await
    }

    async fn new_subscription<F>(
        &self,
        notifier: Option<&Arc<dyn Notifier>>,
        kind: SubscriptionKind,
        broadcaster: &Arc<Broadcaster>,
        fetcher: F,
    ) -> Result<SubscriptionHandle, SubscribeError>
    where
        F: HeightFetcher,
        F::Output: Serialize,
    {
        let notifier = notifier
            .cloned()
            .ok_or(SubscribeError::NotificationsUnsupported)?;

        let config = self.config.snapshot().await;
        // subscribe to the next height the indexer will produce
        let height = self.blocks.latest_evm_height().await? + 1;

        let id = SubscriptionId::random();
        let (subscription, receiver) =
            HeightSubscription::new(id.clone(), kind, config.buffer_limit, height, fetcher);
        let handle = subscription.handle();
        let rpc_sub = notifier.create_subscription(id.clone());

        info!(subscription_id = %id, kind = %kind, evm_height = height, "new subscription created");
        metrics::record_subscription_created(kind);

        Streamer::new(broadcaster, config.timeout, config.limit, subscription).spawn();
        tokio::spawn(deliver(notifier, rpc_sub, receiver));

        Ok(handle)
    }
}

/// Forward queued payloads to the transport until either side ends.
async fn deliver<T: Serialize>(
    notifier: Arc<dyn Notifier>,
    mut rpc_sub: RpcSubscription,
    mut receiver: SubscriptionReceiver<T>,
) {
    let handle = receiver.handle();
    let id = rpc_sub.id.clone();
    let kind = handle.kind();
    let closed = notifier.closed();

    loop {
        tokio::select! {
            biased;
            _ = closed.cancelled() => {
                debug!(subscription_id = %id, kind = %kind, "transport closed");
                break;
            }
            err = rpc_sub.err.recv() => {
                match err {
                    Some(TransportError::Unsubscribed) => {
                        debug!(subscription_id = %id, kind = %kind, "unsubscribed by client");
                    }
                    Some(err) => {
                        error!(subscription_id = %id, kind = %kind, error = %err, "error from rpc subscriber");
                    }
                    None => {
                        debug!(subscription_id = %id, kind = %kind, "rpc subscriber went away");
                    }
                }
                break;
            }
            payload = receiver.recv() => {
                let Some(payload) = payload else {
                    match handle.failure() {
                        Some(err) => warn!(subscription_id = %id, kind = %kind, error = %err, "subscription failed"),
                        None => debug!(subscription_id = %id, kind = %kind, "subscription channel closed"),
                    }
                    break;
                };
                let value = match serde_json::to_value(&payload) {
                    Ok(value) => value,
                    Err(err) => {
                        error!(subscription_id = %id, kind = %kind, error = %err, "failed to encode payload");
                        break;
                    }
                };
                debug!(subscription_id = %id, kind = %kind, "notifying new event");
                if let Err(err) = notifier.notify(&id, value).await {
                    if err.is_delivery_failure() {
                        error!(subscription_id = %id, kind = %kind, error = %err, "failed to notify");
                        metrics::record_notify_failure(kind);
                    } else {
                        debug!(subscription_id = %id, kind = %kind, "unsubscribed while notifying");
                    }
                    break;
                }
            }
        }
    }

    handle.close();
    drop(receiver);
    notifier.drop_subscription(&id);
    metrics::record_subscription_closed(kind);
    info!(subscription_id = %id, kind = %kind, cursor = handle.current_cursor(), "subscription closed");
}
