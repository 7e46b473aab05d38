//! Streamer: drives one [`HeightSubscription`] forward.
//!
//! The streamer waits for one of:
//! - a wake signal from its [`Broadcaster`]
//! - the idle timeout elapsing
//! - cancellation of the subscription
//!
//! On wake or timeout it produces consecutive heights until the next one is
//! not indexed yet or the batch limit is hit. A wake can fire between the
//! end of a batch and the next wait; the timeout bounds how long such a
//! lost wake can delay delivery.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use super::fetcher::HeightFetcher;
use super::subscription::{HeightSubscription, Produced};
use crate::events::{Broadcaster, WakeListener};
use crate::metrics;

/// Outcome of one batch.
enum Batch {
    /// Caught up with the frontier.
    Idle,
    /// Stopped at the batch limit with more heights possibly available.
    LimitReached,
    /// The subscription closed or failed.
    Closed,
}

/// Drive loop for a single subscription.
pub struct Streamer<F: HeightFetcher> {
    listener: WakeListener,
    timeout: Duration,
    limit: usize,
    subscription: HeightSubscription<F>,
}

impl<F: HeightFetcher> Streamer<F> {
    /// Create a streamer.
    ///
    /// The wake listener is registered here, so publishes that happen before
    /// [`Self::stream`] starts are not missed.
    pub fn new(
        broadcaster: &Arc<Broadcaster>,
        timeout: Duration,
        limit: usize,
        subscription: HeightSubscription<F>,
    ) -> Self {
        Self {
            listener: broadcaster.listen(),
            timeout,
            limit: limit.max(1),
            subscription,
        }
    }

    /// Run until the subscription is closed. Closes it on exit.
    pub async fn stream(self) {
        let handle = self.subscription.handle();
        let cancel = handle.cancellation_token();
        info!(
            subscription_id = %handle.id(),
            kind = %handle.kind(),
            start_height = handle.current_cursor(),
            "streamer started"
        );

        loop {
            match self.produce_batch().await {
                Batch::Closed => break,
                Batch::LimitReached => {
                    // let other tasks run, then keep catching up
                    tokio::task::yield_now().await;
                    continue;
                }
                Batch::Idle => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.listener.wait() => {
                    trace!(subscription_id = %handle.id(), "woken by broadcaster");
                }
                _ = tokio::time::sleep(self.timeout) => {
                    trace!(subscription_id = %handle.id(), "idle timeout, re-checking");
                }
            }
        }

        self.subscription.close();
        info!(
            subscription_id = %handle.id(),
            kind = %handle.kind(),
            cursor = handle.current_cursor(),
            "streamer stopped"
        );
    }

    /// Spawn [`Self::stream`] on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.stream())
    }

    async fn produce_batch(&self) -> Batch {
        let kind = self.subscription.handle().kind();
        for _ in 0..self.limit {
            match self.subscription.try_produce().await {
                Produced::Delivered { height } => {
                    debug!(subscription_id = %self.subscription.id(), height, "queued payload");
                    metrics::record_height_streamed(kind);
                }
                Produced::Skipped { height } => {
                    trace!(subscription_id = %self.subscription.id(), height, "nothing to deliver at height");
                    metrics::record_height_streamed(kind);
                }
                Produced::NotReady => return Batch::Idle,
                Produced::Closed | Produced::Failed => return Batch::Closed,
            }
        }
        Batch::LimitReached
    }
}
