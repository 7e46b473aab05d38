//! Height-cursor subscription.
//!
//! A subscription is split in three parts:
//!
//! - [`HeightSubscription`], the producer, owned by the streamer. It holds
//!   the fetcher and the cursor and pushes payloads into the bounded queue.
//! - [`SubscriptionReceiver`], the consumer end of the queue, owned by the
//!   delivery loop.
//! - [`SubscriptionHandle`], a cheap clonable view used to close the
//!   subscription and inspect its state from anywhere.
//!
//! The cursor only moves forward, one height at a time, and only after the
//! payload for that height has been queued (or the height produced nothing).

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use evmgw_sdk::objects::{SubscriptionId, SubscriptionKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::fetcher::{FetchError, HeightFetcher};

/// Default capacity of a subscription's payload queue.
pub const DEFAULT_BUFFER_LIMIT: usize = 1;

/// Lifecycle of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Producing, or waiting for the next height.
    Active,
    /// Closed, but queued payloads are still waiting to be read.
    Draining,
    /// Terminal.
    Closed,
}

/// Result of one [`HeightSubscription::try_produce`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Produced {
    /// A payload for `height` was queued.
    Delivered { height: u64 },
    /// `height` exists but produced no payload.
    Skipped { height: u64 },
    /// The cursor height is not indexed yet.
    NotReady,
    /// The subscription is closed; nothing was fetched.
    Closed,
    /// The fetch failed for good; the subscription is now closed.
    Failed,
}

#[derive(Debug)]
struct Shared {
    id: SubscriptionId,
    kind: SubscriptionKind,
    cursor: AtomicU64,
    queued: AtomicUsize,
    cancel: CancellationToken,
    failure: OnceLock<FetchError>,
    /// Held while a payload is queued, so a finished `close` is never
    /// followed by another payload.
    gate: Mutex<()>,
}

impl Shared {
    fn close(&self) {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.cancel.cancel();
    }

    fn state(&self) -> SubscriptionState {
        if !self.cancel.is_cancelled() {
            SubscriptionState::Active
        } else if self.queued.load(Ordering::Acquire) > 0 {
            SubscriptionState::Draining
        } else {
            SubscriptionState::Closed
        }
    }
}

/// Producer side of a height-cursor subscription.
pub struct HeightSubscription<F: HeightFetcher> {
    shared: Arc<Shared>,
    fetcher: F,
    tx: mpsc::Sender<F::Output>,
}

impl<F: HeightFetcher> HeightSubscription<F> {
    /// Create a subscription whose first payload is for `start_height`.
    ///
    /// `buffer_limit` is clamped to at least one slot.
    pub fn new(
        id: SubscriptionId,
        kind: SubscriptionKind,
        buffer_limit: usize,
        start_height: u64,
        fetcher: F,
    ) -> (Self, SubscriptionReceiver<F::Output>) {
        let (tx, rx) = mpsc::channel(buffer_limit.max(1));
        let shared = Arc::new(Shared {
            id,
            kind,
            cursor: AtomicU64::new(start_height),
            queued: AtomicUsize::new(0),
            cancel: CancellationToken::new(),
            failure: OnceLock::new(),
            gate: Mutex::new(()),
        });
        let subscription = Self {
            shared: shared.clone(),
            fetcher,
            tx,
        };
        (subscription, SubscriptionReceiver { shared, rx })
    }

    pub fn handle(&self) -> SubscriptionHandle {
        SubscriptionHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn id(&self) -> &SubscriptionId {
        &self.shared.id
    }

    pub fn current_cursor(&self) -> u64 {
        self.shared.cursor.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        self.shared.close();
    }

    /// Fetch the payload at the cursor and queue it.
    ///
    /// Suspends while the queue is full. Closing the subscription aborts the
    /// wait without moving the cursor.
    pub async fn try_produce(&self) -> Produced {
        if self.shared.cancel.is_cancelled() {
            return Produced::Closed;
        }

        let height = self.current_cursor();
        let payload = match self.fetcher.fetch(height).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                self.advance(height);
                return Produced::Skipped { height };
            }
            Err(err) if err.is_not_yet_available() => return Produced::NotReady,
            Err(err) => {
                warn!(
                    subscription_id = %self.shared.id,
                    kind = %self.shared.kind,
                    height,
                    error = %err,
                    "fetch failed, closing subscription"
                );
                // first failure wins
                let _ = self.shared.failure.set(err);
                self.close();
                return Produced::Failed;
            }
        };

        let permit = tokio::select! {
            biased;
            _ = self.shared.cancel.cancelled() => return Produced::Closed,
            permit = self.tx.reserve() => permit,
        };
        let Ok(permit) = permit else {
            debug!(subscription_id = %self.shared.id, "receiver dropped, closing subscription");
            self.close();
            return Produced::Closed;
        };

        let _gate = self.shared.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if self.shared.cancel.is_cancelled() {
            return Produced::Closed;
        }
        self.shared.queued.fetch_add(1, Ordering::AcqRel);
        permit.send(payload);
        self.advance(height);
        Produced::Delivered { height }
    }

    fn advance(&self, height: u64) {
        self.shared.cursor.store(height + 1, Ordering::Release);
    }
}

/// Consumer end of a subscription's payload queue.
pub struct SubscriptionReceiver<T> {
    shared: Arc<Shared>,
    rx: mpsc::Receiver<T>,
}

impl<T> SubscriptionReceiver<T> {
    /// Next queued payload, in height order.
    ///
    /// After the subscription is closed, payloads already queued are still
    /// handed out; `None` is returned once the queue is empty.
    pub async fn recv(&mut self) -> Option<T> {
        let cancel = self.shared.cancel.clone();
        if !cancel.is_cancelled() {
            let received = tokio::select! {
                biased;
                item = self.rx.recv() => Some(item),
                _ = cancel.cancelled() => None,
            };
            if let Some(item) = received {
                return self.take(item);
            }
        }
        self.rx.close();
        let item = self.rx.recv().await;
        self.take(item)
    }

    fn take(&self, item: Option<T>) -> Option<T> {
        if item.is_some() {
            self.shared.queued.fetch_sub(1, Ordering::AcqRel);
        }
        item
    }

    pub fn handle(&self) -> SubscriptionHandle {
        SubscriptionHandle {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for SubscriptionReceiver<T> {
    fn drop(&mut self) {
        // nobody can read what is left
        self.shared.close();
        self.shared.queued.store(0, Ordering::Release);
    }
}

/// Shared view of a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionHandle {
    shared: Arc<Shared>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> &SubscriptionId {
        &self.shared.id
    }

    pub fn kind(&self) -> SubscriptionKind {
        self.shared.kind
    }

    /// Next height the subscription will deliver.
    pub fn current_cursor(&self) -> u64 {
        self.shared.cursor.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SubscriptionState {
        self.shared.state()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Close the subscription. Idempotent.
    pub fn close(&self) {
        self.shared.close();
    }

    /// Resolves once the subscription is closed.
    pub async fn closed(&self) {
        self.shared.cancel.cancelled().await;
    }

    /// The error that closed the subscription, if any.
    pub fn failure(&self) -> Option<&FetchError> {
        self.shared.failure.get()
    }

    pub(crate) fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }
}
