//! Per-category wake signals.
//!
//! A [`Broadcaster`] carries no payload. Publishing wakes every registered
//! [`WakeListener`]; a burst of publishes while a listener is busy collapses
//! into a single pending wake.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::trace;

use super::pubsub::{Publisher, Subscriber};

/// Category of indexed data a [`Broadcaster`] signals about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Blocks,
    Transactions,
    Logs,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::Transactions => "transactions",
            Self::Logs => "logs",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct WakeSignal {
    notify: Notify,
}

impl Subscriber<()> for WakeSignal {
    fn notify(&self, _: &()) {
        // stores at most one permit
        self.notify.notify_one();
    }
}

/// Payload-free "new data" signal for one [`EventCategory`].
pub struct Broadcaster {
    category: EventCategory,
    publisher: Publisher<()>,
}

impl Broadcaster {
    pub fn new(category: EventCategory) -> Self {
        Self {
            category,
            publisher: Publisher::new(),
        }
    }

    pub fn category(&self) -> EventCategory {
        self.category
    }

    /// Wake every current listener.
    pub fn publish(&self) {
        trace!(category = %self.category, "broadcasting wake signal");
        self.publisher.publish(&());
    }

    /// Register a new listener. It is deregistered when dropped.
    pub fn listen(self: &Arc<Self>) -> WakeListener {
        let signal = Arc::new(WakeSignal {
            notify: Notify::new(),
        });
        self.publisher.subscribe(signal.clone());
        WakeListener {
            broadcaster: Arc::clone(self),
            signal,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.publisher.subscriber_count()
    }
}

/// Registration on a [`Broadcaster`].
pub struct WakeListener {
    broadcaster: Arc<Broadcaster>,
    signal: Arc<WakeSignal>,
}

impl WakeListener {
    /// Wait for the next wake. Returns immediately if a publish happened
    /// since the last call.
    pub async fn wait(&self) {
        self.signal.notify.notified().await;
    }
}

impl Drop for WakeListener {
    fn drop(&mut self) {
        self.broadcaster.publisher.unsubscribe(&self.signal);
    }
}

/// The three process-wide broadcasters, created once at startup and handed
/// to whoever produces or consumes indexed data.
#[derive(Clone)]
pub struct Broadcasters {
    pub blocks: Arc<Broadcaster>,
    pub transactions: Arc<Broadcaster>,
    pub logs: Arc<Broadcaster>,
}

impl Broadcasters {
    pub fn new() -> Self {
        Self {
            blocks: Arc::new(Broadcaster::new(EventCategory::Blocks)),
            transactions: Arc::new(Broadcaster::new(EventCategory::Transactions)),
            logs: Arc::new(Broadcaster::new(EventCategory::Logs)),
        }
    }

    pub fn get(&self, category: EventCategory) -> &Arc<Broadcaster> {
        match category {
            EventCategory::Blocks => &self.blocks,
            EventCategory::Transactions => &self.transactions,
            EventCategory::Logs => &self.logs,
        }
    }
}

impl Default for Broadcasters {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_burst_collapses_into_one_wake() {
        let broadcaster = Arc::new(Broadcaster::new(EventCategory::Blocks));
        let listener = broadcaster.listen();

        for _ in 0..5 {
            broadcaster.publish();
        }

        timeout(Duration::from_millis(100), listener.wait())
            .await
            .unwrap();
        // the remaining publishes did not queue further wakes
        assert!(
            timeout(Duration::from_millis(50), listener.wait())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_publish_before_wait_is_not_lost() {
        let broadcaster = Arc::new(Broadcaster::new(EventCategory::Logs));
        let listener = broadcaster.listen();
        broadcaster.publish();
        timeout(Duration::from_millis(100), listener.wait())
            .await
            .unwrap();
    }

    #[test]
    fn test_dropping_listener_deregisters() {
        let broadcaster = Arc::new(Broadcaster::new(EventCategory::Transactions));
        let first = broadcaster.listen();
        let second = broadcaster.listen();
        assert_eq!(broadcaster.listener_count(), 2);

        drop(first);
        assert_eq!(broadcaster.listener_count(), 1);
        drop(second);
        assert_eq!(broadcaster.listener_count(), 0);
        broadcaster.publish();
    }

    #[test]
    fn test_broadcasters_by_category() {
        let broadcasters = Broadcasters::new();
        for category in [
            EventCategory::Blocks,
            EventCategory::Transactions,
            EventCategory::Logs,
        ] {
            assert_eq!(broadcasters.get(category).category(), category);
        }
    }
}
