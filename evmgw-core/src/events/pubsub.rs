//! Generic publish/subscribe fan-out.
//!
//! [`Publisher::publish`] invokes every registered [`Subscriber`]
//! synchronously under a read lock, so publishes run in parallel with each
//! other while subscribe/unsubscribe take the write lock. Subscribers must
//! therefore keep [`Subscriber::notify`] short and non-blocking: enqueue,
//! signal, count, never wait.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Capacity of a [`Subscription`]'s error outlet.
pub const ERROR_OUTLET_CAPACITY: usize = 16;

/// Receiver of published data.
pub trait Subscriber<T>: Send + Sync {
    /// Accept one published item. Called while the publisher holds its read
    /// lock; must not block.
    fn notify(&self, data: &T);
}

/// Registry identity of a subscriber: the address of its shared allocation.
fn identity<S: ?Sized>(subscriber: &Arc<S>) -> usize {
    Arc::as_ptr(subscriber) as *const () as usize
}

/// Fan-out registry delivering every published item to every subscriber.
pub struct Publisher<T> {
    subscribers: RwLock<HashMap<usize, Arc<dyn Subscriber<T>>>>,
}

impl<T> Publisher<T> {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Deliver `data` to every currently registered subscriber.
    pub fn publish(&self, data: &T) {
        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for subscriber in subscribers.values() {
            subscriber.notify(data);
        }
    }

    /// Register `subscriber`. Registering the same handle twice keeps a
    /// single registration.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let key = identity(&subscriber);
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, subscriber);
    }

    /// Remove `subscriber` if registered; otherwise a no-op.
    pub fn unsubscribe<S: Subscriber<T> + ?Sized>(&self, subscriber: &Arc<S>) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&identity(subscriber));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<T> Default for Publisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

type Callback<T, E> = Box<dyn Fn(&T) -> Result<(), E> + Send + Sync>;

/// Callback-backed [`Subscriber`] with a bounded error outlet.
///
/// Errors returned by the callback are pushed to the outlet without
/// blocking. When the outlet is full the error is logged and dropped; the
/// publisher is never held up by a subscriber nobody reads errors from.
pub struct Subscription<T, E> {
    callback: Callback<T, E>,
    err_tx: mpsc::Sender<E>,
    err_rx: Mutex<Option<mpsc::Receiver<E>>>,
}

impl<T, E> Subscription<T, E>
where
    E: Display + Send + 'static,
{
    pub fn new(callback: impl Fn(&T) -> Result<(), E> + Send + Sync + 'static) -> Self {
        let (err_tx, err_rx) = mpsc::channel(ERROR_OUTLET_CAPACITY);
        Self {
            callback: Box::new(callback),
            err_tx,
            err_rx: Mutex::new(Some(err_rx)),
        }
    }

    /// Take the error outlet. Only the first call returns it.
    pub fn errors(&self) -> Option<mpsc::Receiver<E>> {
        self.err_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl<T, E> Subscriber<T> for Subscription<T, E>
where
    E: Display + Send + 'static,
{
    fn notify(&self, data: &T) {
        let Err(err) = (self.callback)(data) else {
            return;
        };
        match self.err_tx.try_send(err) {
            Ok(()) => {}
            Err(TrySendError::Full(err)) => {
                warn!(error = %err, "subscriber error outlet full, dropping error");
            }
            Err(TrySendError::Closed(err)) => {
                debug!(error = %err, "subscriber error outlet closed, dropping error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct CountingSubscriber {
        calls: AtomicU64,
    }

    impl CountingSubscriber {
        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Subscriber<u32> for CountingSubscriber {
        fn notify(&self, _data: &u32) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_unsubscribe_before_subscribing() {
        let publisher = Publisher::<u32>::new();
        let subscriber = Arc::new(CountingSubscriber::default());

        publisher.unsubscribe(&subscriber);
        publisher.unsubscribe(&subscriber);
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn test_subscribe_publish_unsubscribe_publish() {
        let publisher = Publisher::<u32>::new();
        let s1 = Arc::new(CountingSubscriber::default());
        let s2 = Arc::new(CountingSubscriber::default());

        publisher.subscribe(s1.clone());
        publisher.subscribe(s2.clone());
        publisher.publish(&1);
        assert_eq!(s1.calls(), 1);
        assert_eq!(s2.calls(), 1);

        publisher.unsubscribe(&s1);
        publisher.publish(&2);
        assert_eq!(s1.calls(), 1);
        assert_eq!(s2.calls(), 2);
    }

    #[test]
    fn test_duplicate_subscribe_registers_once() {
        let publisher = Publisher::<u32>::new();
        let subscriber = Arc::new(CountingSubscriber::default());

        publisher.subscribe(subscriber.clone());
        publisher.subscribe(subscriber.clone());
        assert_eq!(publisher.subscriber_count(), 1);

        publisher.publish(&0);
        assert_eq!(subscriber.calls(), 1);
    }

    #[test]
    fn test_concurrent_subscribe_publish_unsubscribe() {
        let publisher = Arc::new(Publisher::<u32>::new());
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let background = {
            let publisher = publisher.clone();
            let stop = stop.clone();
            std::thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    std::thread::sleep(Duration::from_millis(1));
                    publisher.publish(&0);
                }
            })
        };

        let workers: Vec<_> = (0..10)
            .map(|_| {
                let publisher = publisher.clone();
                std::thread::spawn(move || {
                    let subscribers: Vec<_> = (0..10)
                        .map(|_| Arc::new(CountingSubscriber::default()))
                        .collect();
                    for s in &subscribers {
                        publisher.subscribe(s.clone());
                    }
                    let started = Instant::now();
                    std::thread::sleep(Duration::from_millis(100));
                    for s in &subscribers {
                        publisher.unsubscribe(s);
                    }
                    let elapsed = started.elapsed();
                    (subscribers, elapsed)
                })
            })
            .collect();

        for worker in workers {
            let (subscribers, elapsed) = worker.join().unwrap();
            // Sleep granularity makes the real interval longer than 1ms;
            // allow generous slack, but reject systematic under-delivery.
            let floor = (elapsed.as_millis() as u64 / 4).max(10);
            for s in subscribers {
                assert!(s.calls() >= floor, "only {} calls in {:?}", s.calls(), elapsed);
            }
        }

        stop.store(true, Ordering::SeqCst);
        background.join().unwrap();
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[derive(Debug, PartialEq)]
    struct ProcessingFailed;

    impl Display for ProcessingFailed {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("failed to process data")
        }
    }

    #[tokio::test]
    async fn test_errors_reach_the_subscriber_outlet() {
        let publisher = Publisher::<u32>::new();
        let subscription = Arc::new(Subscription::new(|_: &u32| Err(ProcessingFailed)));
        let healthy = Arc::new(CountingSubscriber::default());
        let mut errors = subscription.errors().unwrap();
        assert!(subscription.errors().is_none());

        publisher.subscribe(subscription.clone());
        publisher.subscribe(healthy.clone());
        publisher.publish(&1);

        let err = tokio::time::timeout(Duration::from_millis(100), errors.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(err, ProcessingFailed);
        // a failing subscriber does not stop delivery to the others
        assert_eq!(healthy.calls(), 1);
    }

    #[test]
    fn test_full_error_outlet_never_blocks_publisher() {
        let publisher = Publisher::<u32>::new();
        let subscription = Arc::new(Subscription::new(|_: &u32| Err(ProcessingFailed)));
        publisher.subscribe(subscription.clone());

        for i in 0..(ERROR_OUTLET_CAPACITY as u32 * 4) {
            publisher.publish(&i);
        }

        let mut errors = subscription.errors().unwrap();
        let mut received = 0;
        while errors.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, ERROR_OUTLET_CAPACITY);
    }
}
