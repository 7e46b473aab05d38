//! Event fan-out for the streaming engine.
//!
//! # Event Flow
//!
//! 1. The ingestor stores height `N` and publishes on the
//!    transactions, logs and blocks [`Broadcaster`]s
//! 2. Every [`WakeListener`] of that category wakes its streamer
//! 3. Streamers pull the new heights from storage themselves
//!
//! Broadcasts carry no data; consumers always re-read storage.

pub mod broadcaster;
pub mod pubsub;

pub use broadcaster::{Broadcaster, Broadcasters, EventCategory, WakeListener};
pub use pubsub::{ERROR_OUTLET_CAPACITY, Publisher, Subscriber, Subscription};
