//! Height-ordered streaming engine.
//!
//! A subscription owns a cursor, the next height it will deliver, and a
//! bounded queue. A [`Streamer`] advances the cursor whenever its
//! broadcaster wakes it, asking the subscription's [`HeightFetcher`] for
//! the payload at each height. Heights past the indexed frontier come back
//! as [`FetchError::NotYetAvailable`] and are retried on the next wake.

pub mod fetcher;
pub mod streamer;
pub mod subscription;

pub use fetcher::{FetchError, HeightFetcher};
pub use streamer::Streamer;
pub use subscription::{
    DEFAULT_BUFFER_LIMIT, HeightSubscription, Produced, SubscriptionHandle, SubscriptionReceiver,
    SubscriptionState,
};
