#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod api;
pub mod config;
pub mod events;
pub mod indexer;
pub mod metrics;
pub mod models;
pub mod state;
pub mod storage;
pub mod stream;

#[cfg(test)]
pub(crate) mod test_utils;
