//! Runtime settings of the streaming engine.
//!
//! These are the validated values. Loading and parsing of the config file
//! is done by the server crate.

mod config_store;

pub use config_store::ConfigStore;

use std::time::Duration;

use alloy_primitives::Address;

use crate::stream::DEFAULT_BUFFER_LIMIT;

/// Default idle re-check interval of a streamer.
pub const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(3);
/// Default number of heights a streamer advances per wake.
pub const DEFAULT_STREAM_LIMIT: usize = 10;
/// Default maximum number of topic positions in a logs filter.
pub const DEFAULT_MAX_TOPICS: usize = 4;
/// Default maximum number of addresses in a logs filter.
pub const DEFAULT_MAX_ADDRESSES: usize = 6;

/// Bounds on `logs` filter criteria, checked at subscribe time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterLimits {
    pub max_topics: usize,
    pub max_addresses: usize,
}

impl Default for FilterLimits {
    fn default() -> Self {
        Self {
            max_topics: DEFAULT_MAX_TOPICS,
            max_addresses: DEFAULT_MAX_ADDRESSES,
        }
    }
}

/// Settings every new subscription snapshots when it is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Idle timeout after which a streamer re-checks storage without a wake.
    pub timeout: Duration,
    /// Heights advanced per wake before yielding.
    pub limit: usize,
    /// Capacity of each subscription's payload queue.
    pub buffer_limit: usize,
    pub filter: FilterLimits,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_STREAM_TIMEOUT,
            limit: DEFAULT_STREAM_LIMIT,
            buffer_limit: DEFAULT_BUFFER_LIMIT,
            filter: FilterLimits::default(),
        }
    }
}

/// Chain parameters used when replaying transactions locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Receives transaction fees in replayed blocks.
    pub coinbase: Address,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 545,
            coinbase: Address::ZERO,
        }
    }
}
