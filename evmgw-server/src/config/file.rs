//! TOML file configuration structures.
//!
//! These structs directly map to the `evmgw-config.toml` file format.
//! Every section is optional; missing values fall back to the engine
//! defaults.

use evmgw_core::config::{
    DEFAULT_MAX_ADDRESSES, DEFAULT_MAX_TOPICS, DEFAULT_STREAM_LIMIT, DEFAULT_STREAM_TIMEOUT,
};
use evmgw_core::stream::DEFAULT_BUFFER_LIMIT;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub stream: StreamSection,
    #[serde(default)]
    pub filter: FilterSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8545").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8545))
}

/// Streamer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSection {
    /// Idle re-check interval in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Heights advanced per wake.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Payloads queued per subscription.
    #[serde(default = "default_buffer_limit")]
    pub buffer_limit: usize,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            limit: default_limit(),
            buffer_limit: default_buffer_limit(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_STREAM_TIMEOUT.as_millis() as u64
}

fn default_limit() -> usize {
    DEFAULT_STREAM_LIMIT
}

fn default_buffer_limit() -> usize {
    DEFAULT_BUFFER_LIMIT
}

/// Bounds on `logs` subscription criteria.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSection {
    #[serde(default = "default_max_topics")]
    pub max_topics: usize,
    #[serde(default = "default_max_addresses")]
    pub max_addresses: usize,
}

impl Default for FilterSection {
    fn default() -> Self {
        Self {
            max_topics: default_max_topics(),
            max_addresses: default_max_addresses(),
        }
    }
}

fn default_max_topics() -> usize {
    DEFAULT_MAX_TOPICS
}

fn default_max_addresses() -> usize {
    DEFAULT_MAX_ADDRESSES
}
