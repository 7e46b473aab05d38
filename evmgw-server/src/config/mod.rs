//! Configuration module for evmgw-server.
//!
//! Handles loading configuration from the TOML file and CLI overrides,
//! and turns it into the engine's [`StreamConfig`].

pub mod file;

use crate::config::file::FileConfig;
use evmgw_core::config::{FilterLimits, StreamConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Server settings that only take effect at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub stream: StreamConfig,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read the TOML file, apply CLI overrides and validate.
    ///
    /// A missing file is not an error: the defaults are used.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let mut file_config = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => toml::from_str::<FileConfig>(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %self.config_path.display(),
                    "config file not found, using defaults"
                );
                FileConfig::default()
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;
        Ok(build_loaded_config(file_config))
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.stream.timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "stream.timeout_ms must be greater than zero".into(),
        ));
    }
    let checks = [
        ("stream.limit", config.stream.limit),
        ("stream.buffer_limit", config.stream.buffer_limit),
        ("filter.max_topics", config.filter.max_topics),
        ("filter.max_addresses", config.filter.max_addresses),
    ];
    for (name, value) in checks {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{name} must be greater than zero"
            )));
        }
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
        },
        stream: StreamConfig {
            timeout: Duration::from_millis(file_config.stream.timeout_ms),
            limit: file_config.stream.limit,
            buffer_limit: file_config.stream.buffer_limit,
            filter: FilterLimits {
                max_topics: file_config.filter.max_topics,
                max_addresses: file_config.filter.max_addresses,
            },
        },
    }
}
