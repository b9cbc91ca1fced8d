//! Server configuration from environment variables.
//!
//! # Environment Variables
//!
//! - `PARLEY_LISTEN_ADDR`: TCP listen address (default: `0.0.0.0:4000`)
//! - `PARLEY_SINK_CAPACITY`: per-connection outbound queue depth
//!   (default: 16, must be at least 1)
//!
//! Logging variables are documented in [`crate::telemetry`].

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:4000";
const DEFAULT_SINK_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the chat listener binds to.
    pub listen_addr: SocketAddr,
    /// Per-connection outbound queue depth.
    pub sink_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.parse().expect("Valid default address"),
            sink_capacity: DEFAULT_SINK_CAPACITY,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("PARLEY_LISTEN_ADDR") {
            config.listen_addr = addr.parse().map_err(|e| ConfigError::Invalid {
                var: "PARLEY_LISTEN_ADDR",
                message: format!("'{}' is not a socket address: {}", addr, e),
            })?;
        }

        if let Ok(capacity) = std::env::var("PARLEY_SINK_CAPACITY") {
            let parsed: usize = capacity.parse().map_err(|e| ConfigError::Invalid {
                var: "PARLEY_SINK_CAPACITY",
                message: format!("'{}' is not a number: {}", capacity, e),
            })?;
            if parsed == 0 {
                return Err(ConfigError::Invalid {
                    var: "PARLEY_SINK_CAPACITY",
                    message: "capacity must be at least 1".to_string(),
                });
            }
            config.sink_capacity = parsed;
        }

        Ok(config)
    }

    /// Log the effective configuration at startup.
    pub fn log_config(&self) {
        info!(
            listen_addr = %self.listen_addr,
            sink_capacity = self.sink_capacity,
            "Server configuration loaded"
        );
    }
}
