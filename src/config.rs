//! Server Configuration
//!
//! Bind address, heartbeat timing and connection greeting. Loaded from a
//! JSON file; every field has a default.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hub::heartbeat::DEFAULT_KEEPALIVE_INTERVAL_MS;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8081)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Probe interval handed to the keepalive delegate, in milliseconds
    #[serde(default = "default_keepalive_interval_ms")]
    pub keepalive_interval_ms: u64,

    /// Period of the delegate liveness monitor, in milliseconds
    #[serde(default = "default_monitor_period_ms")]
    pub monitor_period_ms: u64,

    /// Text frame sent to every new connection; `null` disables it
    #[serde(default = "default_welcome_message")]
    pub welcome_message: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_keepalive_interval_ms() -> u64 {
    DEFAULT_KEEPALIVE_INTERVAL_MS
}

fn default_monitor_period_ms() -> u64 {
    10_000
}

fn default_welcome_message() -> Option<String> {
    Some("Welcome from server".to_string())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            keepalive_interval_ms: default_keepalive_interval_ms(),
            monitor_period_ms: default_monitor_period_ms(),
            welcome_message: default_welcome_message(),
        }
    }
}

impl ServerConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: ServerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be > 0".to_string()));
        }
        if self.keepalive_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "keepalive_interval_ms must be > 0".to_string(),
            ));
        }
        if self.monitor_period_ms == 0 {
            return Err(ConfigError::Invalid("monitor_period_ms must be > 0".to_string()));
        }
        Ok(())
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn monitor_period(&self) -> Duration {
        Duration::from_millis(self.monitor_period_ms)
    }
}
