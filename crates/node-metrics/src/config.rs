//! Metrics configuration.
//!
//! Configuration is loaded from environment variables once at process
//! start. Nothing here is consulted on update paths.

use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use thiserror::Error;

/// Default Prometheus exposition bind address.
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:9332";

/// Default chain identifier used for the `chain` label.
pub const DEFAULT_CHAIN: &str = "main";

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Exposition endpoint bind address (default: "0.0.0.0:9332").
    pub bind_address: SocketAddr,

    /// Chain or environment identifier stamped on every family as `chain`.
    pub chain: String,

    /// When true every metric group is a no-op and no exporter is started.
    pub disabled: bool,
}

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_raw = vars
            .get("NODE_METRICS_BIND_ADDRESS")
            .map_or(DEFAULT_METRICS_BIND_ADDRESS, String::as_str);
        let bind_address = bind_raw.parse().map_err(|e| {
            ConfigError::InvalidValue(format!("NODE_METRICS_BIND_ADDRESS '{bind_raw}': {e}"))
        })?;

        let chain = vars
            .get("NODE_METRICS_CHAIN")
            .map_or(DEFAULT_CHAIN, String::as_str)
            .trim()
            .to_string();
        if chain.is_empty() {
            return Err(ConfigError::InvalidValue(
                "NODE_METRICS_CHAIN must not be empty".to_string(),
            ));
        }

        let disabled = match vars.get("NODE_METRICS_DISABLED") {
            Some(raw) => parse_flag(raw).ok_or_else(|| {
                ConfigError::InvalidValue(format!("NODE_METRICS_DISABLED '{raw}'"))
            })?,
            None => false,
        };

        Ok(Self {
            bind_address,
            chain,
            disabled,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
