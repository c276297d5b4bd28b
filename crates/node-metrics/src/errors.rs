//! Error types for the metrics facade.
//!
//! Errors only surface at process start (configuration, exporter install).
//! Update calls on metric groups never fail.

use crate::config::ConfigError;
use thiserror::Error;

/// Metrics facade error type.
#[derive(Debug, Clone, Error)]
pub enum MetricsError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A histogram bucket layout is empty or not strictly increasing.
    #[error("Invalid histogram buckets for {family}/{operation}")]
    InvalidBuckets {
        family: &'static str,
        operation: &'static str,
    },

    /// The Prometheus exporter could not be built or installed.
    #[error("Exporter error: {0}")]
    Exporter(String),
}

/// Result type alias using `MetricsError`.
pub type Result<T> = std::result::Result<T, MetricsError>;
