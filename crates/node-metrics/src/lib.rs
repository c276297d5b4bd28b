//! Labeled metric families for blockchain node runtime events.
//!
//! The node reports block processing, mempool churn, peer and network
//! activity and configuration through typed metric groups. Each group has a
//! live variant that writes pre-registered series and a no-op variant used
//! when metrics are disabled. Groups are held by a [`Container`] that is
//! initialized once at startup:
//!
//! ```no_run
//! use node_metrics::BlockMetrics;
//!
//! let config = node_metrics::Config::from_env()?;
//! let metrics = node_metrics::init(&config)?;
//! metrics.block().height(700_000.0);
//! # Ok::<(), node_metrics::MetricsError>(())
//! ```

#![warn(clippy::pedantic)]

/// Environment configuration
pub mod config;

/// Process-wide group container
pub mod container;

/// Error types
pub mod errors;

/// Prometheus exposition
pub mod exporter;

/// Typed metric groups
pub mod groups;

/// Validation event bridge
pub mod notifications;

/// Label sets and metric families over a `metrics` recorder
pub mod registry;

pub use config::{Config, ConfigError};
pub use container::{init, instance, Container};
pub use errors::MetricsError;
pub use groups::{
    BlockMetrics, ConfigMetrics, MempoolMetrics, NetMetrics, PeerMetrics, TxMetrics,
};
pub use notifications::{MetricsNotifier, TipIndex, TxSummary, ValidationListener};
pub use registry::{FamilyBuilder, LabelSet, MetricsRegistry};
