//! # Metrics Test Utilities
//!
//! Shared test utilities for the node-metrics facade.
//!
//! This crate provides:
//! - Recorders that forbid or count registrations (`ForbiddenRecorder`,
//!   `CountingRecorder`)
//! - A test registry with label-subset snapshot queries (`TestRegistry`,
//!   `MetricSnapshot`)
//! - Spy Block and MemPool groups recording every call (`SpyBlockMetrics`,
//!   `SpyMempoolMetrics`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use metrics_test_utils::*;
//! use node_metrics::{BlockMetrics, Container};
//!
//! #[test]
//! fn test_example() {
//!     let registry = TestRegistry::new();
//!     let container = Container::new();
//!     container.init("test", &registry.registry(), false);
//!
//!     container.block().height(700_000.0);
//!
//!     let snapshot = registry.snapshot();
//!     assert_eq!(
//!         snapshot.gauge("block_tip", &[("type", "height")]),
//!         Some(700_000.0)
//!     );
//! }
//! ```

pub mod recorders;
pub mod snapshot;
pub mod spies;

// Re-export commonly used items
pub use recorders::*;
pub use snapshot::*;
pub use spies::*;
