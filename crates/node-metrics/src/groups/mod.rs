//! Typed metric groups, one per node domain.
//!
//! Each group is a trait with two implementations:
//! - `Live*`: resolves every series through a [`FamilyBuilder`] at
//!   construction and keeps the handles in a fixed key -> handle mapping
//! - `Noop*`: every method is inert and nothing is ever registered
//!
//! The container picks one variant per group at init, so call sites never
//! branch on whether instrumentation is enabled.
//!
//! | Group | Families |
//! |-------|----------|
//! | Block | `block_tip`, `block_connect`, `block_avg` |
//! | MemPool | `mempool`, `mempool_changes`, `mempool_timer`, `mempool_avg`, `mempool_orphans` |
//! | Net | `net_connection`, `net_socket`, `net_bandwidth`, `net_ping`, `net_ping_problem` |
//! | Peer | `peer_msg_process`, `peer_msg_push`, `peer_tx_validation`, `peer_misbehave`, `peer_connection`, `peer_known`, `peer_banned`, `peer_send_msg` |
//! | Tx | `tx_invalid`, `tx_count`, `tx_inputs`, `tx_orphan`, `tx_accepted`, `tx_cache`, `tx_check`, `tx_avg` |
//! | Config | `node_boot_time`, `node_conf`, `initial_block_download` |
//!
//! # Unknown keys
//!
//! Keys outside a group's closed set are never an error. Depending on the
//! method they are dropped or folded into an `unknown` series; see the
//! method docs. Nothing is logged.

pub mod block;
pub mod config;
pub mod mempool;
pub mod net;
pub mod peer;
pub mod tx;

use metrics::{Gauge, Histogram};

use crate::registry::{BucketSpec, Family};

pub use block::{BlockMetrics, BlockTimer, LiveBlockMetrics, NoopBlockMetrics, TipStat};
pub use config::{ConfigCategory, ConfigMetrics, LiveConfigMetrics, NoopConfigMetrics};
pub use mempool::{LiveMempoolMetrics, MempoolMetrics, MempoolStat, NoopMempoolMetrics, RemovalReason};
pub use net::{ConnectionKind, Direction, LiveNetMetrics, NetMetrics, NoopNetMetrics};
pub use peer::{LivePeerMetrics, NoopPeerMetrics, PeerConnectionType, PeerMetrics};
pub use tx::{LiveTxMetrics, NoopTxMetrics, TxMetrics, ValidationResult};

/// Label key used by timer families for the operation name.
pub const OPERATION_LABEL: &str = "operation";

/// Label key used by timer families for the instrumented call site.
pub const METHOD_LABEL: &str = "method";

/// A duration histogram paired with a caller-maintained running average.
///
/// The two are written independently; the average is never derived from
/// the histogram.
pub(crate) struct Timer {
    histogram: Histogram,
    average: Gauge,
}

impl Timer {
    /// Resolve the histogram and average series for `op`.
    pub(crate) fn new(
        histograms: &Family<Histogram>,
        averages: &Family<Gauge>,
        op: &BucketSpec,
        method: &str,
    ) -> Self {
        let labels = [(OPERATION_LABEL, op.name()), (METHOD_LABEL, method)];
        Self {
            histogram: histograms.add(&labels),
            average: averages.add(&labels),
        }
    }

    // i64 to f64 conversion is exact for realistic microsecond durations (< 2^53)
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn record(&self, current: i64, average: f64) {
        self.average.set(average);
        self.histogram.record(current as f64);
    }
}
