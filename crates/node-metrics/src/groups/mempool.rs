//! Mempool metrics.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `mempool` | Gauge | `type` (size, bytes, usage, fee) |
//! | `mempool_changes` | Counter | `type` (vin, vout, bytes, amount, removed), `reason` |
//! | `mempool_timer` | Histogram | `operation`, `method` |
//! | `mempool_avg` | Gauge | `operation`, `method` |
//! | `mempool_orphans` | Gauge | `type` (size, outpoint) |
//!
//! # Removal reasons
//!
//! Removal reason codes index a fixed array of counters, one per
//! [`RemovalReason`] plus a trailing `unknown` slot. Codes past the last
//! named reason all land in `unknown`, which caps the series count no
//! matter how many codes the event source defines.

use metrics::{Counter, Gauge};

use super::Timer;
use crate::registry::{BucketSpec, FamilyBuilder};

pub const STAT_FAMILY: &str = "mempool";
pub const CHANGES_FAMILY: &str = "mempool_changes";
pub const TIMER_FAMILY: &str = "mempool_timer";
pub const AVERAGE_FAMILY: &str = "mempool_avg";
pub const ORPHAN_FAMILY: &str = "mempool_orphans";

const ACCEPT_METHOD: &str = "MemPoolAccept::AcceptSingleTransactions";
const TIMER_METHOD: &str = "AcceptToMemoryPool";
const ORPHAN_METHOD: &str = "TxOrphanage::AddTx";

pub const MEMPOOL_ACCEPT: BucketSpec =
    BucketSpec::new("accept", &[1000.0, 10_000.0, 50_000.0, 100_000.0]);

/// Label value of the overflow removal counter.
pub const UNKNOWN_REASON: &str = "unknown";

/// Aggregate mempool statistics, one `mempool` series each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MempoolStat {
    /// Number of transactions.
    Size,
    /// Sum of transaction virtual sizes.
    Bytes,
    /// Dynamic memory usage.
    Usage,
    /// Total fees.
    Fee,
}

impl MempoolStat {
    pub const ALL: [MempoolStat; 4] = [
        MempoolStat::Size,
        MempoolStat::Bytes,
        MempoolStat::Usage,
        MempoolStat::Fee,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MempoolStat::Size => "size",
            MempoolStat::Bytes => "bytes",
            MempoolStat::Usage => "usage",
            MempoolStat::Fee => "fee",
        }
    }
}

/// Why a transaction left the mempool. Discriminants are the wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalReason {
    Expiry = 0,
    SizeLimit = 1,
    Reorg = 2,
    Block = 3,
    Conflict = 4,
    Replaced = 5,
}

impl RemovalReason {
    pub const ALL: [RemovalReason; 6] = [
        RemovalReason::Expiry,
        RemovalReason::SizeLimit,
        RemovalReason::Reorg,
        RemovalReason::Block,
        RemovalReason::Conflict,
        RemovalReason::Replaced,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RemovalReason::Expiry => "expiry",
            RemovalReason::SizeLimit => "size-limit",
            RemovalReason::Reorg => "reorg",
            RemovalReason::Block => "block",
            RemovalReason::Conflict => "conflict",
            RemovalReason::Replaced => "replaced",
        }
    }

    #[must_use]
    pub const fn code(&self) -> u32 {
        *self as u32
    }
}

/// Counter slot for a removal reason code.
///
/// Named reasons occupy `0..RemovalReason::ALL.len()`; every other code
/// maps to the overflow slot at `RemovalReason::ALL.len()`.
#[must_use]
pub fn removal_slot(reason: u32) -> usize {
    usize::try_from(reason)
        .unwrap_or(usize::MAX)
        .min(RemovalReason::ALL.len())
}

/// Mempool domain metrics.
pub trait MempoolMetrics: Send + Sync {
    /// Observe one acceptance duration (us) and overwrite its running average.
    fn accept_time(&self, current: i64, avg: f64);

    fn transactions(&self, stat: MempoolStat, amt: i64);

    /// Count an accepted transaction's inputs, outputs, size and output value.
    fn incoming(&self, inputs: usize, outputs: usize, bytes: u64, amount: i64);

    /// Count a removal by reason code; see [`removal_slot`].
    fn removed(&self, reason: u32);

    fn orphans(&self, map: usize, outpoints: usize);
}

pub struct LiveMempoolMetrics {
    accept: Timer,
    stats: Vec<Gauge>,
    incoming_inputs: Counter,
    incoming_outputs: Counter,
    incoming_bytes: Counter,
    incoming_amount: Counter,
    removed: Vec<Counter>,
    orphan_size: Gauge,
    orphan_outpoints: Gauge,
}

impl LiveMempoolMetrics {
    #[must_use]
    pub fn new(builder: &FamilyBuilder) -> Self {
        let accept = Timer::new(
            &builder.histogram(TIMER_FAMILY, &[]),
            &builder.gauge(AVERAGE_FAMILY, &[]),
            &MEMPOOL_ACCEPT,
            TIMER_METHOD,
        );

        let stat_family = builder.gauge(STAT_FAMILY, &[("method", ACCEPT_METHOD)]);
        let stats = MempoolStat::ALL
            .iter()
            .map(|stat| stat_family.add(&[("type", stat.as_str())]))
            .collect();

        let changes = builder.counter(CHANGES_FAMILY, &[("method", ACCEPT_METHOD)]);
        let removed = RemovalReason::ALL
            .iter()
            .map(RemovalReason::as_str)
            .chain(std::iter::once(UNKNOWN_REASON))
            .map(|reason| changes.add(&[("type", "removed"), ("reason", reason)]))
            .collect();

        let orphans = builder.gauge(ORPHAN_FAMILY, &[("method", ORPHAN_METHOD)]);

        Self {
            accept,
            stats,
            incoming_inputs: changes.add(&[("type", "vin")]),
            incoming_outputs: changes.add(&[("type", "vout")]),
            incoming_bytes: changes.add(&[("type", "bytes")]),
            incoming_amount: changes.add(&[("type", "amount")]),
            removed,
            orphan_size: orphans.add(&[("type", "size")]),
            orphan_outpoints: orphans.add(&[("type", "outpoint")]),
        }
    }
}

impl MempoolMetrics for LiveMempoolMetrics {
    fn accept_time(&self, current: i64, avg: f64) {
        self.accept.record(current, avg);
    }

    // i64 to f64 conversion is exact for realistic pool sizes and fees (< 2^53)
    #[allow(clippy::cast_precision_loss)]
    fn transactions(&self, stat: MempoolStat, amt: i64) {
        if let Some(gauge) = self.stats.get(stat as usize) {
            gauge.set(amt as f64);
        }
    }

    fn incoming(&self, inputs: usize, outputs: usize, bytes: u64, amount: i64) {
        self.incoming_inputs.increment(inputs as u64);
        self.incoming_outputs.increment(outputs as u64);
        self.incoming_bytes.increment(bytes);
        // Output values are never negative for valid transactions
        self.incoming_amount
            .increment(u64::try_from(amount).unwrap_or(0));
    }

    fn removed(&self, reason: u32) {
        if let Some(counter) = self.removed.get(removal_slot(reason)) {
            counter.increment(1);
        }
    }

    // usize to f64 conversion is safe for realistic orphan counts
    #[allow(clippy::cast_precision_loss)]
    fn orphans(&self, map: usize, outpoints: usize) {
        self.orphan_size.set(map as f64);
        self.orphan_outpoints.set(outpoints as f64);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMempoolMetrics;

impl MempoolMetrics for NoopMempoolMetrics {
    fn accept_time(&self, _current: i64, _avg: f64) {}

    fn transactions(&self, _stat: MempoolStat, _amt: i64) {}

    fn incoming(&self, _inputs: usize, _outputs: usize, _bytes: u64, _amount: i64) {}

    fn removed(&self, _reason: u32) {}

    fn orphans(&self, _map: usize, _outpoints: usize) {}
}
