//! Block tip and block connection metrics.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `block_tip` | Gauge | `type` (see [`TipStat`]) |
//! | `block_connect` | Histogram | `operation`, `method` (see [`BlockTimer`]) |
//! | `block_avg` | Gauge | `operation`, `method` |

use std::collections::HashMap;

use metrics::Gauge;

use super::Timer;
use crate::registry::{BucketSpec, FamilyBuilder};

pub const TIP_FAMILY: &str = "block_tip";
pub const TIMER_FAMILY: &str = "block_connect";
pub const AVERAGE_FAMILY: &str = "block_avg";

pub const BLOCK_LOAD: BucketSpec = BucketSpec::new("load", &[5.0, 10.0, 25.0, 100.0]);
pub const BLOCK_CONNECT: BucketSpec = BucketSpec::new("connect", &[500.0, 1000.0, 1500.0, 3000.0]);
pub const BLOCK_FLUSH_VIEW: BucketSpec =
    BucketSpec::new("flush-view", &[100.0, 200.0, 500.0, 1000.0]);
pub const BLOCK_FLUSH_DISK: BucketSpec = BucketSpec::new("flush-disk", &[10.0, 25.0, 75.0, 100.0]);
pub const BLOCK_UPDATE_TIP: BucketSpec =
    BucketSpec::new("update-tip", &[25.0, 75.0, 100.0, 200.0]);
pub const BLOCK_FORK_CHECK: BucketSpec = BucketSpec::new("fork-check", &[5.0, 10.0, 25.0, 50.0]);
pub const BLOCK_UPDATE_INDEX: BucketSpec =
    BucketSpec::new("update-index", &[5.0, 10.0, 25.0, 50.0]);

/// Statistics of the current tip, one `block_tip` series each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TipStat {
    Size,
    SizeWitness,
    Weight,
    Height,
    Version,
    Transactions,
    SigOps,
    HeaderTime,
    Difficulty,
}

impl TipStat {
    pub const ALL: [TipStat; 9] = [
        TipStat::Size,
        TipStat::SizeWitness,
        TipStat::Weight,
        TipStat::Height,
        TipStat::Version,
        TipStat::Transactions,
        TipStat::SigOps,
        TipStat::HeaderTime,
        TipStat::Difficulty,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TipStat::Size => "size",
            TipStat::SizeWitness => "size-witness",
            TipStat::Weight => "weight",
            TipStat::Height => "height",
            TipStat::Version => "version",
            TipStat::Transactions => "transactions",
            TipStat::SigOps => "sigops",
            TipStat::HeaderTime => "header-time",
            TipStat::Difficulty => "difficulty",
        }
    }
}

/// Timed stages of connecting a new tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockTimer {
    Load,
    Connect,
    FlushView,
    FlushDisk,
    UpdateTip,
    ForkCheck,
    UpdateIndex,
}

impl BlockTimer {
    pub const ALL: [BlockTimer; 7] = [
        BlockTimer::Load,
        BlockTimer::Connect,
        BlockTimer::FlushView,
        BlockTimer::FlushDisk,
        BlockTimer::UpdateTip,
        BlockTimer::ForkCheck,
        BlockTimer::UpdateIndex,
    ];

    #[must_use]
    pub const fn spec(&self) -> BucketSpec {
        match self {
            BlockTimer::Load => BLOCK_LOAD,
            BlockTimer::Connect => BLOCK_CONNECT,
            BlockTimer::FlushView => BLOCK_FLUSH_VIEW,
            BlockTimer::FlushDisk => BLOCK_FLUSH_DISK,
            BlockTimer::UpdateTip => BLOCK_UPDATE_TIP,
            BlockTimer::ForkCheck => BLOCK_FORK_CHECK,
            BlockTimer::UpdateIndex => BLOCK_UPDATE_INDEX,
        }
    }

    /// The validation routine the stage is measured in.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            BlockTimer::Load
            | BlockTimer::Connect
            | BlockTimer::FlushView
            | BlockTimer::FlushDisk
            | BlockTimer::UpdateTip => "ConnectTip",
            BlockTimer::ForkCheck | BlockTimer::UpdateIndex => "ConnectBlock",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Block domain metrics.
///
/// Durations are microseconds. The `avg` argument of every timer method is
/// the caller's running average and is written as-is.
pub trait BlockMetrics: Send + Sync {
    /// Set the `block_tip` series named `stat`. Unknown names are dropped.
    fn update(&self, stat: &str, amt: f64);

    /// Observe one stage duration and overwrite its running average.
    fn timer(&self, op: BlockTimer, current: i64, avg: f64);

    fn size(&self, amt: f64) {
        self.update(TipStat::Size.as_str(), amt);
    }

    fn size_witness(&self, amt: f64) {
        self.update(TipStat::SizeWitness.as_str(), amt);
    }

    fn weight(&self, amt: f64) {
        self.update(TipStat::Weight.as_str(), amt);
    }

    fn height(&self, amt: f64) {
        self.update(TipStat::Height.as_str(), amt);
    }

    fn version(&self, amt: f64) {
        self.update(TipStat::Version.as_str(), amt);
    }

    fn transactions(&self, amt: f64) {
        self.update(TipStat::Transactions.as_str(), amt);
    }

    fn sigops(&self, amt: f64) {
        self.update(TipStat::SigOps.as_str(), amt);
    }

    /// Header timestamp of the tip, unix seconds.
    fn header_time(&self, amt: f64) {
        self.update(TipStat::HeaderTime.as_str(), amt);
    }

    fn difficulty(&self, amt: f64) {
        self.update(TipStat::Difficulty.as_str(), amt);
    }

    fn tip_load_block_disk(&self, current: i64, avg: f64) {
        self.timer(BlockTimer::Load, current, avg);
    }

    fn tip_connect_block(&self, current: i64, avg: f64) {
        self.timer(BlockTimer::Connect, current, avg);
    }

    fn tip_flush_view(&self, current: i64, avg: f64) {
        self.timer(BlockTimer::FlushView, current, avg);
    }

    fn tip_flush_disk(&self, current: i64, avg: f64) {
        self.timer(BlockTimer::FlushDisk, current, avg);
    }

    fn tip_update(&self, current: i64, avg: f64) {
        self.timer(BlockTimer::UpdateTip, current, avg);
    }

    fn fork_check(&self, current: i64, avg: f64) {
        self.timer(BlockTimer::ForkCheck, current, avg);
    }

    fn update_index(&self, current: i64, avg: f64) {
        self.timer(BlockTimer::UpdateIndex, current, avg);
    }
}

pub struct LiveBlockMetrics {
    tip: HashMap<&'static str, Gauge>,
    timers: Vec<Timer>,
}

impl LiveBlockMetrics {
    #[must_use]
    pub fn new(builder: &FamilyBuilder) -> Self {
        let tip_family = builder.gauge(TIP_FAMILY, &[]);
        let tip = TipStat::ALL
            .iter()
            .map(|stat| (stat.as_str(), tip_family.add(&[("type", stat.as_str())])))
            .collect();

        let histograms = builder.histogram(TIMER_FAMILY, &[]);
        let averages = builder.gauge(AVERAGE_FAMILY, &[]);
        let timers = BlockTimer::ALL
            .iter()
            .map(|op| Timer::new(&histograms, &averages, &op.spec(), op.method()))
            .collect();

        Self { tip, timers }
    }
}

impl BlockMetrics for LiveBlockMetrics {
    fn update(&self, stat: &str, amt: f64) {
        if let Some(gauge) = self.tip.get(stat) {
            gauge.set(amt);
        }
    }

    fn timer(&self, op: BlockTimer, current: i64, avg: f64) {
        if let Some(timer) = self.timers.get(op.index()) {
            timer.record(current, avg);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBlockMetrics;

impl BlockMetrics for NoopBlockMetrics {
    fn update(&self, _stat: &str, _amt: f64) {}

    fn timer(&self, _op: BlockTimer, _current: i64, _avg: f64) {}
}
