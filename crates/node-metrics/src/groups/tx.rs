//! Transaction validation metrics.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `tx_invalid` | Counter | `type` (see [`ValidationResult`]) |
//! | `tx_count` | Counter | `type` (output script type) |
//! | `tx_inputs` | Summary | none |
//! | `tx_orphan` | Counter | `type` (add, remove) |
//! | `tx_accepted` | Counter | none |
//! | `tx_cache` | Gauge | none |
//! | `tx_check` | Histogram | `operation`, `method` |
//! | `tx_avg` | Gauge | `operation`, `method` |

use std::collections::HashMap;

use metrics::{Counter, Gauge, Histogram};

use super::Timer;
use crate::registry::{BucketSpec, FamilyBuilder};

pub const INVALID_FAMILY: &str = "tx_invalid";
pub const COUNT_FAMILY: &str = "tx_count";
pub const INPUTS_FAMILY: &str = "tx_inputs";
pub const ORPHAN_FAMILY: &str = "tx_orphan";
pub const ACCEPTED_FAMILY: &str = "tx_accepted";
pub const CACHE_FAMILY: &str = "tx_cache";
pub const TIMER_FAMILY: &str = "tx_check";
pub const AVERAGE_FAMILY: &str = "tx_avg";

const CHECK_METHOD: &str = "CheckTransaction";

pub const TX_CHECK: BucketSpec = BucketSpec::new("check", &[50.0, 100.0, 250.0, 1000.0]);

/// Output script types counted by `tx_count`.
pub const OUTPUT_TYPES: [&str; 10] = [
    "nonstandard",
    "pubkey",
    "pubkeyhash",
    "scripthash",
    "multisig",
    "nulldata",
    "witness_v0_keyhash",
    "witness_v0_scripthash",
    "witness_v1_taproot",
    "witness_unknown",
];

/// Outcome of transaction validation. Discriminants are the wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationResult {
    Unset = 0,
    Consensus,
    RecentConsensusChange,
    InputsNotStandard,
    NotStandard,
    MissingInputs,
    PrematureSpend,
    WitnessMutated,
    WitnessStripped,
    Conflict,
    MempoolPolicy,
    NoMempool,
    Reconsiderable,
    Unknown,
}

impl ValidationResult {
    pub const ALL: [ValidationResult; 14] = [
        ValidationResult::Unset,
        ValidationResult::Consensus,
        ValidationResult::RecentConsensusChange,
        ValidationResult::InputsNotStandard,
        ValidationResult::NotStandard,
        ValidationResult::MissingInputs,
        ValidationResult::PrematureSpend,
        ValidationResult::WitnessMutated,
        ValidationResult::WitnessStripped,
        ValidationResult::Conflict,
        ValidationResult::MempoolPolicy,
        ValidationResult::NoMempool,
        ValidationResult::Reconsiderable,
        ValidationResult::Unknown,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ValidationResult::Unset => "unset",
            ValidationResult::Consensus => "consensus",
            ValidationResult::RecentConsensusChange => "recent-consensus-change",
            ValidationResult::InputsNotStandard => "inputs-not-standard",
            ValidationResult::NotStandard => "not-standard",
            ValidationResult::MissingInputs => "missing-inputs",
            ValidationResult::PrematureSpend => "premature-spend",
            ValidationResult::WitnessMutated => "witness-mutated",
            ValidationResult::WitnessStripped => "witness-stripped",
            ValidationResult::Conflict => "conflict",
            ValidationResult::MempoolPolicy => "mempool-policy",
            ValidationResult::NoMempool => "no-mempool",
            ValidationResult::Reconsiderable => "reconsiderable",
            ValidationResult::Unknown => "unknown",
        }
    }
}

/// Transaction domain metrics.
pub trait TxMetrics: Send + Sync {
    /// Count an invalid transaction by validation result label.
    /// Unrecognized reasons are counted as `unknown`.
    fn inc_invalid(&self, reason: &str);

    /// Observe the time (us) spent fetching inputs.
    fn input_time(&self, amt: i64);

    fn inc_orphan_add(&self);

    fn inc_orphan_remove(&self);

    fn inc_accepted(&self, amt: u64);

    fn cache_size(&self, amt: f64);

    /// Count `amt` outputs of script type `output_type`. Unknown types are
    /// dropped, as are negative amounts.
    fn inc_transactions(&self, output_type: &str, amt: i64);

    /// Observe one check duration (us) and overwrite its running average.
    fn transaction_check(&self, current: i64, avg: f64);
}

pub struct LiveTxMetrics {
    invalid: HashMap<&'static str, Counter>,
    invalid_unknown: Counter,
    outputs: HashMap<&'static str, Counter>,
    inputs: Histogram,
    orphan_add: Counter,
    orphan_remove: Counter,
    accepted: Counter,
    cache: Gauge,
    check: Timer,
}

impl LiveTxMetrics {
    #[must_use]
    pub fn new(builder: &FamilyBuilder) -> Self {
        let invalid_family = builder.counter(INVALID_FAMILY, &[]);
        let invalid = ValidationResult::ALL
            .iter()
            .map(|result| (result.as_str(), invalid_family.add(&[("type", result.as_str())])))
            .collect();

        let count_family = builder.counter(COUNT_FAMILY, &[]);
        let outputs = OUTPUT_TYPES
            .iter()
            .map(|kind| (*kind, count_family.add(&[("type", *kind)])))
            .collect();

        let orphan_family = builder.counter(ORPHAN_FAMILY, &[]);

        Self {
            invalid,
            invalid_unknown: invalid_family.add(&[("type", ValidationResult::Unknown.as_str())]),
            outputs,
            inputs: builder.summary(INPUTS_FAMILY).add(&[]),
            orphan_add: orphan_family.add(&[("type", "add")]),
            orphan_remove: orphan_family.add(&[("type", "remove")]),
            accepted: builder.counter(ACCEPTED_FAMILY, &[]).add(&[]),
            cache: builder.gauge(CACHE_FAMILY, &[]).add(&[]),
            check: Timer::new(
                &builder.histogram(TIMER_FAMILY, &[]),
                &builder.gauge(AVERAGE_FAMILY, &[]),
                &TX_CHECK,
                CHECK_METHOD,
            ),
        }
    }
}

impl TxMetrics for LiveTxMetrics {
    fn inc_invalid(&self, reason: &str) {
        self.invalid
            .get(reason)
            .unwrap_or(&self.invalid_unknown)
            .increment(1);
    }

    // i64 to f64 conversion is exact for realistic durations
    #[allow(clippy::cast_precision_loss)]
    fn input_time(&self, amt: i64) {
        self.inputs.record(amt as f64);
    }

    fn inc_orphan_add(&self) {
        self.orphan_add.increment(1);
    }

    fn inc_orphan_remove(&self) {
        self.orphan_remove.increment(1);
    }

    fn inc_accepted(&self, amt: u64) {
        self.accepted.increment(amt);
    }

    fn cache_size(&self, amt: f64) {
        self.cache.set(amt);
    }

    fn inc_transactions(&self, output_type: &str, amt: i64) {
        if let (Some(counter), Ok(amt)) = (self.outputs.get(output_type), u64::try_from(amt)) {
            counter.increment(amt);
        }
    }

    fn transaction_check(&self, current: i64, avg: f64) {
        self.check.record(current, avg);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTxMetrics;

impl TxMetrics for NoopTxMetrics {
    fn inc_invalid(&self, _reason: &str) {}

    fn input_time(&self, _amt: i64) {}

    fn inc_orphan_add(&self) {}

    fn inc_orphan_remove(&self) {}

    fn inc_accepted(&self, _amt: u64) {}

    fn cache_size(&self, _amt: f64) {}

    fn inc_transactions(&self, _output_type: &str, _amt: i64) {}

    fn transaction_check(&self, _current: i64, _avg: f64) {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::registry::MetricsRegistry;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn live() -> (LiveTxMetrics, Snapshotter) {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let builder = FamilyBuilder::new("test", MetricsRegistry::from_recorder(Arc::new(recorder)));
        (LiveTxMetrics::new(&builder), snapshotter)
    }

    fn family_counters(snapshotter: &Snapshotter, family: &str) -> HashMap<String, u64> {
        snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, _, _, _)| key.key().name() == family)
            .filter_map(|(key, _, _, value)| {
                let kind = key
                    .key()
                    .labels()
                    .find(|l| l.key() == "type")
                    .map(|l| l.value().to_string())?;
                match value {
                    DebugValue::Counter(n) => Some((kind, n)),
                    _ => None,
                }
            })
            .collect()
    }

    #[test]
    fn test_validation_labels_are_unique() {
        let unique: HashSet<_> = ValidationResult::ALL.iter().map(ValidationResult::as_str).collect();
        assert_eq!(unique.len(), ValidationResult::ALL.len());
        for (i, result) in ValidationResult::ALL.iter().enumerate() {
            assert_eq!(*result as usize, i);
        }
    }

    #[test]
    fn test_invalid_unknown_reason_folds_into_unknown() {
        let (metrics, snapshotter) = live();
        metrics.inc_invalid("consensus");
        metrics.inc_invalid("made-up");
        metrics.inc_invalid("unknown");

        let counters = family_counters(&snapshotter, INVALID_FAMILY);
        assert_eq!(counters.len(), ValidationResult::ALL.len());
        assert_eq!(counters["consensus"], 1);
        assert_eq!(counters["unknown"], 2);
        assert!(!counters.contains_key("made-up"));
    }

    #[test]
    fn test_transactions_by_output_type() {
        let (metrics, snapshotter) = live();
        metrics.inc_transactions("witness_v1_taproot", 3);
        metrics.inc_transactions("witness_v1_taproot", 2);
        metrics.inc_transactions("not-a-script", 9);
        metrics.inc_transactions("pubkey", -4);

        let counters = family_counters(&snapshotter, COUNT_FAMILY);
        assert_eq!(counters.len(), OUTPUT_TYPES.len());
        assert_eq!(counters["witness_v1_taproot"], 5);
        assert_eq!(counters["pubkey"], 0);
        assert_eq!(counters.values().sum::<u64>(), 5);
    }

    #[test]
    fn test_orphan_add_and_remove() {
        let (metrics, snapshotter) = live();
        metrics.inc_orphan_add();
        metrics.inc_orphan_add();
        metrics.inc_orphan_remove();

        let counters = family_counters(&snapshotter, ORPHAN_FAMILY);
        assert_eq!(counters["add"], 2);
        assert_eq!(counters["remove"], 1);
    }

    #[test]
    fn test_transaction_check_sets_average() {
        let (metrics, snapshotter) = live();
        metrics.transaction_check(120, 87.5);

        let entries = snapshotter.snapshot().into_vec();
        let average = entries
            .iter()
            .find_map(|(key, _, _, value)| match value {
                DebugValue::Gauge(v) if key.key().name() == AVERAGE_FAMILY => Some(v.into_inner()),
                _ => None,
            })
            .unwrap();
        assert_eq!(average, 87.5);

        let observed = entries
            .iter()
            .find_map(|(key, _, _, value)| match value {
                DebugValue::Histogram(v) if key.key().name() == TIMER_FAMILY => Some(v.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0].into_inner(), 120.0);
    }

    #[test]
    fn test_check_bucket_spec_is_valid() {
        assert!(TX_CHECK.is_valid());
    }
}
