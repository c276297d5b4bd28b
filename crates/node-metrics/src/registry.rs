//! Labeled metric families on top of a `metrics::Recorder`.
//!
//! Every family carries two fixed labels:
//! - `kind`: gauge, counter, histogram or summary (fixed per builder method)
//! - `chain`: the chain identifier the builder was created with
//!
//! Histogram and summary families additionally carry `unit = "us"`.
//!
//! # Label tie-break
//!
//! Labels are merged with insert-if-absent, fixed labels first. A caller
//! passing its own `kind` or `chain` label silently loses to the fixed
//! value. Instance labels passed to [`Family::add`] likewise lose to the
//! family's labels on collision.
//!
//! # Registration
//!
//! Families are plain descriptions; nothing touches the recorder until
//! [`Family::add`] resolves a concrete label-value combination. The
//! recorder owns look-up-or-create semantics, so adding the same
//! combination twice yields handles to the same series. Groups resolve
//! every handle at construction and never call `add` on update paths,
//! except for open-ended keys set once at startup (config options).

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use metrics::{Counter, Gauge, Histogram, Key, Label, Level, Metadata, Recorder};

/// Label key naming the metric type.
pub const KIND_LABEL: &str = "kind";

/// Label key naming the chain or environment.
pub const CHAIN_LABEL: &str = "chain";

/// Label key naming the unit of timer observations.
pub const UNIT_LABEL: &str = "unit";

/// Unit of every timer family (microseconds).
pub const TIMER_UNIT: &str = "us";

static METADATA: Metadata<'static> =
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()));

/// Metric type stamped into the `kind` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Summary,
}

impl MetricKind {
    /// Returns the kind as a label value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
        }
    }

    const fn is_timer(self) -> bool {
        matches!(self, MetricKind::Histogram | MetricKind::Summary)
    }
}

/// Ordered label key/value mapping with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a label unless the key is already present.
    ///
    /// Returns `true` if the label was inserted.
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        match self.0.entry(key.into()) {
            Entry::Vacant(slot) => {
                slot.insert(value.into());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Copy of this set with `extra` merged in (existing keys win).
    #[must_use]
    pub fn merged(&self, extra: &[(&str, &str)]) -> Self {
        let mut merged = self.clone();
        for (key, value) in extra {
            merged.insert_if_absent(*key, *value);
        }
        merged
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn to_labels(&self) -> Vec<Label> {
        self.0
            .iter()
            .map(|(k, v)| Label::new(k.clone(), v.clone()))
            .collect()
    }
}

/// Handle to the metric backend.
///
/// Cheap to clone. Production uses the process-global recorder installed
/// by the exporter; tests and embedders pass their own recorder.
#[derive(Clone)]
pub struct MetricsRegistry {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Global,
    Local(Arc<dyn Recorder + Send + Sync>),
}

impl fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match self.backend {
            Backend::Global => "global",
            Backend::Local(_) => "local",
        };
        f.debug_struct("MetricsRegistry")
            .field("backend", &backend)
            .finish()
    }
}

impl MetricsRegistry {
    /// Registry backed by whatever recorder is globally installed.
    ///
    /// Registrations made before a recorder is installed go to the
    /// `metrics` crate's no-op recorder.
    #[must_use]
    pub fn global() -> Self {
        Self {
            backend: Backend::Global,
        }
    }

    /// Registry backed by an explicit recorder.
    #[must_use]
    pub fn from_recorder(recorder: Arc<dyn Recorder + Send + Sync>) -> Self {
        Self {
            backend: Backend::Local(recorder),
        }
    }

    fn register_counter(&self, key: &Key) -> Counter {
        match &self.backend {
            Backend::Global => metrics::with_recorder(|r| r.register_counter(key, &METADATA)),
            Backend::Local(r) => r.register_counter(key, &METADATA),
        }
    }

    fn register_gauge(&self, key: &Key) -> Gauge {
        match &self.backend {
            Backend::Global => metrics::with_recorder(|r| r.register_gauge(key, &METADATA)),
            Backend::Local(r) => r.register_gauge(key, &METADATA),
        }
    }

    fn register_histogram(&self, key: &Key) -> Histogram {
        match &self.backend {
            Backend::Global => metrics::with_recorder(|r| r.register_histogram(key, &METADATA)),
            Backend::Local(r) => r.register_histogram(key, &METADATA),
        }
    }
}

/// A metric handle type a [`Family`] can produce.
pub trait Instrument: Sized {
    /// Look up or create the series for `key`.
    fn register(registry: &MetricsRegistry, key: &Key) -> Self;
}

impl Instrument for Counter {
    fn register(registry: &MetricsRegistry, key: &Key) -> Self {
        registry.register_counter(key)
    }
}

impl Instrument for Gauge {
    fn register(registry: &MetricsRegistry, key: &Key) -> Self {
        registry.register_gauge(key)
    }
}

impl Instrument for Histogram {
    fn register(registry: &MetricsRegistry, key: &Key) -> Self {
        registry.register_histogram(key)
    }
}

/// A named metric family with its family-wide labels.
pub struct Family<I> {
    name: String,
    labels: LabelSet,
    registry: MetricsRegistry,
    _instrument: PhantomData<fn() -> I>,
}

impl<I> fmt::Debug for Family<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Family")
            .field("name", &self.name)
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

impl<I: Instrument> Family<I> {
    /// Family-wide labels, including `kind` and `chain`.
    #[must_use]
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Resolve the series for one label-value combination.
    ///
    /// Call once per combination during group construction.
    pub fn add(&self, labels: &[(&str, &str)]) -> I {
        let key = Key::from_parts(self.name.clone(), self.labels.merged(labels).to_labels());
        I::register(&self.registry, &key)
    }
}

/// Builds families stamped with `kind` and `chain` labels.
#[derive(Debug, Clone)]
pub struct FamilyBuilder {
    chain: String,
    registry: MetricsRegistry,
}

impl FamilyBuilder {
    #[must_use]
    pub fn new(chain: impl Into<String>, registry: MetricsRegistry) -> Self {
        Self {
            chain: chain.into(),
            registry,
        }
    }

    #[must_use]
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Family<Counter> {
        self.family(name, MetricKind::Counter, labels)
    }

    #[must_use]
    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Family<Gauge> {
        self.family(name, MetricKind::Gauge, labels)
    }

    /// Histogram family; bucket boundaries come from the exporter layout.
    #[must_use]
    pub fn histogram(&self, name: &str, labels: &[(&str, &str)]) -> Family<Histogram> {
        self.family(name, MetricKind::Histogram, labels)
    }

    /// Summary family, rendered with quantiles instead of buckets.
    #[must_use]
    pub fn summary(&self, name: &str) -> Family<Histogram> {
        self.family(name, MetricKind::Summary, &[])
    }

    fn family<I>(&self, name: &str, kind: MetricKind, labels: &[(&str, &str)]) -> Family<I> {
        let mut set = LabelSet::new();
        set.insert_if_absent(KIND_LABEL, kind.as_str());
        set.insert_if_absent(CHAIN_LABEL, self.chain.as_str());
        if kind.is_timer() {
            set.insert_if_absent(UNIT_LABEL, TIMER_UNIT);
        }
        Family {
            name: name.to_string(),
            labels: set.merged(labels),
            registry: self.registry.clone(),
            _instrument: PhantomData,
        }
    }
}

/// An operation name with its histogram bucket boundaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketSpec {
    name: &'static str,
    bounds: &'static [f64],
}

impl BucketSpec {
    #[must_use]
    pub const fn new(name: &'static str, bounds: &'static [f64]) -> Self {
        Self { name, bounds }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn bounds(&self) -> &'static [f64] {
        self.bounds
    }

    /// Non-empty, finite and strictly increasing.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.bounds.is_empty()
            && self.bounds.iter().all(|b| b.is_finite())
            && self
                .bounds
                .windows(2)
                .all(|pair| matches!(pair, [lo, hi] if lo < hi))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

    fn debug_registry() -> (MetricsRegistry, Snapshotter) {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        (MetricsRegistry::from_recorder(Arc::new(recorder)), snapshotter)
    }

    fn labels_of(key: &Key) -> Vec<(String, String)> {
        key.labels()
            .map(|l| (l.key().to_string(), l.value().to_string()))
            .collect()
    }

    #[test]
    fn test_metric_kind_labels() {
        assert_eq!(MetricKind::Counter.as_str(), "counter");
        assert_eq!(MetricKind::Gauge.as_str(), "gauge");
        assert_eq!(MetricKind::Histogram.as_str(), "histogram");
        assert_eq!(MetricKind::Summary.as_str(), "summary");
    }

    #[test]
    fn test_label_set_insert_if_absent() {
        let mut set = LabelSet::new();
        assert!(set.insert_if_absent("chain", "main"));
        assert!(!set.insert_if_absent("chain", "other"));
        assert_eq!(set.get("chain"), Some("main"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_label_set_is_ordered_by_key() {
        let set = LabelSet::new().merged(&[("type", "size"), ("chain", "main"), ("kind", "gauge")]);
        let keys: Vec<&str> = set.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["chain", "kind", "type"]);
    }

    #[test]
    fn test_fixed_labels_win_over_caller_labels() {
        let (registry, _) = debug_registry();
        let builder = FamilyBuilder::new("test", registry);
        let family = builder.gauge(
            "block_tip",
            &[("kind", "counter"), ("chain", "evil"), ("method", "ConnectTip")],
        );

        assert_eq!(family.labels().get("kind"), Some("gauge"));
        assert_eq!(family.labels().get("chain"), Some("test"));
        assert_eq!(family.labels().get("method"), Some("ConnectTip"));
    }

    #[test]
    fn test_timer_families_carry_unit() {
        let (registry, _) = debug_registry();
        let builder = FamilyBuilder::new("test", registry);

        let histogram = builder.histogram("block_connect", &[]);
        assert_eq!(histogram.labels().get("kind"), Some("histogram"));
        assert_eq!(histogram.labels().get("unit"), Some("us"));

        let summary = builder.summary("net_ping");
        assert_eq!(summary.labels().get("kind"), Some("summary"));
        assert_eq!(summary.labels().get("unit"), Some("us"));

        let counter = builder.counter("net_socket", &[]);
        assert_eq!(counter.labels().get("unit"), None);
    }

    #[test]
    fn test_family_registers_nothing_until_add() {
        let (registry, snapshotter) = debug_registry();
        let builder = FamilyBuilder::new("test", registry);
        let _family = builder.counter("net_socket", &[]);

        assert!(snapshotter.snapshot().into_vec().is_empty());
    }

    #[test]
    fn test_add_resolves_full_label_set() {
        let (registry, snapshotter) = debug_registry();
        let builder = FamilyBuilder::new("test", registry);
        builder
            .gauge("block_tip", &[])
            .add(&[("type", "height"), ("chain", "ignored")])
            .set(42.0);

        let entries = snapshotter.snapshot().into_vec();
        assert_eq!(entries.len(), 1);
        let (key, _, _, value) = &entries[0];
        assert_eq!(key.key().name(), "block_tip");
        assert_eq!(
            labels_of(key.key()),
            vec![
                ("chain".to_string(), "test".to_string()),
                ("kind".to_string(), "gauge".to_string()),
                ("type".to_string(), "height".to_string()),
            ]
        );
        assert!(matches!(value, DebugValue::Gauge(v) if v.into_inner() == 42.0));
    }

    #[test]
    fn test_duplicate_add_returns_existing_series() {
        let (registry, snapshotter) = debug_registry();
        let builder = FamilyBuilder::new("test", registry);
        let family = builder.counter("net_socket", &[]);

        family.add(&[("type", "open")]).increment(1);
        family.add(&[("type", "open")]).increment(2);

        let entries = snapshotter.snapshot().into_vec();
        assert_eq!(entries.len(), 1);
        assert!(matches!(entries[0].3, DebugValue::Counter(3)));
    }

    #[test]
    fn test_bucket_spec_validity() {
        assert!(BucketSpec::new("load", &[5.0, 10.0, 25.0, 100.0]).is_valid());
        assert!(BucketSpec::new("single", &[1.0]).is_valid());
        assert!(!BucketSpec::new("empty", &[]).is_valid());
        assert!(!BucketSpec::new("flat", &[5.0, 5.0]).is_valid());
        assert!(!BucketSpec::new("descending", &[10.0, 5.0]).is_valid());
        assert!(!BucketSpec::new("nan", &[1.0, f64::NAN]).is_valid());
    }

    #[test]
    fn test_registry_debug_hides_recorder() {
        let (registry, _) = debug_registry();
        assert_eq!(format!("{registry:?}"), "MetricsRegistry { backend: \"local\" }");
        assert_eq!(
            format!("{:?}", MetricsRegistry::global()),
            "MetricsRegistry { backend: \"global\" }"
        );
    }
}
