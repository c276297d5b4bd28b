//! Snapshot queries by family name and label subset.

use std::collections::BTreeSet;
use std::sync::Arc;

use metrics_util::debugging::{DebugValue, Snapshotter};
use node_metrics::MetricsRegistry;

use crate::recorders::CountingRecorder;

/// Value of one series at snapshot time.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesValue {
    Counter(u64),
    Gauge(f64),
    /// Observations recorded since the previous snapshot.
    Histogram(Vec<f64>),
}

impl SeriesValue {
    fn is_zero(&self) -> bool {
        match self {
            SeriesValue::Counter(n) => *n == 0,
            SeriesValue::Gauge(v) => *v == 0.0,
            SeriesValue::Histogram(v) => v.is_empty(),
        }
    }
}

impl From<DebugValue> for SeriesValue {
    fn from(value: DebugValue) -> Self {
        match value {
            DebugValue::Counter(n) => SeriesValue::Counter(n),
            DebugValue::Gauge(v) => SeriesValue::Gauge(v.into_inner()),
            DebugValue::Histogram(v) => {
                SeriesValue::Histogram(v.into_iter().map(|o| o.into_inner()).collect())
            }
        }
    }
}

/// One series: family name, full label set and value.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub value: SeriesValue,
}

impl Series {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// True if every `(key, value)` in `subset` is one of this series' labels.
    pub fn has_labels(&self, subset: &[(&str, &str)]) -> bool {
        subset
            .iter()
            .all(|(key, value)| self.label(key) == Some(*value))
    }

    fn same_series(&self, other: &Series) -> bool {
        self.name == other.name && self.labels == other.labels
    }
}

/// Point-in-time copy of every registered series.
#[derive(Debug, Clone, Default)]
pub struct MetricSnapshot {
    series: Vec<Series>,
}

impl MetricSnapshot {
    /// Drains histogram observations from `snapshotter`.
    pub fn take(snapshotter: &Snapshotter) -> Self {
        let series = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, _, _, value)| {
                let key = key.key();
                Series {
                    name: key.name().to_string(),
                    labels: key
                        .labels()
                        .map(|l| (l.key().to_string(), l.value().to_string()))
                        .collect(),
                    value: value.into(),
                }
            })
            .collect();
        Self { series }
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Distinct family names.
    pub fn families(&self) -> BTreeSet<String> {
        self.series.iter().map(|s| s.name.clone()).collect()
    }

    /// Series of family `name` whose labels include `labels`.
    pub fn find(&self, name: &str, labels: &[(&str, &str)]) -> Vec<&Series> {
        self.series
            .iter()
            .filter(|s| s.name == name && s.has_labels(labels))
            .collect()
    }

    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.find(name, labels).into_iter().find_map(|s| match s.value {
            SeriesValue::Gauge(v) => Some(v),
            _ => None,
        })
    }

    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        self.find(name, labels).into_iter().find_map(|s| match s.value {
            SeriesValue::Counter(n) => Some(n),
            _ => None,
        })
    }

    pub fn histogram(&self, name: &str, labels: &[(&str, &str)]) -> Option<Vec<f64>> {
        self.find(name, labels)
            .into_iter()
            .find_map(|s| match &s.value {
                SeriesValue::Histogram(v) => Some(v.clone()),
                _ => None,
            })
    }

    /// Series whose value differs from `before`.
    ///
    /// Series missing from `before` count as changed only if non-zero.
    /// Histograms count as changed if they hold observations, since each
    /// snapshot drains them.
    pub fn changed_since(&self, before: &MetricSnapshot) -> Vec<&Series> {
        self.series
            .iter()
            .filter(|now| match &now.value {
                SeriesValue::Histogram(v) => !v.is_empty(),
                value => match before.series.iter().find(|prev| prev.same_series(now)) {
                    Some(prev) => prev.value != *value,
                    None => !value.is_zero(),
                },
            })
            .collect()
    }
}

/// In-process registry for tests, backed by a [`CountingRecorder`].
pub struct TestRegistry {
    recorder: Arc<CountingRecorder>,
    snapshotter: Snapshotter,
}

impl Default for TestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRegistry {
    pub fn new() -> Self {
        let recorder = Arc::new(CountingRecorder::new());
        let snapshotter = recorder.snapshotter();
        Self {
            recorder,
            snapshotter,
        }
    }

    /// Registry handle to pass to `FamilyBuilder` or `Container::init`.
    pub fn registry(&self) -> MetricsRegistry {
        MetricsRegistry::from_recorder(self.recorder.clone())
    }

    /// Total register calls made through this registry.
    pub fn registrations(&self) -> usize {
        self.recorder.registrations()
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot::take(&self.snapshotter)
    }
}
