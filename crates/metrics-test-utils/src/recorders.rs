//! Recorders for asserting on registration behavior.

use std::sync::atomic::{AtomicUsize, Ordering};

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use metrics_util::debugging::{DebuggingRecorder, Snapshotter};

/// Recorder that fails the test on any interaction.
///
/// Construct no-op groups against it to prove they never touch the backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForbiddenRecorder;

impl Recorder for ForbiddenRecorder {
    fn describe_counter(&self, key: KeyName, _unit: Option<Unit>, _description: SharedString) {
        panic!("unexpected describe_counter({})", key.as_str());
    }

    fn describe_gauge(&self, key: KeyName, _unit: Option<Unit>, _description: SharedString) {
        panic!("unexpected describe_gauge({})", key.as_str());
    }

    fn describe_histogram(&self, key: KeyName, _unit: Option<Unit>, _description: SharedString) {
        panic!("unexpected describe_histogram({})", key.as_str());
    }

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        panic!("unexpected register_counter({})", key.name());
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        panic!("unexpected register_gauge({})", key.name());
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        panic!("unexpected register_histogram({})", key.name());
    }
}

/// `DebuggingRecorder` that counts every register call.
///
/// Registrations of an already known key still count, so the total tells
/// how many times groups were constructed, not how many series exist.
pub struct CountingRecorder {
    inner: DebuggingRecorder,
    registrations: AtomicUsize,
}

impl Default for CountingRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl CountingRecorder {
    pub fn new() -> Self {
        Self {
            inner: DebuggingRecorder::new(),
            registrations: AtomicUsize::new(0),
        }
    }

    pub fn snapshotter(&self) -> Snapshotter {
        self.inner.snapshotter()
    }

    /// Total register calls so far.
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.registrations.fetch_add(1, Ordering::SeqCst);
    }
}

impl Recorder for CountingRecorder {
    fn describe_counter(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.inner.describe_counter(key, unit, description);
    }

    fn describe_gauge(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.inner.describe_gauge(key, unit, description);
    }

    fn describe_histogram(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.inner.describe_histogram(key, unit, description);
    }

    fn register_counter(&self, key: &Key, metadata: &Metadata<'_>) -> Counter {
        self.count();
        self.inner.register_counter(key, metadata)
    }

    fn register_gauge(&self, key: &Key, metadata: &Metadata<'_>) -> Gauge {
        self.count();
        self.inner.register_gauge(key, metadata)
    }

    fn register_histogram(&self, key: &Key, metadata: &Metadata<'_>) -> Histogram {
        self.count();
        self.inner.register_histogram(key, metadata)
    }
}
