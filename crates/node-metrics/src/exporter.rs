//! Prometheus exposition.
//!
//! Installs the `metrics-exporter-prometheus` recorder as the process-global
//! recorder and serves it over HTTP. Histogram families get explicit bucket
//! layouts from the groups' [`BucketSpec`]s; every other histogram is
//! rendered as a summary.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::time::Duration;

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing::info;

use crate::errors::{MetricsError, Result};
use crate::groups::{block, mempool, peer, tx, BlockTimer};
use crate::registry::BucketSpec;

/// Quantiles reported for summary families.
pub const SUMMARY_QUANTILES: [f64; 3] = [0.5, 0.9, 0.99];

/// Rolling window of summary families.
///
/// The window is kept as a single bucket, so an observation drops out of
/// the quantiles once it is older than this.
pub const SUMMARY_WINDOW: Duration = Duration::from_secs(60);

fn family_specs() -> Vec<(&'static str, Vec<BucketSpec>)> {
    vec![
        (
            block::TIMER_FAMILY,
            BlockTimer::ALL.iter().map(BlockTimer::spec).collect(),
        ),
        (mempool::TIMER_FAMILY, vec![mempool::MEMPOOL_ACCEPT]),
        (tx::TIMER_FAMILY, vec![tx::TX_CHECK]),
        (peer::PROCESS_FAMILY, vec![peer::PEER_PROCESS_MSG]),
    ]
}

/// Bucket layout per histogram family.
///
/// Buckets are configured per metric name, so a family shared by several
/// operations gets the sorted union of their boundaries.
///
/// # Errors
///
/// Returns `MetricsError::InvalidBuckets` naming the first invalid spec.
pub fn histogram_buckets() -> Result<Vec<(&'static str, Vec<f64>)>> {
    family_specs()
        .into_iter()
        .map(|(family, specs)| {
            let mut bounds = Vec::new();
            for spec in specs {
                if !spec.is_valid() {
                    return Err(MetricsError::InvalidBuckets {
                        family,
                        operation: spec.name(),
                    });
                }
                bounds.extend_from_slice(spec.bounds());
            }
            bounds.sort_by(f64::total_cmp);
            bounds.dedup_by(|a, b| a.total_cmp(b).is_eq());
            Ok((family, bounds))
        })
        .collect()
}

/// Builder with summary quantiles over `window` and per-family buckets.
fn builder(window: Duration) -> Result<PrometheusBuilder> {
    let mut builder = PrometheusBuilder::new()
        .set_quantiles(&SUMMARY_QUANTILES)
        .map_err(|e| MetricsError::Exporter(format!("Failed to set quantiles: {e}")))?
        .set_bucket_duration(window)
        .map_err(|e| MetricsError::Exporter(format!("Failed to set bucket duration: {e}")))?
        .set_bucket_count(NonZeroU32::MIN);

    for (family, bounds) in histogram_buckets()? {
        builder = builder
            .set_buckets_for_metric(Matcher::Full(family.to_string()), &bounds)
            .map_err(|e| {
                MetricsError::Exporter(format!("Failed to set buckets for {family}: {e}"))
            })?;
    }
    Ok(builder)
}

/// Install the Prometheus recorder and start its HTTP listener on `bind`.
///
/// Must be called before any group is constructed against
/// [`MetricsRegistry::global`](crate::MetricsRegistry::global), and at most
/// once per process.
///
/// # Errors
///
/// Returns `MetricsError::Exporter` if the builder rejects a setting or a
/// global recorder is already installed.
pub fn install(bind: SocketAddr) -> Result<()> {
    builder(SUMMARY_WINDOW)?
        .with_http_listener(bind)
        .install()
        .map_err(|e| {
            MetricsError::Exporter(format!("Failed to install Prometheus exporter: {e}"))
        })?;

    info!(
        target: "node_metrics.exporter",
        bind_address = %bind,
        "Prometheus exporter listening"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::groups::{LiveNetMetrics, NetMetrics};
    use crate::registry::{FamilyBuilder, MetricsRegistry};
    use metrics_exporter_prometheus::PrometheusHandle;
    use std::sync::Arc;

    /// Median reported on the `net_ping` quantile line.
    fn ping_median(handle: &PrometheusHandle) -> f64 {
        handle
            .render()
            .lines()
            .find(|line| line.starts_with("net_ping{") && line.contains("quantile=\"0.5\""))
            .and_then(|line| line.rsplit(' ').next())
            .map(|value| value.parse().unwrap())
            .unwrap()
    }

    #[test]
    fn test_block_family_is_union_of_operations() {
        let buckets = histogram_buckets().unwrap();
        let (_, block) = buckets
            .iter()
            .find(|(family, _)| *family == block::TIMER_FAMILY)
            .unwrap();

        assert_eq!(
            block,
            &vec![
                5.0, 10.0, 25.0, 50.0, 75.0, 100.0, 200.0, 500.0, 1000.0, 1500.0, 3000.0
            ]
        );
    }

    #[test]
    fn test_every_layout_is_strictly_increasing() {
        for (family, bounds) in histogram_buckets().unwrap() {
            assert!(!bounds.is_empty(), "{family} has no buckets");
            assert!(
                bounds.windows(2).all(|pair| pair[0] < pair[1]),
                "{family} buckets must be strictly increasing"
            );
        }
    }

    #[test]
    fn test_single_operation_families_keep_their_bounds() {
        let buckets = histogram_buckets().unwrap();
        let layout = |name: &str| {
            buckets
                .iter()
                .find(|(family, _)| *family == name)
                .map(|(_, bounds)| bounds.clone())
                .unwrap()
        };

        assert_eq!(layout(mempool::TIMER_FAMILY), mempool::MEMPOOL_ACCEPT.bounds());
        assert_eq!(layout(tx::TIMER_FAMILY), tx::TX_CHECK.bounds());
        assert_eq!(layout(peer::PROCESS_FAMILY), peer::PEER_PROCESS_MSG.bounds());
    }

    #[test]
    fn test_summary_families_have_no_buckets() {
        let buckets = histogram_buckets().unwrap();
        for summary in ["net_ping", "peer_send_msg", "tx_inputs"] {
            assert!(buckets.iter().all(|(family, _)| *family != summary));
        }
    }

    #[test]
    fn test_summary_observation_expires_after_one_window() {
        let window = Duration::from_millis(250);
        let recorder = builder(window).unwrap().build_recorder();
        let handle = recorder.handle();
        let net = LiveNetMetrics::new(&FamilyBuilder::new(
            "test",
            MetricsRegistry::from_recorder(Arc::new(recorder)),
        ));

        net.ping_time(1234);
        assert!((ping_median(&handle) - 1234.0).abs() < 1.0);

        std::thread::sleep(window * 2);
        assert_eq!(ping_median(&handle), 0.0);
        assert!(handle.render().contains("net_ping_count"));
    }

    #[test]
    fn test_builder_rejects_zero_window() {
        assert!(matches!(
            builder(Duration::ZERO),
            Err(MetricsError::Exporter(_))
        ));
    }
}
