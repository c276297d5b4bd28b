//! Process-wide holder of the metric groups.
//!
//! A [`Container`] starts empty and is filled exactly once by
//! [`Container::init`]. Concurrent and repeated `init` calls after the
//! first are no-ops. The group accessors panic if called before `init`:
//! metric calls come from trusted call sites inside the node, and a
//! missing init is a startup-order bug.
//!
//! Production code uses the static instance through [`init`] and
//! [`instance`]. Tests and embedders can own a `Container` directly.

use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use crate::config::Config;
use crate::errors::Result;
use crate::exporter;
use crate::groups::{
    BlockMetrics, ConfigMetrics, LiveBlockMetrics, LiveConfigMetrics, LiveMempoolMetrics,
    LiveNetMetrics, LivePeerMetrics, LiveTxMetrics, MempoolMetrics, NetMetrics,
    NoopBlockMetrics, NoopConfigMetrics, NoopMempoolMetrics, NoopNetMetrics, NoopPeerMetrics,
    NoopTxMetrics, PeerMetrics, TxMetrics,
};
use crate::notifications::MetricsNotifier;
use crate::registry::{FamilyBuilder, MetricsRegistry};

struct Groups {
    peer: Arc<dyn PeerMetrics>,
    net: Arc<dyn NetMetrics>,
    tx: Arc<dyn TxMetrics>,
    block: Arc<dyn BlockMetrics>,
    mempool: Arc<dyn MempoolMetrics>,
    config: Arc<dyn ConfigMetrics>,
    notifier: MetricsNotifier,
}

impl Groups {
    fn live(builder: &FamilyBuilder) -> Self {
        let block: Arc<dyn BlockMetrics> = Arc::new(LiveBlockMetrics::new(builder));
        let mempool: Arc<dyn MempoolMetrics> = Arc::new(LiveMempoolMetrics::new(builder));
        Self {
            peer: Arc::new(LivePeerMetrics::new(builder)),
            net: Arc::new(LiveNetMetrics::new(builder)),
            tx: Arc::new(LiveTxMetrics::new(builder)),
            notifier: MetricsNotifier::new(Arc::clone(&block), Arc::clone(&mempool)),
            block,
            mempool,
            config: Arc::new(LiveConfigMetrics::new(builder)),
        }
    }

    fn noop() -> Self {
        let block: Arc<dyn BlockMetrics> = Arc::new(NoopBlockMetrics);
        let mempool: Arc<dyn MempoolMetrics> = Arc::new(NoopMempoolMetrics);
        Self {
            peer: Arc::new(NoopPeerMetrics),
            net: Arc::new(NoopNetMetrics),
            tx: Arc::new(NoopTxMetrics),
            notifier: MetricsNotifier::new(Arc::clone(&block), Arc::clone(&mempool)),
            block,
            mempool,
            config: Arc::new(NoopConfigMetrics),
        }
    }
}

/// Holds one instance of every metric group.
pub struct Container {
    groups: OnceLock<Groups>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// An uninitialized container.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            groups: OnceLock::new(),
        }
    }

    /// Build every group against `registry`, or as no-ops when `disabled`.
    ///
    /// Only the first call does anything. Callers racing the first call
    /// block until it completes. Returns `true` for the call that
    /// initialized the container.
    pub fn init(&self, chain: &str, registry: &MetricsRegistry, disabled: bool) -> bool {
        let mut initialized = false;
        self.groups.get_or_init(|| {
            initialized = true;
            if disabled {
                Groups::noop()
            } else {
                Groups::live(&FamilyBuilder::new(chain, registry.clone()))
            }
        });

        if initialized {
            info!(
                target: "node_metrics.container",
                chain = %chain,
                disabled = disabled,
                "Metrics container initialized"
            );
        } else {
            debug!(
                target: "node_metrics.container",
                chain = %chain,
                "Metrics container already initialized, ignoring init"
            );
        }
        initialized
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.groups.get().is_some()
    }

    /// # Panics
    ///
    /// Panics if the container has not been initialized.
    #[must_use]
    pub fn peer(&self) -> &dyn PeerMetrics {
        self.groups().peer.as_ref()
    }

    /// # Panics
    ///
    /// Panics if the container has not been initialized.
    #[must_use]
    pub fn net(&self) -> &dyn NetMetrics {
        self.groups().net.as_ref()
    }

    /// # Panics
    ///
    /// Panics if the container has not been initialized.
    #[must_use]
    pub fn tx(&self) -> &dyn TxMetrics {
        self.groups().tx.as_ref()
    }

    /// # Panics
    ///
    /// Panics if the container has not been initialized.
    #[must_use]
    pub fn block(&self) -> &dyn BlockMetrics {
        self.groups().block.as_ref()
    }

    /// # Panics
    ///
    /// Panics if the container has not been initialized.
    #[must_use]
    pub fn mempool(&self) -> &dyn MempoolMetrics {
        self.groups().mempool.as_ref()
    }

    /// # Panics
    ///
    /// Panics if the container has not been initialized.
    #[must_use]
    pub fn config(&self) -> &dyn ConfigMetrics {
        self.groups().config.as_ref()
    }

    /// Listener to register with the node's validation event source.
    ///
    /// # Panics
    ///
    /// Panics if the container has not been initialized.
    #[must_use]
    pub fn notifier(&self) -> &MetricsNotifier {
        &self.groups().notifier
    }

    // Use before init is a startup-order bug; fail loudly at the call site.
    #[allow(clippy::expect_used)]
    fn groups(&self) -> &Groups {
        self.groups
            .get()
            .expect("metrics container used before init")
    }
}

static CONTAINER: Container = Container::new();

/// The process-wide container.
#[must_use]
pub fn instance() -> &'static Container {
    &CONTAINER
}

static EXPORTER: OnceLock<Result<()>> = OnceLock::new();

/// Start the exporter (unless disabled) and initialize the process-wide
/// container from `config`.
///
/// Safe to call more than once; the exporter is installed and the container
/// initialized only on the first call.
///
/// # Errors
///
/// Returns `MetricsError::Exporter` or `MetricsError::InvalidBuckets` if the
/// exporter could not be installed. The container is left uninitialized in
/// that case.
pub fn init(config: &Config) -> Result<&'static Container> {
    if !config.disabled {
        EXPORTER
            .get_or_init(|| exporter::install(config.bind_address))
            .clone()?;
    }

    let container = instance();
    container.init(&config.chain, &MetricsRegistry::global(), config.disabled);
    Ok(container)
}
