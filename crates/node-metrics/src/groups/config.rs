//! Node configuration metrics.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `node_boot_time` | Gauge | none |
//! | `node_conf` | Gauge | `type` (int, bool), `name`, `category` |
//! | `initial_block_download` | Gauge | none |
//!
//! Option names are open-ended, so `node_conf` series are resolved on
//! first use rather than at construction. Options are set once at startup.

use metrics::Gauge;

use crate::registry::{Family, FamilyBuilder};

pub const BOOT_TIME_FAMILY: &str = "node_boot_time";
pub const CONF_FAMILY: &str = "node_conf";
pub const IBD_FAMILY: &str = "initial_block_download";

/// Option category, as shown in the node's help output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigCategory {
    Options,
    Connection,
    Wallet,
    WalletDebugTest,
    Zmq,
    DebugTest,
    ChainParams,
    NodeRelay,
    BlockCreation,
    Rpc,
    Gui,
    Commands,
    RegisterCommands,
    Hidden,
}

impl ConfigCategory {
    /// Display string used as the `category` label value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigCategory::Options => "Options",
            ConfigCategory::Connection => "Connection options",
            ConfigCategory::Wallet => "Wallet options",
            ConfigCategory::WalletDebugTest => "Wallet debugging/testing options",
            ConfigCategory::Zmq => "ZeroMQ notification options",
            ConfigCategory::DebugTest => "Debugging/Testing options",
            ConfigCategory::ChainParams => "Chain selection options",
            ConfigCategory::NodeRelay => "Node relay options",
            ConfigCategory::BlockCreation => "Block creation options",
            ConfigCategory::Rpc => "RPC server options",
            ConfigCategory::Gui => "UI Options",
            ConfigCategory::Commands => "Commands",
            ConfigCategory::RegisterCommands => "Register Commands",
            ConfigCategory::Hidden => "Hidden",
        }
    }
}

/// Configuration domain metrics.
pub trait ConfigMetrics: Send + Sync {
    /// Publish a numeric option value.
    fn set(&self, name: &str, category: ConfigCategory, value: i64);

    /// Publish a boolean option as 1 or 0.
    fn set_flag(&self, name: &str, category: ConfigCategory, value: bool);

    fn set_ibd(&self, in_progress: bool);
}

pub struct LiveConfigMetrics {
    conf: Family<Gauge>,
    ibd: Gauge,
}

impl LiveConfigMetrics {
    /// Resolves the fixed series and stamps `node_boot_time` with the
    /// current unix time.
    #[must_use]
    // i64 to f64 conversion is exact for unix timestamps
    #[allow(clippy::cast_precision_loss)]
    pub fn new(builder: &FamilyBuilder) -> Self {
        builder
            .gauge(BOOT_TIME_FAMILY, &[])
            .add(&[])
            .set(chrono::Utc::now().timestamp() as f64);

        Self {
            conf: builder.gauge(CONF_FAMILY, &[]),
            ibd: builder.gauge(IBD_FAMILY, &[]).add(&[]),
        }
    }

    fn option(&self, kind: &str, name: &str, category: ConfigCategory) -> Gauge {
        self.conf
            .add(&[("type", kind), ("name", name), ("category", category.as_str())])
    }
}

impl ConfigMetrics for LiveConfigMetrics {
    // i64 to f64 conversion is exact for realistic option values
    #[allow(clippy::cast_precision_loss)]
    fn set(&self, name: &str, category: ConfigCategory, value: i64) {
        self.option("int", name, category).set(value as f64);
    }

    fn set_flag(&self, name: &str, category: ConfigCategory, value: bool) {
        self.option("bool", name, category)
            .set(if value { 1.0 } else { 0.0 });
    }

    fn set_ibd(&self, in_progress: bool) {
        self.ibd.set(if in_progress { 1.0 } else { 0.0 });
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopConfigMetrics;

impl ConfigMetrics for NoopConfigMetrics {
    fn set(&self, _name: &str, _category: ConfigCategory, _value: i64) {}

    fn set_flag(&self, _name: &str, _category: ConfigCategory, _value: bool) {}

    fn set_ibd(&self, _in_progress: bool) {}
}
