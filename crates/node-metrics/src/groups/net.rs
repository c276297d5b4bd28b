//! Network (socket and bandwidth) metrics.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `net_connection` | Gauge | `type` (see [`ConnectionKind`]) |
//! | `net_socket` | Counter | `type` (open, accept, close) |
//! | `net_bandwidth` | Gauge | `type` (P2P message type, total, unknown), `direction` (rx, tx) |
//! | `net_ping` | Summary | none |
//! | `net_ping_problem` | Counter | none |
//!
//! Cardinality of `net_bandwidth` is bounded by [`NET_MESSAGE_TYPES`]:
//! message types outside the list are folded into `type="unknown"`.

use std::collections::HashMap;

use metrics::{Counter, Gauge, Histogram};

use crate::registry::FamilyBuilder;

pub const CONNECTION_FAMILY: &str = "net_connection";
pub const SOCKET_FAMILY: &str = "net_socket";
pub const BANDWIDTH_FAMILY: &str = "net_bandwidth";
pub const PING_FAMILY: &str = "net_ping";
pub const PING_PROBLEM_FAMILY: &str = "net_ping_problem";

/// Socket events counted by `net_socket`.
pub const SOCKET_EVENTS: [&str; 3] = ["open", "accept", "close"];

/// Bandwidth key for the all-messages series.
pub const TOTAL_MESSAGES: &str = "total";

/// Bandwidth key for message types outside [`NET_MESSAGE_TYPES`].
pub const UNKNOWN_MESSAGE: &str = "unknown";

/// P2P message types tracked individually.
pub const NET_MESSAGE_TYPES: [&str; 35] = [
    "version",
    "verack",
    "addr",
    "addrv2",
    "sendaddrv2",
    "inv",
    "getdata",
    "merkleblock",
    "getblocks",
    "getheaders",
    "tx",
    "headers",
    "block",
    "getaddr",
    "mempool",
    "ping",
    "pong",
    "notfound",
    "filterload",
    "filteradd",
    "filterclear",
    "sendheaders",
    "feefilter",
    "sendcmpct",
    "cmpctblock",
    "getblocktxn",
    "blocktxn",
    "getcfilters",
    "cfilter",
    "getcfheaders",
    "cfheaders",
    "getcfcheckpt",
    "cfcheckpt",
    "wtxidrelay",
    "sendtxrcncl",
];

/// Connection breakdowns reported by `net_connection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    Total,
    Spv,
    Full,
    Inbound,
    Outbound,
    Ipv4,
    Ipv6,
    Tor,
    I2p,
}

impl ConnectionKind {
    pub const ALL: [ConnectionKind; 9] = [
        ConnectionKind::Total,
        ConnectionKind::Spv,
        ConnectionKind::Full,
        ConnectionKind::Inbound,
        ConnectionKind::Outbound,
        ConnectionKind::Ipv4,
        ConnectionKind::Ipv6,
        ConnectionKind::Tor,
        ConnectionKind::I2p,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConnectionKind::Total => "total",
            ConnectionKind::Spv => "spv",
            ConnectionKind::Full => "full",
            ConnectionKind::Inbound => "inbound",
            ConnectionKind::Outbound => "outbound",
            ConnectionKind::Ipv4 => "ipv4",
            ConnectionKind::Ipv6 => "ipv6",
            ConnectionKind::Tor => "tor",
            ConnectionKind::I2p => "i2p",
        }
    }
}

/// Traffic direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Rx,
    Tx,
}

impl Direction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Direction::Rx => "rx",
            Direction::Tx => "tx",
        }
    }
}

/// Network domain metrics.
pub trait NetMetrics: Send + Sync {
    /// Count a socket event (open, accept, close). Unknown events are dropped.
    fn inc_connection(&self, event: &str);

    fn connection_gauge(&self, kind: ConnectionKind, amt: u32);

    /// Add `bytes` to the per-message bandwidth series for `direction`.
    fn bandwidth(&self, direction: Direction, msg_type: &str, bytes: u64);

    /// Observe a ping round trip in microseconds.
    fn ping_time(&self, amt: i64);

    fn inc_ping_problem(&self);
}

struct BandwidthGauges {
    by_type: HashMap<&'static str, Gauge>,
    unknown: Gauge,
}

impl BandwidthGauges {
    fn get(&self, msg_type: &str) -> &Gauge {
        self.by_type.get(msg_type).unwrap_or(&self.unknown)
    }
}

pub struct LiveNetMetrics {
    connections: HashMap<ConnectionKind, Gauge>,
    sockets: HashMap<&'static str, Counter>,
    rx: BandwidthGauges,
    tx: BandwidthGauges,
    ping: Histogram,
    ping_problems: Counter,
}

impl LiveNetMetrics {
    #[must_use]
    pub fn new(builder: &FamilyBuilder) -> Self {
        let connection_family = builder.gauge(CONNECTION_FAMILY, &[]);
        let connections = ConnectionKind::ALL
            .iter()
            .map(|kind| (*kind, connection_family.add(&[("type", kind.as_str())])))
            .collect();

        let socket_family = builder.counter(SOCKET_FAMILY, &[]);
        let sockets = SOCKET_EVENTS
            .iter()
            .map(|event| (*event, socket_family.add(&[("type", *event)])))
            .collect();

        let bandwidth_family = builder.gauge(BANDWIDTH_FAMILY, &[]);
        let bandwidth = |direction: Direction| {
            let add = |msg_type: &str| {
                bandwidth_family.add(&[("type", msg_type), ("direction", direction.as_str())])
            };
            BandwidthGauges {
                by_type: NET_MESSAGE_TYPES
                    .iter()
                    .chain(std::iter::once(&TOTAL_MESSAGES))
                    .map(|msg_type| (*msg_type, add(msg_type)))
                    .collect(),
                unknown: add(UNKNOWN_MESSAGE),
            }
        };

        Self {
            connections,
            sockets,
            rx: bandwidth(Direction::Rx),
            tx: bandwidth(Direction::Tx),
            ping: builder.summary(PING_FAMILY).add(&[]),
            ping_problems: builder.counter(PING_PROBLEM_FAMILY, &[]).add(&[]),
        }
    }
}

impl NetMetrics for LiveNetMetrics {
    fn inc_connection(&self, event: &str) {
        if let Some(counter) = self.sockets.get(event) {
            counter.increment(1);
        }
    }

    fn connection_gauge(&self, kind: ConnectionKind, amt: u32) {
        if let Some(gauge) = self.connections.get(&kind) {
            gauge.set(f64::from(amt));
        }
    }

    // u64 to f64 conversion is safe for realistic byte counts (< 2^53)
    #[allow(clippy::cast_precision_loss)]
    fn bandwidth(&self, direction: Direction, msg_type: &str, bytes: u64) {
        let gauges = match direction {
            Direction::Rx => &self.rx,
            Direction::Tx => &self.tx,
        };
        gauges.get(msg_type).increment(bytes as f64);
    }

    // i64 to f64 conversion is exact for realistic ping times
    #[allow(clippy::cast_precision_loss)]
    fn ping_time(&self, amt: i64) {
        self.ping.record(amt as f64);
    }

    fn inc_ping_problem(&self) {
        self.ping_problems.increment(1);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNetMetrics;

impl NetMetrics for NoopNetMetrics {
    fn inc_connection(&self, _event: &str) {}

    fn connection_gauge(&self, _kind: ConnectionKind, _amt: u32) {}

    fn bandwidth(&self, _direction: Direction, _msg_type: &str, _bytes: u64) {}

    fn ping_time(&self, _amt: i64) {}

    fn inc_ping_problem(&self) {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::registry::MetricsRegistry;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn live() -> (LiveNetMetrics, Snapshotter) {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let builder = FamilyBuilder::new("test", MetricsRegistry::from_recorder(Arc::new(recorder)));
        (LiveNetMetrics::new(&builder), snapshotter)
    }

    fn bandwidth(snapshotter: &Snapshotter, msg_type: &str, direction: &str) -> f64 {
        snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .find_map(|(key, _, _, value)| {
                let key = key.key();
                let hit = key.name() == BANDWIDTH_FAMILY
                    && key.labels().any(|l| l.key() == "type" && l.value() == msg_type)
                    && key
                        .labels()
                        .any(|l| l.key() == "direction" && l.value() == direction);
                match (hit, value) {
                    (true, DebugValue::Gauge(v)) => Some(v.into_inner()),
                    _ => None,
                }
            })
            .unwrap()
    }

    #[test]
    fn test_message_types_are_unique() {
        let unique: HashSet<_> = NET_MESSAGE_TYPES.iter().collect();
        assert_eq!(unique.len(), NET_MESSAGE_TYPES.len());
        assert!(!unique.contains(&TOTAL_MESSAGES));
        assert!(!unique.contains(&UNKNOWN_MESSAGE));
    }

    #[test]
    fn test_bandwidth_accumulates_per_direction() {
        let (metrics, snapshotter) = live();
        metrics.bandwidth(Direction::Rx, "inv", 100);
        metrics.bandwidth(Direction::Rx, "inv", 50);
        metrics.bandwidth(Direction::Tx, "inv", 7);

        assert_eq!(bandwidth(&snapshotter, "inv", "rx"), 150.0);
        assert_eq!(bandwidth(&snapshotter, "inv", "tx"), 7.0);
    }

    #[test]
    fn test_bandwidth_unknown_message_folds_into_unknown() {
        let (metrics, snapshotter) = live();
        metrics.bandwidth(Direction::Tx, "no-such-message", 64);

        assert_eq!(bandwidth(&snapshotter, UNKNOWN_MESSAGE, "tx"), 64.0);
        assert_eq!(bandwidth(&snapshotter, UNKNOWN_MESSAGE, "rx"), 0.0);
    }

    #[test]
    fn test_unknown_socket_event_is_dropped() {
        let (metrics, snapshotter) = live();
        metrics.inc_connection("reset");

        for (key, _, _, value) in snapshotter.snapshot().into_vec() {
            if key.key().name() == SOCKET_FAMILY {
                assert!(matches!(value, DebugValue::Counter(0)));
            }
        }
    }

    #[test]
    fn test_series_count() {
        let (_metrics, snapshotter) = live();
        let bandwidth_series = 2 * (NET_MESSAGE_TYPES.len() + 2);
        let expected = ConnectionKind::ALL.len() + SOCKET_EVENTS.len() + bandwidth_series + 2;
        assert_eq!(snapshotter.snapshot().into_vec().len(), expected);
    }
}
