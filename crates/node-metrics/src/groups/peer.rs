//! Per-peer message processing metrics.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `peer_msg_process` | Histogram | `type` (P2P message type) |
//! | `peer_msg_push` | Counter | `type` (P2P message type) |
//! | `peer_tx_validation` | Counter | `result` (see [`ValidationResult`]) |
//! | `peer_misbehave` | Counter | `type` (peers, score) |
//! | `peer_connection` | Gauge | `type` (see [`PeerConnectionType`]) |
//! | `peer_known` | Gauge | none |
//! | `peer_banned` | Gauge | none |
//! | `peer_send_msg` | Summary | none |
//!
//! Message types outside [`NET_MESSAGE_TYPES`] and codes outside the
//! validation-result and connection-type enumerations are dropped.

use std::collections::HashMap;

use metrics::{Counter, Gauge, Histogram};

use super::net::NET_MESSAGE_TYPES;
use super::tx::ValidationResult;
use crate::registry::{BucketSpec, FamilyBuilder};

pub const PROCESS_FAMILY: &str = "peer_msg_process";
pub const PUSH_FAMILY: &str = "peer_msg_push";
pub const VALIDATION_FAMILY: &str = "peer_tx_validation";
pub const MISBEHAVE_FAMILY: &str = "peer_misbehave";
pub const CONNECTION_FAMILY: &str = "peer_connection";
pub const KNOWN_FAMILY: &str = "peer_known";
pub const BANNED_FAMILY: &str = "peer_banned";
pub const SEND_FAMILY: &str = "peer_send_msg";

pub const PEER_PROCESS_MSG: BucketSpec =
    BucketSpec::new("process", &[100.0, 500.0, 1000.0, 5000.0, 10_000.0]);

/// How a peer connection was established. Discriminants are the wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerConnectionType {
    Inbound = 0,
    OutboundFullRelay = 1,
    Manual = 2,
    Feeler = 3,
    BlockRelay = 4,
    AddrFetch = 5,
}

impl PeerConnectionType {
    pub const ALL: [PeerConnectionType; 6] = [
        PeerConnectionType::Inbound,
        PeerConnectionType::OutboundFullRelay,
        PeerConnectionType::Manual,
        PeerConnectionType::Feeler,
        PeerConnectionType::BlockRelay,
        PeerConnectionType::AddrFetch,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            PeerConnectionType::Inbound => "inbound",
            PeerConnectionType::OutboundFullRelay => "outbound-full-relay",
            PeerConnectionType::Manual => "manual",
            PeerConnectionType::Feeler => "feeler",
            PeerConnectionType::BlockRelay => "block-relay-only",
            PeerConnectionType::AddrFetch => "addr-fetch",
        }
    }
}

/// Peer domain metrics.
pub trait PeerMetrics: Send + Sync {
    /// Observe the time (us) spent processing one message of `msg_type`.
    fn process_msg_type(&self, msg_type: &str, amt: i64);

    /// Count a transaction validation outcome by [`ValidationResult`] code.
    fn inc_tx_validation_result(&self, state: u32);

    /// Count a peer being marked as misbehaving.
    fn inc_misbehaving(&self);

    /// Add to the accumulated misbehavior score. Negative amounts are ignored.
    fn inc_misbehave_amount(&self, amt: i32);

    /// Set the number of peers connected as [`PeerConnectionType`] code `kind`.
    fn connection_type(&self, kind: u32, amt: u32);

    fn known(&self, amt: usize);

    /// Observe the time (us) spent sending one message.
    fn send_message_time(&self, amt: i64);

    fn push_msg_type(&self, msg_type: &str);

    fn banned(&self, amt: u64);
}

pub struct LivePeerMetrics {
    process: HashMap<&'static str, Histogram>,
    push: HashMap<&'static str, Counter>,
    validations: Vec<Counter>,
    misbehaving_peers: Counter,
    misbehave_score: Counter,
    connections: Vec<Gauge>,
    known: Gauge,
    banned: Gauge,
    send: Histogram,
}

impl LivePeerMetrics {
    #[must_use]
    pub fn new(builder: &FamilyBuilder) -> Self {
        let process_family = builder.histogram(PROCESS_FAMILY, &[]);
        let push_family = builder.counter(PUSH_FAMILY, &[]);
        let process = NET_MESSAGE_TYPES
            .iter()
            .map(|msg| (*msg, process_family.add(&[("type", *msg)])))
            .collect();
        let push = NET_MESSAGE_TYPES
            .iter()
            .map(|msg| (*msg, push_family.add(&[("type", *msg)])))
            .collect();

        let validation_family = builder.counter(VALIDATION_FAMILY, &[]);
        let validations = ValidationResult::ALL
            .iter()
            .map(|result| validation_family.add(&[("result", result.as_str())]))
            .collect();

        let misbehave_family = builder.counter(MISBEHAVE_FAMILY, &[]);
        let connection_family = builder.gauge(CONNECTION_FAMILY, &[]);
        let connections = PeerConnectionType::ALL
            .iter()
            .map(|kind| connection_family.add(&[("type", kind.as_str())]))
            .collect();

        Self {
            process,
            push,
            validations,
            misbehaving_peers: misbehave_family.add(&[("type", "peers")]),
            misbehave_score: misbehave_family.add(&[("type", "score")]),
            connections,
            known: builder.gauge(KNOWN_FAMILY, &[]).add(&[]),
            banned: builder.gauge(BANNED_FAMILY, &[]).add(&[]),
            send: builder.summary(SEND_FAMILY).add(&[]),
        }
    }
}

fn slot(code: u32) -> usize {
    usize::try_from(code).unwrap_or(usize::MAX)
}

impl PeerMetrics for LivePeerMetrics {
    // i64 to f64 conversion is exact for realistic processing times
    #[allow(clippy::cast_precision_loss)]
    fn process_msg_type(&self, msg_type: &str, amt: i64) {
        if let Some(histogram) = self.process.get(msg_type) {
            histogram.record(amt as f64);
        }
    }

    fn inc_tx_validation_result(&self, state: u32) {
        if let Some(counter) = self.validations.get(slot(state)) {
            counter.increment(1);
        }
    }

    fn inc_misbehaving(&self) {
        self.misbehaving_peers.increment(1);
    }

    fn inc_misbehave_amount(&self, amt: i32) {
        if let Ok(amt) = u64::try_from(amt) {
            self.misbehave_score.increment(amt);
        }
    }

    fn connection_type(&self, kind: u32, amt: u32) {
        if let Some(gauge) = self.connections.get(slot(kind)) {
            gauge.set(f64::from(amt));
        }
    }

    // usize to f64 conversion is safe for realistic address manager sizes
    #[allow(clippy::cast_precision_loss)]
    fn known(&self, amt: usize) {
        self.known.set(amt as f64);
    }

    // i64 to f64 conversion is exact for realistic send times
    #[allow(clippy::cast_precision_loss)]
    fn send_message_time(&self, amt: i64) {
        self.send.record(amt as f64);
    }

    fn push_msg_type(&self, msg_type: &str) {
        if let Some(counter) = self.push.get(msg_type) {
            counter.increment(1);
        }
    }

    // u64 to f64 conversion is safe for realistic ban list sizes
    #[allow(clippy::cast_precision_loss)]
    fn banned(&self, amt: u64) {
        self.banned.set(amt as f64);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPeerMetrics;

impl PeerMetrics for NoopPeerMetrics {
    fn process_msg_type(&self, _msg_type: &str, _amt: i64) {}

    fn inc_tx_validation_result(&self, _state: u32) {}

    fn inc_misbehaving(&self) {}

    fn inc_misbehave_amount(&self, _amt: i32) {}

    fn connection_type(&self, _kind: u32, _amt: u32) {}

    fn known(&self, _amt: usize) {}

    fn send_message_time(&self, _amt: i64) {}

    fn push_msg_type(&self, _msg_type: &str) {}

    fn banned(&self, _amt: u64) {}
}
