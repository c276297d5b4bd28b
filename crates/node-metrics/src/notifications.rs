//! Translation of node validation events into metric updates.
//!
//! The node's event source calls [`ValidationListener`] methods on its
//! validation thread. [`MetricsNotifier`] forwards each event to the Block
//! and MemPool groups synchronously, without allocation or blocking.

use std::sync::Arc;

use crate::groups::{BlockMetrics, MempoolMetrics};

/// Block index fields consumed from a tip update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TipIndex {
    pub hash: [u8; 32],
    pub height: i32,
    /// Number of transactions in the block.
    pub tx_count: u32,
    /// Header timestamp, unix seconds.
    pub time: i64,
    pub version: i32,
    /// Compact difficulty target.
    pub bits: u32,
}

/// Transaction fields consumed from a mempool addition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxSummary {
    pub inputs: usize,
    pub outputs: usize,
    /// Serialized size in bytes.
    pub total_size: u64,
    /// Sum of output values.
    pub value_out: i64,
}

impl TxSummary {
    /// A transaction with neither inputs nor outputs.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.inputs == 0 && self.outputs == 0
    }
}

/// Difficulty relative to the minimum target, from compact `bits`.
///
/// Returns 0 for a zero mantissa.
#[must_use]
pub fn difficulty(bits: u32) -> f64 {
    let mantissa = bits & 0x00ff_ffff;
    if mantissa == 0 {
        return 0.0;
    }

    let mut shift = (bits >> 24) & 0xff;
    let mut diff = f64::from(0x0000_ffff_u32) / f64::from(mantissa);
    while shift < 29 {
        diff *= 256.0;
        shift += 1;
    }
    while shift > 29 {
        diff /= 256.0;
        shift -= 1;
    }
    diff
}

/// Subscription surface for node validation events.
///
/// Every method defaults to doing nothing.
pub trait ValidationListener: Send + Sync {
    /// The active chain tip changed. `fork` is the last common ancestor
    /// with the previous tip, if any.
    fn updated_block_tip(
        &self,
        _new_tip: &TipIndex,
        _fork: Option<&TipIndex>,
        _initial_download: bool,
    ) {
    }

    fn transaction_added_to_mempool(&self, _tx: &TxSummary, _sequence: u64) {}

    /// `reason` is a removal reason code; see
    /// [`RemovalReason`](crate::groups::RemovalReason).
    fn transaction_removed_from_mempool(&self, _tx: &TxSummary, _reason: u32, _sequence: u64) {}
}

/// Forwards validation events to the Block and MemPool groups.
#[derive(Clone)]
pub struct MetricsNotifier {
    block: Arc<dyn BlockMetrics>,
    mempool: Arc<dyn MempoolMetrics>,
}

impl MetricsNotifier {
    #[must_use]
    pub fn new(block: Arc<dyn BlockMetrics>, mempool: Arc<dyn MempoolMetrics>) -> Self {
        Self { block, mempool }
    }
}

impl ValidationListener for MetricsNotifier {
    // i64 to f64 conversion is exact for header timestamps
    #[allow(clippy::cast_precision_loss)]
    fn updated_block_tip(&self, new_tip: &TipIndex, fork: Option<&TipIndex>, initial_download: bool) {
        if initial_download {
            return;
        }
        if fork.is_some_and(|fork| fork.hash == new_tip.hash) {
            return;
        }

        self.block.transactions(f64::from(new_tip.tx_count));
        self.block.height(f64::from(new_tip.height));
        self.block.header_time(new_tip.time as f64);
        self.block.version(f64::from(new_tip.version));
        self.block.difficulty(difficulty(new_tip.bits));
    }

    fn transaction_added_to_mempool(&self, tx: &TxSummary, _sequence: u64) {
        if tx.is_null() {
            return;
        }
        self.mempool
            .incoming(tx.inputs, tx.outputs, tx.total_size, tx.value_out);
    }

    fn transaction_removed_from_mempool(&self, _tx: &TxSummary, reason: u32, _sequence: u64) {
        self.mempool.removed(reason);
    }
}
