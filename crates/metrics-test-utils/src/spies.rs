//! Spy groups that record calls instead of writing metrics.

use std::sync::Mutex;

use node_metrics::groups::{BlockTimer, MempoolStat};
use node_metrics::{BlockMetrics, MempoolMetrics};

/// A call received by [`SpyBlockMetrics`].
///
/// Per-stat setters and per-stage timer methods arrive as the `update` and
/// `timer` calls they delegate to.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockCall {
    Update(String, f64),
    Timer(BlockTimer, i64, f64),
}

#[derive(Debug, Default)]
pub struct SpyBlockMetrics {
    calls: Mutex<Vec<BlockCall>>,
}

impl SpyBlockMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BlockCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Value of the most recent `update` for `stat`.
    pub fn last_update(&self, stat: &str) -> Option<f64> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|call| match call {
                BlockCall::Update(s, v) if s == stat => Some(*v),
                _ => None,
            })
    }
}

impl BlockMetrics for SpyBlockMetrics {
    fn update(&self, stat: &str, amt: f64) {
        self.calls
            .lock()
            .unwrap()
            .push(BlockCall::Update(stat.to_string(), amt));
    }

    fn timer(&self, op: BlockTimer, current: i64, avg: f64) {
        self.calls
            .lock()
            .unwrap()
            .push(BlockCall::Timer(op, current, avg));
    }
}

/// A call received by [`SpyMempoolMetrics`].
#[derive(Debug, Clone, PartialEq)]
pub enum MempoolCall {
    AcceptTime(i64, f64),
    Transactions(MempoolStat, i64),
    Incoming {
        inputs: usize,
        outputs: usize,
        bytes: u64,
        amount: i64,
    },
    Removed(u32),
    Orphans(usize, usize),
}

#[derive(Debug, Default)]
pub struct SpyMempoolMetrics {
    calls: Mutex<Vec<MempoolCall>>,
}

impl SpyMempoolMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<MempoolCall> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, call: MempoolCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MempoolMetrics for SpyMempoolMetrics {
    fn accept_time(&self, current: i64, avg: f64) {
        self.push(MempoolCall::AcceptTime(current, avg));
    }

    fn transactions(&self, stat: MempoolStat, amt: i64) {
        self.push(MempoolCall::Transactions(stat, amt));
    }

    fn incoming(&self, inputs: usize, outputs: usize, bytes: u64, amount: i64) {
        self.push(MempoolCall::Incoming {
            inputs,
            outputs,
            bytes,
            amount,
        });
    }

    fn removed(&self, reason: u32) {
        self.push(MempoolCall::Removed(reason));
    }

    fn orphans(&self, map: usize, outpoints: usize) {
        self.push(MempoolCall::Orphans(map, outpoints));
    }
}
