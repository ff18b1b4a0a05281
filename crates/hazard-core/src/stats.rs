use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Counters for work flowing through a [`WorkerPool`](crate::WorkerPool).
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Items placed on the queue.
    pub dispatched: AtomicU64,
    /// Items whose handler returned normally.
    pub handled: AtomicU64,
    /// Items whose handler panicked.
    pub panicked: AtomicU64,

    pub batches: AtomicU64,
    /// Batches whose await gave up before they drained.
    pub timed_out: AtomicU64,
}

impl PoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handled(&self) {
        self.handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_panic(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of the current counters.
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            handled: self.handled.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatsSnapshot {
    pub dispatched: u64,
    pub handled: u64,
    pub panicked: u64,
    pub batches: u64,
    pub timed_out: u64,
}

impl PoolStatsSnapshot {
    /// Items dispatched but not yet finished, one way or another.
    pub fn in_flight(&self) -> u64 {
        self.dispatched
            .saturating_sub(self.handled)
            .saturating_sub(self.panicked)
    }
}

/// Shared handle to pool counters.
pub type SharedStats = Arc<PoolStats>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_records() {
        let stats = PoolStats::new();
        stats.record_batch();
        for _ in 0..5 {
            stats.record_dispatch();
        }
        stats.record_handled();
        stats.record_handled();
        stats.record_panic();
        stats.record_timeout();

        let snap = stats.snapshot();
        assert_eq!(snap.dispatched, 5);
        assert_eq!(snap.handled, 2);
        assert_eq!(snap.panicked, 1);
        assert_eq!(snap.batches, 1);
        assert_eq!(snap.timed_out, 1);
        assert_eq!(snap.in_flight(), 2);
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = PoolStats::new().snapshot();
        assert_eq!(snap.in_flight(), 0);
        assert_eq!(snap.dispatched, 0);
    }
}
