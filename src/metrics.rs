//! Optional pool counters, enabled with the `metrics` feature.

#[cfg(feature = "metrics")]
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters updated by the pool. All loads and stores are relaxed;
/// snapshots are approximate under concurrency.
#[cfg(feature = "metrics")]
#[derive(Debug, Default)]
pub struct Metrics {
    /// Tasks accepted by `submit`/`submit_with`.
    pub tasks_submitted: AtomicU64,
    /// Tasks a worker ran to completion.
    pub tasks_executed: AtomicU64,
    /// Successful pops from a queue other than the worker's own.
    pub queue_steals: AtomicU64,
    /// Submissions that fell through every `try_push` to the blocking path.
    pub blocking_pushes: AtomicU64,
}

#[cfg(feature = "metrics")]
impl Metrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            queue_steals: self.queue_steals.load(Ordering::Relaxed),
            blocking_pushes: self.blocking_pushes.load(Ordering::Relaxed),
        }
    }
}

/// Counter values at a point in time.
#[cfg(feature = "metrics")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MetricsSnapshot {
    pub tasks_submitted: u64,
    pub tasks_executed: u64,
    pub queue_steals: u64,
    pub blocking_pushes: u64,
}

#[cfg(feature = "metrics")]
impl MetricsSnapshot {
    /// Tasks submitted but not yet executed.
    pub fn tasks_pending(&self) -> u64 {
        self.tasks_submitted.saturating_sub(self.tasks_executed)
    }
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_updates() {
        let metrics = Metrics::default();
        metrics.tasks_submitted.fetch_add(3, Ordering::Relaxed);
        metrics.tasks_executed.fetch_add(1, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tasks_submitted, 3);
        assert_eq!(snapshot.tasks_executed, 1);
        assert_eq!(snapshot.tasks_pending(), 2);
    }
}
