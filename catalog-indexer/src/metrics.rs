//! In-process counters for the sync pipeline.
//!
//! Counters are shared through an `Arc` between the intake loop, the flusher and the
//! progress logger, and are only ever read as a whole through [`SyncMetrics::snapshot`].

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters of the sync pipeline.
#[derive(Debug, Default)]
pub struct SyncMetrics {
    /// Change events accepted into the buffer (duplicates included).
    pub events_received: AtomicU64,
    /// Change events naming a table outside the catalog.
    pub unknown_table_events: AtomicU64,
    /// Flush cycles that had work to do.
    pub flushes: AtomicU64,
    /// Documents written with an index action.
    pub documents_upserted: AtomicU64,
    /// Documents removed from the index.
    pub documents_deleted: AtomicU64,
    /// IDs or events that failed a cycle and went to the retry path.
    pub retries_scheduled: AtomicU64,
    /// Entries handed to the dead-letter sink.
    pub dead_lettered: AtomicU64,
    /// Successful offset commits.
    pub commits: AtomicU64,
    /// Failed offset commits.
    pub commit_failures: AtomicU64,
}

/// Point-in-time copy of [`SyncMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub unknown_table_events: u64,
    pub flushes: u64,
    pub documents_upserted: u64,
    pub documents_deleted: u64,
    pub retries_scheduled: u64,
    pub dead_lettered: u64,
    pub commits: u64,
    pub commit_failures: u64,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` to a counter.
    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            unknown_table_events: self.unknown_table_events.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            documents_upserted: self.documents_upserted.load(Ordering::Relaxed),
            documents_deleted: self.documents_deleted.load(Ordering::Relaxed),
            retries_scheduled: self.retries_scheduled.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            commit_failures: self.commit_failures.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSnapshot {
    /// Documents written or removed.
    pub fn documents_applied(&self) -> u64 {
        self.documents_upserted + self.documents_deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = SyncMetrics::new();
        SyncMetrics::add(&metrics.events_received, 3);
        SyncMetrics::add(&metrics.documents_upserted, 2);
        SyncMetrics::add(&metrics.documents_deleted, 1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.events_received, 3);
        assert_eq!(snapshot.documents_applied(), 3);
        assert_eq!(snapshot.dead_lettered, 0);
    }
}
