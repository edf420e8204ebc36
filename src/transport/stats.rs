use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct TransportCounters {
    batches_delivered: AtomicU64,
    entries_delivered: AtomicU64,
    failed_attempts: AtomicU64,
    retries: AtomicU64,
    dropped_batches: AtomicU64,
    dropped_entries: AtomicU64,
    unload_flushes: AtomicU64,
}

impl TransportCounters {
    pub(crate) fn record_delivered(&self, entries: usize) {
        self.batches_delivered.fetch_add(1, Ordering::Relaxed);
        self.entries_delivered
            .fetch_add(entries as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_failed_attempt(&self) {
        self.failed_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self, entries: usize) {
        self.dropped_batches.fetch_add(1, Ordering::Relaxed);
        self.dropped_entries
            .fetch_add(entries as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_unload_flush(&self) {
        self.unload_flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, pending: usize) -> TransportStats {
        TransportStats {
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            entries_delivered: self.entries_delivered.load(Ordering::Relaxed),
            failed_attempts: self.failed_attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            dropped_batches: self.dropped_batches.load(Ordering::Relaxed),
            dropped_entries: self.dropped_entries.load(Ordering::Relaxed),
            unload_flushes: self.unload_flushes.load(Ordering::Relaxed),
            pending,
        }
    }
}

/// Point-in-time view of a transport's delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransportStats {
    pub batches_delivered: u64,
    pub entries_delivered: u64,
    pub failed_attempts: u64,
    pub retries: u64,
    pub dropped_batches: u64,
    pub dropped_entries: u64,
    pub unload_flushes: u64,
    pub pending: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let counters = TransportCounters::default();
        counters.record_delivered(3);
        counters.record_failed_attempt();
        counters.record_retry();
        counters.record_dropped(2);
        counters.record_unload_flush();

        let stats = counters.snapshot(5);
        assert_eq!(stats.batches_delivered, 1);
        assert_eq!(stats.entries_delivered, 3);
        assert_eq!(stats.failed_attempts, 1);
        assert_eq!(stats.retries, 1);
        assert_eq!(stats.dropped_batches, 1);
        assert_eq!(stats.dropped_entries, 2);
        assert_eq!(stats.unload_flushes, 1);
        assert_eq!(stats.pending, 5);
    }
}
