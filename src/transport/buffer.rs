use crate::domain::LogEntry;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Ordered queue of entries awaiting delivery, owned by one transport.
///
/// The lock is only held for the duration of a push or swap, never across
/// an await point.
#[derive(Debug, Default)]
pub struct TransportBuffer {
    entries: Mutex<VecDeque<LogEntry>>,
}

impl TransportBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the tail and returns the new length.
    pub fn push(&self, entry: LogEntry) -> usize {
        let mut entries = self.entries.lock();
        entries.push_back(entry);
        entries.len()
    }

    /// Swaps the whole queue out, leaving an empty one behind.
    pub fn take_all(&self) -> Vec<LogEntry> {
        let drained = std::mem::take(&mut *self.entries.lock());
        drained.into()
    }

    /// Puts an undelivered batch back ahead of anything enqueued since.
    pub fn requeue_front(&self, batch: Vec<LogEntry>) {
        let mut entries = self.entries.lock();
        for entry in batch.into_iter().rev() {
            entries.push_front(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
