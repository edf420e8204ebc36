use crate::domain::LogEntry;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_STORE_KEY: &str = "rask-client-logs";
pub const DEFAULT_STORE_CAPACITY: usize = 100;

/// Capped local history of recent entries. Failures are logged, never
/// raised.
pub trait LocalLogStore: Send + Sync {
    fn append(&self, entry: &LogEntry);
    fn read_all(&self) -> Vec<LogEntry>;
    fn clear(&self);
}

#[derive(Debug)]
pub struct MemoryLogStore {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_CAPACITY)
    }
}

impl MemoryLogStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }
}

impl LocalLogStore for MemoryLogStore {
    fn append(&self, entry: &LogEntry) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
    }

    fn read_all(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Stores entries in a JSON file holding `{ key: [entry, ...] }`, so
/// several stores can share one file under different keys.
#[derive(Debug)]
pub struct FileLogStore {
    path: PathBuf,
    key: String,
    capacity: usize,
    io: Mutex<()>,
}

impl FileLogStore {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self::with_key(path, DEFAULT_STORE_KEY, capacity)
    }

    pub fn with_key(path: impl Into<PathBuf>, key: impl Into<String>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
            capacity,
            io: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_document(&self) -> Map<String, Value> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read local log store");
                return Map::new();
            }
        };

        match serde_json::from_str::<Map<String, Value>>(&raw) {
            Ok(document) => document,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Local log store is corrupt, starting over");
                Map::new()
            }
        }
    }

    fn entries_in(&self, document: &Map<String, Value>) -> Vec<LogEntry> {
        let Some(stored) = document.get(&self.key) else {
            return Vec::new();
        };
        match serde_json::from_value(stored.clone()) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Discarding unreadable stored logs");
                Vec::new()
            }
        }
    }

    fn save_document(&self, document: &Map<String, Value>) {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty())
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(path = %parent.display(), error = %e, "Failed to create local log store directory");
            return;
        }

        let serialized = match serde_json::to_string(document) {
            Ok(serialized) => serialized,
            Err(e) => {
                warn!(error = %e, "Failed to serialize local log store");
                return;
            }
        };

        if let Err(e) = std::fs::write(&self.path, serialized) {
            warn!(path = %self.path.display(), error = %e, "Failed to write local log store");
        }
    }
}

impl LocalLogStore for FileLogStore {
    fn append(&self, entry: &LogEntry) {
        if self.capacity == 0 {
            return;
        }
        let _io = self.io.lock();
        let mut document = self.load_document();
        let mut entries = self.entries_in(&document);

        entries.push(entry.clone());
        if entries.len() > self.capacity {
            let excess = entries.len() - self.capacity;
            entries.drain(..excess);
        }

        match serde_json::to_value(&entries) {
            Ok(value) => {
                document.insert(self.key.clone(), value);
                self.save_document(&document);
            }
            Err(e) => warn!(error = %e, "Failed to serialize log entries"),
        }
    }

    fn read_all(&self) -> Vec<LogEntry> {
        let _io = self.io.lock();
        let document = self.load_document();
        self.entries_in(&document)
    }

    fn clear(&self) {
        let _io = self.io.lock();
        let mut document = self.load_document();
        if document.remove(&self.key).is_some() {
            self.save_document(&document);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LogLevel, LogSource};
    use tempfile::TempDir;

    fn entry(message: &str) -> LogEntry {
        LogEntry::new(LogLevel::Info, message, None, LogSource::Api)
    }

    fn messages(entries: &[LogEntry]) -> Vec<String> {
        entries.iter().map(|e| e.message().to_string()).collect()
    }

    #[test]
    fn test_memory_store_drops_oldest() {
        let store = MemoryLogStore::new(2);
        store.append(&entry("a"));
        store.append(&entry("b"));
        store.append(&entry("c"));
        assert_eq!(messages(&store.read_all()), vec!["b", "c"]);

        store.clear();
        assert!(store.read_all().is_empty());
    }

    #[test]
    fn test_file_store_round_trip_and_cap() {
        let dir = TempDir::new().unwrap();
        let store = FileLogStore::new(dir.path().join("logs.json"), 2);

        store.append(&entry("a"));
        store.append(&entry("b"));
        store.append(&entry("c"));
        assert_eq!(messages(&store.read_all()), vec!["b", "c"]);

        // A second handle on the same file sees the same entries.
        let reopened = FileLogStore::new(dir.path().join("logs.json"), 2);
        assert_eq!(messages(&reopened.read_all()), vec!["b", "c"]);
    }

    #[test]
    fn test_file_store_keys_are_independent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared.json");
        let first = FileLogStore::with_key(&path, "first", 10);
        let second = FileLogStore::with_key(&path, "second", 10);

        first.append(&entry("one"));
        second.append(&entry("two"));
        first.clear();

        assert!(first.read_all().is_empty());
        assert_eq!(messages(&second.read_all()), vec!["two"]);
    }

    #[test]
    fn test_corrupt_file_is_recovered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileLogStore::new(&path, 5);
        assert!(store.read_all().is_empty());
        store.append(&entry("fresh"));
        assert_eq!(messages(&store.read_all()), vec!["fresh"]);
    }

    #[test]
    fn test_unwritable_path_never_panics() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be.
        let store = FileLogStore::new(dir.path(), 5);
        store.append(&entry("lost"));
        assert!(store.read_all().is_empty());
    }
}
