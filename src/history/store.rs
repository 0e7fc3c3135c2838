//! The evaluation history store.
//!
//! Entries are loaded once when the store is opened and flushed to the
//! backend after every mutation. Newest entries come first.

use crate::error::{HistoryError, StorageError};
use crate::history::backend::KeyValueStore;
use crate::models::EvaluationRecord;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Maximum number of evaluations kept.
pub const HISTORY_CAPACITY: usize = 10;

/// Key the history blob is stored under.
pub const DEFAULT_HISTORY_KEY: &str = "pregrant_evaluations";

/// Ordered, capacity-bounded evaluation history.
///
/// All mutations take the write lock and flush before releasing it, so
/// concurrent `record` calls are serialized and the persisted blob always
/// matches some in-memory state. Readers get a cloned snapshot.
pub struct HistoryStore {
    backend: Box<dyn KeyValueStore>,
    key: String,
    entries: RwLock<Vec<EvaluationRecord>>,
}

impl HistoryStore {
    /// Open the store, loading whatever the backend holds under `key`.
    pub fn open(backend: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let entries = load_entries(backend.as_ref(), &key);
        info!(
            backend = backend.name(),
            count = entries.len(),
            "Evaluation history loaded"
        );

        Self {
            backend,
            key,
            entries: RwLock::new(entries),
        }
    }

    /// Prepend an evaluation, evicting the oldest beyond capacity, and persist.
    ///
    /// A failed flush is logged; the in-memory history keeps the new entry.
    pub fn record(&self, evaluation: EvaluationRecord) {
        let mut entries = self.entries.write();
        entries.insert(0, evaluation);

        if entries.len() > HISTORY_CAPACITY {
            let evicted = entries.len() - HISTORY_CAPACITY;
            entries.truncate(HISTORY_CAPACITY);
            debug!("Evicted {} oldest evaluation(s)", evicted);
        }

        if let Err(e) = self.write_entries(&entries) {
            warn!(error = %e, "Failed to persist evaluation history, keeping it in memory");
        }
    }

    /// Snapshot of all entries, newest first.
    pub fn list(&self) -> Vec<EvaluationRecord> {
        self.entries.read().clone()
    }

    /// Entry at `index` (0 = newest).
    pub fn get(&self, index: usize) -> Result<EvaluationRecord, HistoryError> {
        let entries = self.entries.read();
        entries
            .get(index)
            .cloned()
            .ok_or(HistoryError::IndexOutOfRange {
                index,
                len: entries.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Persist the current entries.
    #[allow(dead_code)]
    pub fn flush(&self) -> Result<(), StorageError> {
        // Hold the write lock so a flush never interleaves with a record.
        let entries = self.entries.write();
        self.write_entries(&entries)
    }

    fn write_entries(&self, entries: &[EvaluationRecord]) -> Result<(), StorageError> {
        let blob = serde_json::to_vec_pretty(entries)?;
        self.backend.write(&self.key, &blob)
    }
}

/// Decode the persisted blob. Unreadable or corrupt data yields an empty
/// history; individually corrupt entries are skipped.
fn load_entries(backend: &dyn KeyValueStore, key: &str) -> Vec<EvaluationRecord> {
    let blob = match backend.read(key) {
        Ok(Some(blob)) => blob,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, "Could not read evaluation history, starting empty");
            return Vec::new();
        }
    };

    let raw: Vec<Value> = match serde_json::from_slice(&blob) {
        Ok(raw) => raw,
        Err(e) => {
            let e = StorageError::Corrupt(e.to_string());
            warn!(error = %e, "Discarding evaluation history, starting empty");
            return Vec::new();
        }
    };

    let mut entries: Vec<EvaluationRecord> = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping corrupted history entry");
                None
            }
        })
        .collect();

    if entries.len() > HISTORY_CAPACITY {
        warn!(
            count = entries.len(),
            "Persisted history exceeds capacity, keeping the newest {}", HISTORY_CAPACITY
        );
        entries.truncate(HISTORY_CAPACITY);
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::backend::FileStore;
    use crate::models::tests::sample_record;
    use chrono::{Duration, TimeZone, Utc};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// In-memory backend shared with the test through an `Arc`.
    #[derive(Default, Clone)]
    struct MemoryStore {
        blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        fail_writes: bool,
    }

    impl KeyValueStore for MemoryStore {
        fn name(&self) -> &str {
            "memory"
        }

        fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            Ok(self.blobs.lock().get(key).cloned())
        }

        fn write(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.blobs.lock().insert(key.to_string(), value.to_vec());
            Ok(())
        }
    }

    fn record_at(n: i64) -> EvaluationRecord {
        let mut record = sample_record();
        record.project_name = format!("Project {n}");
        record.timestamp = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(n);
        record
    }

    fn persisted(memory: &MemoryStore) -> Vec<EvaluationRecord> {
        let blobs = memory.blobs.lock();
        serde_json::from_slice(&blobs[DEFAULT_HISTORY_KEY]).unwrap()
    }

    #[test]
    fn test_record_prepends_and_persists() {
        let memory = MemoryStore::default();
        let store = HistoryStore::open(Box::new(memory.clone()), DEFAULT_HISTORY_KEY);

        store.record(record_at(1));
        store.record(record_at(2));

        let list = store.list();
        assert_eq!(list[0].project_name, "Project 2");
        assert_eq!(list[1].project_name, "Project 1");
        assert_eq!(persisted(&memory), list);
    }

    #[test]
    fn test_twelve_records_keep_newest_ten() {
        let memory = MemoryStore::default();
        let store = HistoryStore::open(Box::new(memory.clone()), DEFAULT_HISTORY_KEY);

        for n in 1..=12 {
            store.record(record_at(n));
            assert!(store.len() <= HISTORY_CAPACITY);
        }

        let names: Vec<_> = store.list().into_iter().map(|r| r.project_name).collect();
        let expected: Vec<_> = (3..=12).rev().map(|n| format!("Project {n}")).collect();
        assert_eq!(names, expected);

        let timestamps: Vec<_> = store.list().iter().map(|r| r.timestamp).collect();
        assert!(timestamps.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(persisted(&memory).len(), HISTORY_CAPACITY);
    }

    #[test]
    fn test_get_out_of_range() {
        let store = HistoryStore::open(Box::new(MemoryStore::default()), DEFAULT_HISTORY_KEY);
        store.record(record_at(1));

        assert_eq!(store.get(0).unwrap().project_name, "Project 1");
        assert_eq!(
            store.get(1),
            Err(HistoryError::IndexOutOfRange { index: 1, len: 1 })
        );
    }

    #[test]
    fn test_reopen_restores_history() {
        let dir = TempDir::new().unwrap();
        {
            let store = HistoryStore::open(Box::new(FileStore::new(dir.path())), DEFAULT_HISTORY_KEY);
            store.record(record_at(1));
            store.record(record_at(2));
        }

        let store = HistoryStore::open(Box::new(FileStore::new(dir.path())), DEFAULT_HISTORY_KEY);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0).unwrap().project_name, "Project 2");
    }

    #[test]
    fn test_corrupt_blob_loads_empty() {
        let memory = MemoryStore::default();
        memory
            .blobs
            .lock()
            .insert(DEFAULT_HISTORY_KEY.to_string(), b"{not json".to_vec());

        let store = HistoryStore::open(Box::new(memory.clone()), DEFAULT_HISTORY_KEY);
        assert!(store.is_empty());

        store.record(record_at(1));
        assert_eq!(persisted(&memory).len(), 1);
    }

    #[test]
    fn test_corrupt_entries_are_skipped() {
        let good = serde_json::to_value(record_at(1)).unwrap();
        let blob = serde_json::to_vec(&serde_json::json!([good, {"projectName": 3}])).unwrap();

        let memory = MemoryStore::default();
        memory.blobs.lock().insert(DEFAULT_HISTORY_KEY.to_string(), blob);

        let store = HistoryStore::open(Box::new(memory), DEFAULT_HISTORY_KEY);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_oversized_blob_is_truncated_on_load() {
        let records: Vec<_> = (1..=15).rev().map(record_at).collect();
        let memory = MemoryStore::default();
        memory
            .blobs
            .lock()
            .insert(DEFAULT_HISTORY_KEY.to_string(), serde_json::to_vec(&records).unwrap());

        let store = HistoryStore::open(Box::new(memory), DEFAULT_HISTORY_KEY);
        assert_eq!(store.len(), HISTORY_CAPACITY);
        assert_eq!(store.get(0).unwrap().project_name, "Project 15");
    }

    #[test]
    fn test_failed_flush_keeps_memory_state() {
        let memory = MemoryStore {
            fail_writes: true,
            ..MemoryStore::default()
        };
        let store = HistoryStore::open(Box::new(memory.clone()), DEFAULT_HISTORY_KEY);

        store.record(record_at(1));

        assert_eq!(store.len(), 1);
        assert!(store.flush().is_err());
        assert!(memory.blobs.lock().is_empty());
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let memory = MemoryStore::default();
        let store = Arc::new(HistoryStore::open(Box::new(memory.clone()), DEFAULT_HISTORY_KEY));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..2 {
                        store.record(record_at(t * 10 + i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 8);
        assert_eq!(persisted(&memory), store.list());
    }
}
