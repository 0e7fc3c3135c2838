//! Key-value persistence for the history store.
//!
//! The store only needs "read blob by key" and "replace blob by key", so any
//! host facility offering that can back it. `FileStore` keeps one JSON file
//! per key in a directory.

use crate::error::StorageError;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// A persistent key-value facility.
pub trait KeyValueStore: Send + Sync {
    /// Name of the backend, for logging.
    fn name(&self) -> &str;

    /// Read the blob stored under `key`, `None` if nothing was stored yet.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the blob stored under `key`.
    ///
    /// Implementations must never leave a half-written blob behind.
    fn write(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default location: `~/.pregrant/history`
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pregrant")
            .join("history")
    }

    /// Directory holding the blobs.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No persisted history yet");
                Ok(None)
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;

        // Write next to the target, then rename over it.
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(value)?;
        temp.as_file().sync_all()?;
        temp.persist(self.path_for(key))
            .map_err(|e| StorageError::Io(e.error))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_key_reads_none() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.read("absent").unwrap().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        store.write("history", b"[1,2,3]").unwrap();
        assert_eq!(store.read("history").unwrap().as_deref(), Some(&b"[1,2,3]"[..]));

        store.write("history", b"[]").unwrap();
        assert_eq!(store.read("history").unwrap().as_deref(), Some(&b"[]"[..]));
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        store.write("k", b"{}").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["k.json".to_string()]);
    }

    #[test]
    fn test_key_is_sanitized_into_file_name() {
        let store = FileStore::new("/tmp/x");
        assert_eq!(
            store.path_for("../evil key"),
            PathBuf::from("/tmp/x/___evil_key.json")
        );
    }
}
