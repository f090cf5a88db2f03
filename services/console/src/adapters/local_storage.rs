//! services/console/src/adapters/local_storage.rs
//!
//! A file-backed implementation of the `LocalStorage` port: the whole key space
//! is one JSON object, rewritten on every change. Like the browser's storage it
//! is synchronous and scoped to one profile (one file).

use hr_console_core::ports::{LocalStorage, PortError, PortResult};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

pub struct FileLocalStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileLocalStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> PortResult<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| PortError::Storage(format!("Unreadable storage file: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(PortError::Storage(e.to_string())),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> PortResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PortError::Storage(e.to_string()))?;
        }
        let serialized =
            serde_json::to_string_pretty(entries).map_err(|e| PortError::Storage(e.to_string()))?;
        // Write then rename so a crash never leaves a half-written file behind.
        let staging = self.path.with_extension("tmp");
        std::fs::write(&staging, serialized).map_err(|e| PortError::Storage(e.to_string()))?;
        std::fs::rename(&staging, &self.path).map_err(|e| PortError::Storage(e.to_string()))
    }

    fn modify<F>(&self, change: F) -> PortResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| PortError::Storage("Storage lock poisoned".to_string()))?;
        let mut entries = self.read_all()?;
        change(&mut entries);
        self.write_all(&entries)
    }
}

impl LocalStorage for FileLocalStorage {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.modify(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileLocalStorage::new(dir.path().join("profile/storage.json"));
        assert_eq!(storage.get("notifications").unwrap(), None);
    }

    #[test]
    fn values_survive_a_new_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let storage = FileLocalStorage::new(&path);
        storage.set("notifications", "[]").unwrap();
        storage.set("auth.session", "{}").unwrap();
        storage.remove("auth.session").unwrap();

        let reopened = FileLocalStorage::new(&path);
        assert_eq!(reopened.get("notifications").unwrap().as_deref(), Some("[]"));
        assert_eq!(reopened.get("auth.session").unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{not json").unwrap();

        let storage = FileLocalStorage::new(&path);
        assert!(matches!(storage.get("x"), Err(PortError::Storage(_))));
    }
}
