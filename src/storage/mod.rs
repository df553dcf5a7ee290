//! Key/value persistence for datasets.

use std::collections::BTreeMap;
use std::io;

#[cfg(feature = "file-store")]
mod file;

#[cfg(feature = "file-store")]
pub use file::FileStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid entry: {0}")]
    Entry(#[from] serde_json::Error),
    #[error("corrupt entry '{key}': {reason}")]
    Corrupt { key: String, reason: &'static str },
    #[error("invalid key '{0}'")]
    InvalidKey(String),
}

/// String store with the semantics of browser local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
    /// All keys, sorted.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
    fn clear(&mut self) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_basics() {
        let mut store = MemoryStore::new();
        store.set("dataset", "dungeon").unwrap();
        store.set("dataset-dungeon", "{}").unwrap();
        assert_eq!(store.get("dataset").unwrap().as_deref(), Some("dungeon"));
        assert_eq!(store.keys().unwrap(), vec!["dataset", "dataset-dungeon"]);

        store.remove("dataset").unwrap();
        assert_eq!(store.get("dataset").unwrap(), None);
        store.clear().unwrap();
        assert!(store.is_empty());
    }
}
