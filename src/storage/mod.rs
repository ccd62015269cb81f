//! Storage backends for indexed records.
//!
//! A [`Storage`] maps each [`BlockKey`] to the append-ordered sequence of records
//! stored under it. Three backends are provided:
//!
//! - [`InMemoryStorage`]: a hash map, lost when dropped
//! - [`DiskStorage`]: one JSONL file per key, sharded by sha-256 digest
//! - [`CachedStorage`]: a bounded write-back cache over any other backend
//!
//! ## On-disk layout
//!
//! ```text
//! <root>/<digest[0..2]>/<digest[2..4]>/<digest>.jsonl
//! ```
//!
//! Each file holds the complete sequence for one key, one JSON record per line,
//! and is rewritten wholesale on every write.
//!
//! ## Concurrency
//!
//! Backends perform no locking. Two processes sharing a root directory race on
//! the same file for the same key, and the read-modify-write `put` can lose
//! updates in that case.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::key::BlockKey;
use crate::core::record::Record;

pub mod cached;
pub mod disk;
pub mod memory;

pub use cached::CachedStorage;
pub use disk::DiskStorage;
pub use memory::InMemoryStorage;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to parse record at {path}:{line}: {source}")]
    Deserialization {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Failed to replace {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Key -> append-only record sequence.
///
/// All backends are interchangeable behind a [`Bucket`](crate::Bucket).
pub trait Storage {
    /// Whether any record is stored under `key`
    fn contains(&self, key: &BlockKey) -> bool;

    /// Number of distinct keys
    fn len(&self) -> Result<usize, StorageError>;

    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    /// The full sequence stored under `key`, or `None` if the key is unknown.
    fn get(&mut self, key: &BlockKey) -> Result<Option<Vec<Record>>, StorageError>;

    /// Append one record to the sequence under `key`.
    fn put(&mut self, key: &BlockKey, value: Record) -> Result<(), StorageError>;

    /// Replace the whole sequence under `key`.
    fn put_all(&mut self, key: &BlockKey, values: Vec<Record>) -> Result<(), StorageError>;

    /// Acquire resources. Called once per bucket session.
    fn open(&mut self) -> Result<(), StorageError>;

    /// Flush and release resources.
    fn close(&mut self) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn contains(&self, key: &BlockKey) -> bool {
        (**self).contains(key)
    }

    fn len(&self) -> Result<usize, StorageError> {
        (**self).len()
    }

    fn get(&mut self, key: &BlockKey) -> Result<Option<Vec<Record>>, StorageError> {
        (**self).get(key)
    }

    fn put(&mut self, key: &BlockKey, value: Record) -> Result<(), StorageError> {
        (**self).put(key, value)
    }

    fn put_all(&mut self, key: &BlockKey, values: Vec<Record>) -> Result<(), StorageError> {
        (**self).put_all(key, values)
    }

    fn open(&mut self) -> Result<(), StorageError> {
        (**self).open()
    }

    fn close(&mut self) -> Result<(), StorageError> {
        (**self).close()
    }
}

/// Configuration for selecting and building a backend.
///
/// # Example
/// ```
/// use bucketlist::StorageConfig;
///
/// // In-memory (for testing)
/// let config = StorageConfig::in_memory();
///
/// // Cached JSONL files
/// let config = StorageConfig::cached(100_000, StorageConfig::disk("/data/bucket"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Hash map storage, nothing persisted
    #[default]
    InMemory,
    /// Sharded JSONL files under `root`
    Disk {
        root: PathBuf,
        #[serde(default = "default_extension")]
        extension: String,
    },
    /// Write-back cache of `capacity` keys over `inner`
    Cached {
        #[serde(default = "default_cache_capacity")]
        capacity: usize,
        inner: Box<StorageConfig>,
    },
}

fn default_extension() -> String {
    disk::DEFAULT_EXTENSION.to_string()
}

fn default_cache_capacity() -> usize {
    cached::DEFAULT_CACHE_CAPACITY
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn disk(root: impl Into<PathBuf>) -> Self {
        Self::Disk {
            root: root.into(),
            extension: default_extension(),
        }
    }

    pub fn cached(capacity: usize, inner: StorageConfig) -> Self {
        Self::Cached {
            capacity,
            inner: Box::new(inner),
        }
    }

    /// Build the backend described by this configuration.
    ///
    /// Nothing touches the filesystem until the storage is opened or written.
    pub fn build(&self) -> Box<dyn Storage> {
        match self {
            Self::InMemory => Box::new(InMemoryStorage::new()),
            Self::Disk { root, extension } => {
                Box::new(DiskStorage::new(root).with_extension(extension.clone()))
            }
            Self::Cached { capacity, inner } => {
                Box::new(CachedStorage::new(inner.build()).with_capacity(*capacity))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_from_json() {
        let config: StorageConfig = serde_json::from_value(json!({
            "type": "cached",
            "capacity": 10,
            "inner": {"type": "disk", "root": "/tmp/bucket"}
        }))
        .unwrap();
        assert_eq!(config, StorageConfig::cached(10, StorageConfig::disk("/tmp/bucket")));
    }

    #[test]
    fn test_default_is_in_memory() {
        assert_eq!(StorageConfig::default(), StorageConfig::InMemory);
        let config: StorageConfig = serde_json::from_value(json!({"type": "in_memory"})).unwrap();
        assert_eq!(config, StorageConfig::InMemory);
    }

    #[test]
    fn test_build_boxed_storage() {
        let mut storage = StorageConfig::in_memory().build();
        let key = BlockKey::custom("a");
        storage.put(&key, Record::new()).unwrap();
        assert!(storage.contains(&key));
        assert_eq!(storage.len().unwrap(), 1);
        assert!(!storage.is_empty().unwrap());
    }
}
