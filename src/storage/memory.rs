use std::collections::HashMap;

use crate::core::key::BlockKey;
use crate::core::record::Record;

use super::{Storage, StorageError};

/// Hash map storage. `open` and `close` are no-ops.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    data: HashMap<BlockKey, Vec<Record>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the sequence under `key` without cloning it.
    pub fn records(&self, key: &BlockKey) -> Option<&[Record]> {
        self.data.get(key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &BlockKey> {
        self.data.keys()
    }
}

impl Storage for InMemoryStorage {
    fn contains(&self, key: &BlockKey) -> bool {
        self.data.contains_key(key)
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.data.len())
    }

    fn get(&mut self, key: &BlockKey) -> Result<Option<Vec<Record>>, StorageError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &BlockKey, value: Record) -> Result<(), StorageError> {
        self.data.entry(key.clone()).or_default().push(value);
        Ok(())
    }

    fn put_all(&mut self, key: &BlockKey, values: Vec<Record>) -> Result<(), StorageError> {
        self.data.insert(key.clone(), values);
        Ok(())
    }

    fn open(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}
