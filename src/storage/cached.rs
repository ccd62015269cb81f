use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, trace};

use crate::core::key::BlockKey;
use crate::core::record::Record;

use super::{Storage, StorageError};

/// Default number of keys held in memory
pub const DEFAULT_CACHE_CAPACITY: usize = 100_000;

/// Bounded write-back cache over another storage.
///
/// Writes only touch the cache and mark the key dirty; dirty keys reach the
/// inner storage (via `put_all`) when they are evicted or on [`close`](Storage::close).
/// Dropping a `CachedStorage` without closing it loses unflushed writes.
///
/// Eviction is first-in first-out by insertion into the cache. Reads do not
/// refresh a key's position. The oldest key is evicted *before* a new key is
/// installed, so at most `capacity` keys are ever resident (evicting only once
/// the cache holds more than `capacity` would keep one extra key).
///
/// A dirty key leaves the cache only after its sequence has been written to
/// the inner storage. If that write fails the key stays cached and dirty, the
/// triggering `get`/`put` returns the error, and the incoming key is not
/// installed.
#[derive(Debug)]
pub struct CachedStorage<S: Storage> {
    inner: S,
    capacity: usize,
    cache: HashMap<BlockKey, Vec<Record>>,
    order: VecDeque<BlockKey>,
    dirty: HashSet<BlockKey>,
}

impl<S: Storage> CachedStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            capacity: DEFAULT_CACHE_CAPACITY,
            cache: HashMap::new(),
            order: VecDeque::new(),
            dirty: HashSet::new(),
        }
    }

    /// Set the number of keys held in memory (at least 1).
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of keys currently cached
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Number of keys written since they were last flushed
    pub fn dirty_len(&self) -> usize {
        self.dirty.len()
    }

    pub fn is_cached(&self, key: &BlockKey) -> bool {
        self.cache.contains_key(key)
    }

    pub fn is_dirty(&self, key: &BlockKey) -> bool {
        self.dirty.contains(key)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Flush every dirty key to the inner storage without closing it.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        let mut dirty: Vec<BlockKey> = self.dirty.iter().cloned().collect();
        dirty.sort();
        debug!(keys = dirty.len(), "flushing dirty keys");
        for key in dirty {
            if let Some(values) = self.cache.get(&key) {
                self.inner.put_all(&key, values.clone())?;
            }
            self.dirty.remove(&key);
        }
        Ok(())
    }

    /// Install a new key, evicting the oldest cached key first if full.
    fn insert(&mut self, key: &BlockKey, values: Vec<Record>) -> Result<(), StorageError> {
        while self.cache.len() >= self.capacity {
            if !self.evict_oldest()? {
                break;
            }
        }
        self.order.push_back(key.clone());
        self.cache.insert(key.clone(), values);
        Ok(())
    }

    fn evict_oldest(&mut self) -> Result<bool, StorageError> {
        let Some(oldest) = self.order.front().cloned() else {
            return Ok(false);
        };
        if self.dirty.contains(&oldest) {
            if let Some(values) = self.cache.get(&oldest) {
                trace!(key = %oldest, "flushing evicted dirty key");
                self.inner.put_all(&oldest, values.clone())?;
            }
            self.dirty.remove(&oldest);
        } else {
            trace!(key = %oldest, "evicting clean key");
        }
        self.order.pop_front();
        self.cache.remove(&oldest);
        Ok(true)
    }
}

impl<S: Storage> Storage for CachedStorage<S> {
    fn contains(&self, key: &BlockKey) -> bool {
        self.cache.contains_key(key) || self.inner.contains(key)
    }

    /// Distinct keys across the cache and the inner storage.
    fn len(&self) -> Result<usize, StorageError> {
        let cache_only = self
            .cache
            .keys()
            .filter(|key| !self.inner.contains(key))
            .count();
        Ok(self.inner.len()? + cache_only)
    }

    fn get(&mut self, key: &BlockKey) -> Result<Option<Vec<Record>>, StorageError> {
        if let Some(values) = self.cache.get(key) {
            return Ok(Some(values.clone()));
        }

        let values = self.inner.get(key)?;
        if let Some(values) = &values {
            self.insert(key, values.clone())?;
        }
        Ok(values)
    }

    fn put(&mut self, key: &BlockKey, value: Record) -> Result<(), StorageError> {
        if let Some(values) = self.cache.get_mut(key) {
            values.push(value);
        } else {
            let mut values = self.inner.get(key)?.unwrap_or_default();
            values.push(value);
            self.insert(key, values)?;
        }
        self.dirty.insert(key.clone());
        Ok(())
    }

    fn put_all(&mut self, key: &BlockKey, values: Vec<Record>) -> Result<(), StorageError> {
        if let Some(cached) = self.cache.get_mut(key) {
            *cached = values;
        } else {
            self.insert(key, values)?;
        }
        self.dirty.insert(key.clone());
        Ok(())
    }

    fn open(&mut self) -> Result<(), StorageError> {
        self.inner.open()
    }

    fn close(&mut self) -> Result<(), StorageError> {
        self.flush()?;
        self.inner.close()
    }
}
