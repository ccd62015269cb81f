//! Blocking index plus matcher: the entry point for storing and finding records.
//!
//! A [`Bucket`] owns one [`Storage`] and one [`TopN`]. On `put` a record is run
//! through the analyzer, keyed by the [`Indexer`], and appended under every key.
//! On `find` the query is analyzed and keyed the same way, the stored sequence
//! for each key is scored with the [`Matcher`], and the best candidates are kept.
//!
//! ## Early exit
//!
//! Once any candidate scores above [`PERFECT_SCORE`], scanning stops: the rest of
//! the current key's sequence and all remaining keys are skipped. A perfect hit
//! therefore usually comes back alone, even when `capacity` is larger.
//!
//! ## Example
//!
//! ```rust
//! use bucketlist::{Bucket, Matcher, Record};
//! use serde_json::{json, Value};
//!
//! let matcher = Matcher::builder()
//!     .either(["zip", "prefix"])
//!     .should("name", |a: &Value, b: &Value| if a == b { 1.0 } else { 0.0 })
//!     .build()
//!     .unwrap();
//!
//! let mut bucket = Bucket::in_memory(matcher).with_analyzer(|mut record: Record| {
//!     let prefix: String = record["name"].as_str().unwrap_or_default().chars().take(2).collect();
//!     record.insert("prefix".to_string(), Value::String(prefix.to_uppercase()));
//!     record
//! });
//!
//! let alpha = json!({"zip": "02134", "name": "alpha co"});
//! bucket.put(alpha.as_object().unwrap().clone()).unwrap();
//!
//! let query = json!({"zip": "08540", "name": "alpha co"});
//! let found = bucket.find(query.as_object().unwrap().clone()).unwrap();
//! assert_eq!(found.len(), 1);
//! ```

use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::core::record::Record;
use crate::matching::scoring::PERFECT_SCORE;
use crate::matching::{MatchError, Matcher, TopN};
use crate::storage::{InMemoryStorage, Storage, StorageError};

pub mod indexer;

use indexer::Indexer;

/// Default number of candidates returned by [`Bucket::find`]
pub const DEFAULT_CAPACITY: usize = 3;

/// Normalization step applied to every record before indexing and matching
pub type Analyzer = Box<dyn Fn(Record) -> Record>;

type GroupFn = Rc<dyn Fn(&Record) -> String>;

#[derive(Error, Debug)]
pub enum BucketError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A stored record returned by [`Bucket::find`] with its aggregate score
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub record: Record,
    pub score: f64,
}

/// Storage, indexer and matcher wired together.
pub struct Bucket<S: Storage = InMemoryStorage> {
    matcher: Matcher,
    analyzer: Analyzer,
    indexer: Indexer,
    storage: S,
    capacity: usize,
    group_by: Option<GroupFn>,
    topn: TopN<Record>,
}

impl Bucket<InMemoryStorage> {
    /// Bucket over a fresh in-memory storage
    pub fn in_memory(matcher: Matcher) -> Self {
        Self::new(matcher, InMemoryStorage::new())
    }
}

impl<S: Storage> Bucket<S> {
    /// Create a bucket with the identity analyzer, the indexer derived from
    /// `matcher`, and capacity [`DEFAULT_CAPACITY`].
    pub fn new(matcher: Matcher, storage: S) -> Self {
        let indexer = Indexer::derive(&matcher);
        Self {
            matcher,
            analyzer: Box::new(|record| record),
            indexer,
            storage,
            capacity: DEFAULT_CAPACITY,
            group_by: None,
            topn: TopN::new(DEFAULT_CAPACITY),
        }
    }

    #[must_use]
    pub fn with_analyzer<F>(mut self, analyzer: F) -> Self
    where
        F: Fn(Record) -> Record + 'static,
    {
        self.analyzer = Box::new(analyzer);
        self
    }

    /// Replace the derived indexer.
    #[must_use]
    pub fn with_indexer(mut self, indexer: Indexer) -> Self {
        self.indexer = indexer;
        self
    }

    /// Maximum number of candidates returned by [`find`](Self::find).
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self.rebuild_topn();
        self
    }

    /// Keep at most one candidate per `group_by(record)`.
    #[must_use]
    pub fn with_group_by<F>(mut self, group_by: F) -> Self
    where
        F: Fn(&Record) -> String + 'static,
    {
        self.group_by = Some(Rc::new(group_by));
        self.rebuild_topn();
        self
    }

    fn rebuild_topn(&mut self) {
        self.topn = match &self.group_by {
            Some(group_by) => {
                let group_by = Rc::clone(group_by);
                TopN::with_group_by(self.capacity, move |record: &Record| group_by(record))
            }
            None => TopN::new(self.capacity),
        };
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of distinct blocking keys in storage
    pub fn len(&self) -> Result<usize, BucketError> {
        Ok(self.storage.len()?)
    }

    pub fn is_empty(&self) -> Result<bool, BucketError> {
        Ok(self.storage.is_empty()?)
    }

    /// Analyze `record` and append it under each of its blocking keys.
    ///
    /// Records are never deduplicated on write.
    ///
    /// # Errors
    ///
    /// Returns [`BucketError::Match`] if an indexed field is missing, or
    /// [`BucketError::Storage`] if the backend fails.
    pub fn put(&mut self, record: Record) -> Result<(), BucketError> {
        let analyzed = (self.analyzer)(record);
        let keys = self.indexer.keys(&analyzed)?;
        debug!(keys = keys.len(), "storing record");
        for key in &keys {
            self.storage.put(key, analyzed.clone())?;
        }
        Ok(())
    }

    /// Best stored matches for `record`, in no particular order.
    ///
    /// Only candidates with a positive score are returned.
    ///
    /// # Errors
    ///
    /// Returns [`BucketError::Match`] if a rule references a missing field on the
    /// query or a stored record, or [`BucketError::Storage`] if a key's stored
    /// sequence cannot be read.
    pub fn find(&mut self, record: Record) -> Result<Vec<MatchResult>, BucketError> {
        let query = (self.analyzer)(record);
        let keys = self.indexer.keys(&query)?;
        self.topn.clear();

        let mut best = 0.0_f64;
        let mut scanned = 0usize;
        'keys: for key in &keys {
            let Some(candidates) = self.storage.get(key)? else {
                trace!(key = %key, "no records under key");
                continue;
            };
            for candidate in candidates {
                scanned += 1;
                let score = self.matcher.score(&candidate, &query)?;
                if !score.is_zero() {
                    best = best.max(score.value);
                    self.topn.put(candidate, score.value);
                }
                if best > PERFECT_SCORE {
                    trace!(key = %key, "perfect match, stopping scan");
                    break 'keys;
                }
            }
        }

        debug!(
            keys = keys.len(),
            scanned,
            found = self.topn.len(),
            best,
            "find complete"
        );
        Ok(self
            .topn
            .get()
            .into_iter()
            .map(|(record, score)| MatchResult { record, score })
            .collect())
    }

    /// Flush and release the storage.
    pub fn save(&mut self) -> Result<(), BucketError> {
        Ok(self.storage.close()?)
    }

    /// Acquire the storage.
    pub fn load(&mut self) -> Result<(), BucketError> {
        Ok(self.storage.open()?)
    }
}

impl<S: Storage> std::fmt::Debug for Bucket<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("matcher", &self.matcher)
            .field("indexer", &self.indexer)
            .field("capacity", &self.capacity)
            .field("grouped", &self.group_by.is_some())
            .finish_non_exhaustive()
    }
}
