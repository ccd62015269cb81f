//! # bucketlist
//!
//! A library for approximate record matching (fuzzy deduplication, entity resolution).
//!
//! Given a stream of structured records, `bucketlist` stores them under blocking keys
//! and, for a query record, finds the best-scoring stored records under a weighted
//! rule set, without scanning every stored record.
//!
//! ## Features
//!
//! - **Rule-based scoring**: `must`, `either`, `sequential` gates and weighted `should` rules
//! - **Blocking**: records are partitioned by keys derived from the exact-match rules
//! - **Top-N selection**: bounded best-candidate retention with optional grouping
//! - **Pluggable storage**: in-memory, sha-256 sharded JSONL files, and a write-back cache
//!
//! ## Example
//!
//! ```rust
//! use bucketlist::{Bucket, Matcher};
//! use bucketlist::matching::similarity::exact;
//! use serde_json::json;
//!
//! let matcher = Matcher::builder()
//!     .must(["zip"])
//!     .should("name", exact)
//!     .build()
//!     .unwrap();
//!
//! let mut bucket = Bucket::in_memory(matcher);
//! let record = json!({"zip": "02134", "name": "alpha co"});
//! bucket.put(record.as_object().unwrap().clone()).unwrap();
//!
//! let found = bucket.find(record.as_object().unwrap().clone()).unwrap();
//! assert_eq!(found.len(), 1);
//! assert!((found[0].score - 1.0).abs() < f64::EPSILON);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Records and blocking keys
//! - [`matching`]: Matcher, similarity adapters and top-N selection
//! - [`bucket`]: Indexer and the bucket that ties everything together
//! - [`storage`]: Storage trait and its in-memory, on-disk and cached backends
//! - [`config`]: JSON-loadable bucket configuration

pub mod bucket;
pub mod config;
pub mod core;
pub mod matching;
pub mod storage;
pub mod utils;

// Re-export commonly used types for convenience
pub use bucket::indexer::Indexer;
pub use bucket::{Bucket, BucketError, MatchResult};
pub use config::BucketConfig;
pub use core::key::BlockKey;
pub use core::record::{Record, Value};
pub use matching::matcher::{MatchError, Matcher, MatcherBuilder};
pub use matching::scoring::Score;
pub use matching::topn::TopN;
pub use storage::cached::CachedStorage;
pub use storage::disk::DiskStorage;
pub use storage::memory::InMemoryStorage;
pub use storage::{Storage, StorageConfig, StorageError};
