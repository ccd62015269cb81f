//! JSON-loadable bucket configuration.
//!
//! ```json
//! {
//!   "capacity": 5,
//!   "group_by": "customer_id",
//!   "storage": {"type": "cached", "capacity": 10000, "inner": {"type": "disk", "root": "data"}},
//!   "matcher": {
//!     "must": ["zip"],
//!     "should": [{"field": "name", "similarity": "exact", "weight": 2.0}]
//!   }
//! }
//! ```
//!
//! Function names in the matcher section are resolved against a
//! [`FunctionRegistry`] when the bucket is built.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bucket::{Bucket, DEFAULT_CAPACITY};
use crate::core::record::Record;
use crate::matching::{FunctionRegistry, MatchError, MatcherConfig};
use crate::storage::{Storage, StorageConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error(transparent)]
    Match(#[from] MatchError),
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

/// Everything needed to build a [`Bucket`] except the function implementations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Maximum number of candidates returned by `find`
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Field whose value groups candidates; at most one result per group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub matcher: MatcherConfig,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            group_by: None,
            storage: StorageConfig::default(),
            matcher: MatcherConfig::default(),
        }
    }
}

impl BucketConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build a bucket over the configured storage backend.
    ///
    /// The analyzer is the identity; add one with [`Bucket::with_analyzer`].
    /// Records missing the `group_by` field are grouped under `null`.
    pub fn build(
        &self,
        registry: &FunctionRegistry,
    ) -> Result<Bucket<Box<dyn Storage>>, ConfigError> {
        let matcher = self.matcher.build(registry)?;
        let mut bucket = Bucket::new(matcher, self.storage.build()).with_capacity(self.capacity);
        if let Some(field) = self.group_by.clone() {
            bucket = bucket.with_group_by(move |record: &Record| {
                record
                    .get(&field)
                    .map_or_else(|| "null".to_string(), ToString::to_string)
            });
        }
        Ok(bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::from_value;
    use serde_json::json;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = BucketConfig::from_json("{}").unwrap();
        assert_eq!(config, BucketConfig::default());
        assert_eq!(config.capacity, 3);
        assert_eq!(config.storage, StorageConfig::InMemory);
    }

    #[test]
    fn test_to_json_round_trip() {
        let config = BucketConfig {
            capacity: 7,
            group_by: Some("id".to_string()),
            ..BucketConfig::default()
        };
        let parsed = BucketConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            BucketConfig::from_json("{not json"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            BucketConfig::load_from_file(&dir.path().join("missing.json")),
            Err(ConfigError::ReadError(_))
        ));
    }

    #[test]
    fn test_build_bucket_from_config() {
        let config = BucketConfig::from_json(
            r#"{
                "capacity": 2,
                "group_by": "letter",
                "matcher": {
                    "should": [{"field": "name", "similarity": "exact"}]
                }
            }"#,
        )
        .unwrap();
        let mut bucket = config.build(&FunctionRegistry::with_defaults()).unwrap();
        assert_eq!(bucket.capacity(), 2);

        for name in ["alpha", "apple", "beta", "gamma"] {
            let letter = &name[..1];
            bucket
                .put(from_value(json!({"name": name, "letter": letter})).unwrap())
                .unwrap();
        }
        let found = bucket
            .find(from_value(json!({"name": "zeta", "letter": "z"})).unwrap())
            .unwrap();
        // Three groups tie at the floor score; capacity keeps two
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_build_rejects_unknown_function() {
        let config = BucketConfig::from_json(
            r#"{"matcher": {"sequential": [{"field": "a", "gate": "nope"}]}}"#,
        )
        .unwrap();
        assert!(matches!(
            config.build(&FunctionRegistry::with_defaults()),
            Err(ConfigError::Match(MatchError::InvalidConfiguration(_)))
        ));
    }
}
