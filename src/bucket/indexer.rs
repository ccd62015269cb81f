use std::fmt;

use crate::core::key::BlockKey;
use crate::core::record::{field, Record};
use crate::matching::{MatchError, Matcher};

/// Caller-supplied key function
pub type KeyFn = Box<dyn Fn(&Record) -> Result<Vec<BlockKey>, MatchError>>;

/// Maps a record to the blocking keys it is stored and looked up under.
pub enum Indexer {
    /// One key built from all listed fields
    Conjunctive(Vec<String>),
    /// One key per listed field
    PerField(Vec<String>),
    /// A single shared partition
    Unblocked,
    Custom(KeyFn),
}

impl Indexer {
    /// Default indexer for a matcher's exact-match rules.
    ///
    /// - `must` non-empty: one conjunctive key over all `must` fields
    /// - else `either` non-empty: one key per `either` field
    /// - else: no blocking
    pub fn derive(matcher: &Matcher) -> Self {
        if !matcher.must().is_empty() {
            Self::Conjunctive(matcher.must().to_vec())
        } else if !matcher.either().is_empty() {
            Self::PerField(matcher.either().to_vec())
        } else {
            Self::Unblocked
        }
    }

    /// Custom indexer from an infallible key function.
    pub fn custom<F>(keys: F) -> Self
    where
        F: Fn(&Record) -> Vec<BlockKey> + 'static,
    {
        Self::Custom(Box::new(move |record: &Record| Ok(keys(record))))
    }

    /// Custom indexer whose key function can report missing fields.
    pub fn try_custom<F>(keys: F) -> Self
    where
        F: Fn(&Record) -> Result<Vec<BlockKey>, MatchError> + 'static,
    {
        Self::Custom(Box::new(keys))
    }

    /// Blocking keys for `record`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::MissingField`] if an indexed field is absent.
    pub fn keys(&self, record: &Record) -> Result<Vec<BlockKey>, MatchError> {
        match self {
            Self::Conjunctive(fields) => {
                let mut pairs = Vec::with_capacity(fields.len());
                for name in fields {
                    pairs.push((name.as_str(), field(record, name)?));
                }
                Ok(vec![BlockKey::conjunctive(pairs)])
            }
            Self::PerField(fields) => fields
                .iter()
                .map(|name| field(record, name).map(|value| BlockKey::field(name.as_str(), value)))
                .collect(),
            Self::Unblocked => Ok(vec![BlockKey::Unblocked]),
            Self::Custom(keys) => keys(record),
        }
    }
}

impl fmt::Debug for Indexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conjunctive(fields) => f.debug_tuple("Conjunctive").field(fields).finish(),
            Self::PerField(fields) => f.debug_tuple("PerField").field(fields).finish(),
            Self::Unblocked => write!(f, "Unblocked"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}
