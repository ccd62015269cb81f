use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Blocking key: the partition a record is stored under.
///
/// Field values are held as their compact JSON text so keys can be hashed;
/// `"1"` and `1` therefore produce different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BlockKey {
    /// All `must` fields, in rule order: `(field, json value)` pairs
    Conjunctive(Vec<(String, String)>),
    /// One `either` field and its value
    Field(String, String),
    /// Caller-supplied key from a custom indexer
    Custom(String),
    /// No blocking: every record shares this partition
    Unblocked,
}

impl BlockKey {
    pub fn field(name: impl Into<String>, value: &Value) -> Self {
        Self::Field(name.into(), value.to_string())
    }

    pub fn conjunctive<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        Self::Conjunctive(
            pairs
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        )
    }

    pub fn custom(key: impl Into<String>) -> Self {
        Self::Custom(key.into())
    }

    /// Canonical string form, used for digesting keys into file paths.
    ///
    /// The form is valid JSON: `null`, a string, a `[field, value]` pair, or a
    /// list of such pairs. Distinct keys never share a canonical form.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::Unblocked => "null".to_string(),
            Self::Custom(key) => Value::String(key.clone()).to_string(),
            Self::Field(name, value) => pair(name, value),
            Self::Conjunctive(pairs) => {
                let inner: Vec<String> = pairs.iter().map(|(n, v)| pair(n, v)).collect();
                format!("[{}]", inner.join(","))
            }
        }
    }
}

fn pair(name: &str, value: &str) -> String {
    format!("[{},{value}]", Value::String(name.to_string()))
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}
