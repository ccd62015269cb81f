use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::matching::matcher::{MatchError, Matcher};
use crate::matching::registry::FunctionRegistry;
use crate::matching::scoring::DEFAULT_STONE_GEARY;
use crate::matching::similarity::missing_or_compare;
use crate::utils::validation::validate_penalty;

/// A `sequential` rule: field plus the registered name of its gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequentialConfig {
    pub field: String,
    pub gate: String,
}

/// A `should` rule: field, registered similarity name and weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShouldConfig {
    pub field: String,
    pub similarity: String,

    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Wrap the similarity with the missing-value adapter using this penalty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_penalty: Option<f64>,
}

fn default_weight() -> f64 {
    1.0
}

fn default_stone_geary() -> f64 {
    DEFAULT_STONE_GEARY
}

/// Declarative matcher rule set.
///
/// ```json
/// {
///   "must": ["zip"],
///   "sequential": [{"field": "country", "gate": "equal"}],
///   "should": [{"field": "name", "similarity": "exact", "weight": 2.0}],
///   "stone_geary": 0.25
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    #[serde(default)]
    pub must: Vec<String>,

    #[serde(default)]
    pub either: Vec<String>,

    #[serde(default)]
    pub sequential: Vec<SequentialConfig>,

    #[serde(default)]
    pub should: Vec<ShouldConfig>,

    #[serde(default = "default_stone_geary")]
    pub stone_geary: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            must: Vec::new(),
            either: Vec::new(),
            sequential: Vec::new(),
            should: Vec::new(),
            stone_geary: DEFAULT_STONE_GEARY,
        }
    }
}

impl MatcherConfig {
    /// Resolve function names against `registry` and build the matcher.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::InvalidConfiguration`] if a gate or similarity name
    /// is not registered, or if any numeric parameter is out of range.
    pub fn build(&self, registry: &FunctionRegistry) -> Result<Matcher, MatchError> {
        let mut builder = Matcher::builder()
            .must(self.must.iter().cloned())
            .either(self.either.iter().cloned())
            .stone_geary(self.stone_geary);

        for rule in &self.sequential {
            let gate = registry.gate(&rule.gate).ok_or_else(|| {
                MatchError::InvalidConfiguration(format!(
                    "sequential rule for '{}' names unknown gate '{}'",
                    rule.field, rule.gate
                ))
            })?;
            builder = builder.sequential_shared(rule.field.clone(), gate);
        }

        for rule in &self.should {
            let similarity = registry.similarity(&rule.similarity).ok_or_else(|| {
                MatchError::InvalidConfiguration(format!(
                    "should rule for '{}' names unknown similarity '{}'",
                    rule.field, rule.similarity
                ))
            })?;
            builder = match rule.missing_penalty {
                Some(penalty) => {
                    let penalty = validate_penalty(&rule.field, penalty)?;
                    let wrapped = missing_or_compare(
                        move |a: &Value, b: &Value| similarity(a, b),
                        penalty,
                    );
                    builder.should_shared(rule.field.clone(), Rc::new(wrapped), rule.weight)
                }
                None => builder.should_shared(rule.field.clone(), similarity, rule.weight),
            };
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::from_value;
    use serde_json::json;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: MatcherConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MatcherConfig::default());
        assert!((config.stone_geary - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_build_resolves_functions() {
        let config: MatcherConfig = serde_json::from_value(json!({
            "must": ["zip"],
            "sequential": [{"field": "country", "gate": "equal"}],
            "should": [{"field": "name", "similarity": "exact"}],
            "stone_geary": 0.0
        }))
        .unwrap();
        assert!((config.should[0].weight - 1.0).abs() < f64::EPSILON);

        let matcher = config.build(&FunctionRegistry::with_defaults()).unwrap();
        let a = from_value(json!({"zip": "1", "country": "us", "name": "x"})).unwrap();
        let b = from_value(json!({"zip": "1", "country": "us", "name": "y"})).unwrap();
        assert!((matcher.score(&a, &a).unwrap().value - 1.0).abs() < f64::EPSILON);
        assert!(matcher.score(&a, &b).unwrap().is_zero());
    }

    #[test]
    fn test_unknown_gate_is_invalid_configuration() {
        let config: MatcherConfig = serde_json::from_value(json!({
            "sequential": [{"field": "column_a", "gate": "not_a_function"}]
        }))
        .unwrap();
        let err = config.build(&FunctionRegistry::with_defaults()).unwrap_err();
        match err {
            MatchError::InvalidConfiguration(msg) => assert!(msg.contains("not_a_function")),
            other => panic!("expected invalid configuration, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_similarity_is_invalid_configuration() {
        let config: MatcherConfig = serde_json::from_value(json!({
            "should": [{"field": "name", "similarity": "jaro"}]
        }))
        .unwrap();
        assert!(matches!(
            config.build(&FunctionRegistry::with_defaults()),
            Err(MatchError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_missing_penalty_wraps_similarity() {
        let config: MatcherConfig = serde_json::from_value(json!({
            "should": [{"field": "zip", "similarity": "exact", "missing_penalty": 0.2}],
            "stone_geary": 0.0
        }))
        .unwrap();
        let matcher = config.build(&FunctionRegistry::with_defaults()).unwrap();
        let a = from_value(json!({"zip": "02134"})).unwrap();
        let b = from_value(json!({"zip": null})).unwrap();
        assert!((matcher.score(&a, &b).unwrap().value - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_missing_penalty_rejected() {
        let config: MatcherConfig = serde_json::from_value(json!({
            "should": [{"field": "zip", "similarity": "exact", "missing_penalty": 2.0}]
        }))
        .unwrap();
        assert!(config.build(&FunctionRegistry::with_defaults()).is_err());
    }
}
