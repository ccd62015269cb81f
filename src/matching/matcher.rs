use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;
use tracing::trace;

use crate::core::record::{field, Record};
use crate::matching::scoring::{component_label, stone_geary_factor, Score, DEFAULT_STONE_GEARY};
use crate::matching::similarity::{Gate, Similarity};
use crate::utils::validation::{validate_stone_geary, validate_weight};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("Invalid matcher configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Field '{0}' is missing from a compared record")]
    MissingField(String),
}

#[derive(Clone)]
struct SequentialRule {
    field: String,
    gate: Gate,
}

#[derive(Clone)]
struct ShouldRule {
    field: String,
    similarity: Similarity,
    weight: f64,
}

/// Weighted similarity rule set over pairs of records.
///
/// A `Matcher` is immutable once built; clone it to share between buckets.
#[derive(Clone)]
pub struct Matcher {
    must: Vec<String>,
    either: Vec<String>,
    sequential: Vec<SequentialRule>,
    should: Vec<ShouldRule>,
    stone_geary: f64,
}

impl Matcher {
    /// Start building a rule set. All rule lists start empty.
    #[must_use]
    pub fn builder() -> MatcherBuilder {
        MatcherBuilder::new()
    }

    /// Fields that must match exactly
    pub fn must(&self) -> &[String] {
        &self.must
    }

    /// Fields of which at least one must match exactly
    pub fn either(&self) -> &[String] {
        &self.either
    }

    pub fn stone_geary(&self) -> f64 {
        self.stone_geary
    }

    /// Score record `a` against record `b`.
    ///
    /// Returns [`Score::zero`] as soon as a `must`, `either` or `sequential`
    /// rule fails; `should` similarities are only computed once every gate passes.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::MissingField`] if an evaluated rule references a field
    /// that is absent from either record.
    pub fn score(&self, a: &Record, b: &Record) -> Result<Score, MatchError> {
        for name in &self.must {
            if field(a, name)? != field(b, name)? {
                trace!(field = %name, "must rule failed");
                return Ok(Score::zero());
            }
        }

        if !self.either.is_empty() && !self.any_either_matches(a, b)? {
            trace!("no either field matched");
            return Ok(Score::zero());
        }

        for rule in &self.sequential {
            if !(rule.gate)(field(a, &rule.field)?, field(b, &rule.field)?) {
                trace!(field = %rule.field, "sequential gate failed");
                return Ok(Score::zero());
            }
        }

        let mut score = Score {
            value: 1.0,
            ..Score::default()
        };
        for (position, rule) in self.should.iter().enumerate() {
            let sim = (rule.similarity)(field(a, &rule.field)?, field(b, &rule.field)?);
            score.value *= stone_geary_factor(self.stone_geary, sim, rule.weight);
            score
                .components
                .insert(component_label(&rule.field, position), sim);
        }

        Ok(score)
    }

    // Stops at the first matching field, so later fields need not exist.
    fn any_either_matches(&self, a: &Record, b: &Record) -> Result<bool, MatchError> {
        for name in &self.either {
            if field(a, name)? == field(b, name)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sequential: Vec<&str> = self.sequential.iter().map(|r| r.field.as_str()).collect();
        let should: Vec<(&str, f64)> = self
            .should
            .iter()
            .map(|r| (r.field.as_str(), r.weight))
            .collect();
        f.debug_struct("Matcher")
            .field("must", &self.must)
            .field("either", &self.either)
            .field("sequential", &sequential)
            .field("should", &should)
            .field("stone_geary", &self.stone_geary)
            .finish()
    }
}

/// Builder for [`Matcher`]
pub struct MatcherBuilder {
    must: Vec<String>,
    either: Vec<String>,
    sequential: Vec<SequentialRule>,
    should: Vec<ShouldRule>,
    stone_geary: f64,
}

impl MatcherBuilder {
    pub fn new() -> Self {
        Self {
            must: Vec::new(),
            either: Vec::new(),
            sequential: Vec::new(),
            should: Vec::new(),
            stone_geary: DEFAULT_STONE_GEARY,
        }
    }

    #[must_use]
    pub fn must<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.must.extend(fields.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn either<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.either.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Append a gate; gates run in the order they are added.
    #[must_use]
    pub fn sequential<F>(self, field: impl Into<String>, gate: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + 'static,
    {
        self.sequential_shared(field, Rc::new(gate))
    }

    #[must_use]
    pub fn sequential_shared(mut self, field: impl Into<String>, gate: Gate) -> Self {
        self.sequential.push(SequentialRule {
            field: field.into(),
            gate,
        });
        self
    }

    /// Append a `should` rule with weight 1.0.
    #[must_use]
    pub fn should<F>(self, field: impl Into<String>, similarity: F) -> Self
    where
        F: Fn(&Value, &Value) -> f64 + 'static,
    {
        self.should_weighted(field, similarity, 1.0)
    }

    #[must_use]
    pub fn should_weighted<F>(self, field: impl Into<String>, similarity: F, weight: f64) -> Self
    where
        F: Fn(&Value, &Value) -> f64 + 'static,
    {
        self.should_shared(field, Rc::new(similarity), weight)
    }

    #[must_use]
    pub fn should_shared(
        mut self,
        field: impl Into<String>,
        similarity: Similarity,
        weight: f64,
    ) -> Self {
        self.should.push(ShouldRule {
            field: field.into(),
            similarity,
            weight,
        });
        self
    }

    #[must_use]
    pub fn stone_geary(mut self, floor: f64) -> Self {
        self.stone_geary = floor;
        self
    }

    /// Validate and freeze the rule set.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::InvalidConfiguration`] if `stone_geary` is outside
    /// `[0, 1)` or any weight is negative or not finite.
    pub fn build(self) -> Result<Matcher, MatchError> {
        let stone_geary = validate_stone_geary(self.stone_geary)?;
        for rule in &self.should {
            validate_weight(&rule.field, rule.weight)?;
        }

        Ok(Matcher {
            must: self.must,
            either: self.either,
            sequential: self.sequential,
            should: self.should,
            stone_geary,
        })
    }
}

impl Default for MatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
