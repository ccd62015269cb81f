use std::collections::BTreeMap;

use serde::Serialize;

/// Scores above this are treated as a perfect match.
pub const PERFECT_SCORE: f64 = 0.9999;

/// Default Stone-Geary floor for `should` rules
pub const DEFAULT_STONE_GEARY: f64 = 0.25;

/// Result of scoring one record against another
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Score {
    /// Aggregate score in [0, 1]
    pub value: f64,

    /// Raw similarity of each `should` rule, keyed by `"{field}{position}"`
    pub components: BTreeMap<String, f64>,
}

impl Score {
    /// The score returned when any gate fails: `0.0` with no components.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value <= 0.0
    }

    #[must_use]
    pub fn is_perfect(&self) -> bool {
        self.value > PERFECT_SCORE
    }
}

/// Label for the `should` rule at `position`.
///
/// The position keeps labels unique when the same field appears in several rules.
#[must_use]
pub fn component_label(field: &str, position: usize) -> String {
    format!("{field}{position}")
}

/// Multiplicative contribution of a single `should` rule.
///
/// `(floor + (1 - floor) * similarity) ^ weight`
#[inline]
#[must_use]
pub fn stone_geary_factor(floor: f64, similarity: f64, weight: f64) -> f64 {
    (floor + (1.0 - floor) * similarity).powf(weight)
}
