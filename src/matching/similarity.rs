//! Function types for rules, plus small similarity helpers.
//!
//! Concrete string similarity (edit distance, phonetic codes, ...) is not part of
//! this crate: callers plug their own functions into [`Matcher`](super::Matcher).

use std::rc::Rc;

use serde_json::Value;

use crate::core::record::is_absent;

/// Similarity between two field values, in [0, 1]
pub type Similarity = Rc<dyn Fn(&Value, &Value) -> f64>;

/// Predicate over two field values for `sequential` rules
pub type Gate = Rc<dyn Fn(&Value, &Value) -> bool>;

/// Default penalty applied by [`missing_or_compare`]
pub const DEFAULT_MISSING_PENALTY: f64 = 0.15;

/// 1.0 when the values are equal, 0.0 otherwise.
#[must_use]
pub fn exact(a: &Value, b: &Value) -> f64 {
    if a == b {
        1.0
    } else {
        0.0
    }
}

/// Gate that passes when the values are equal.
#[must_use]
pub fn equal(a: &Value, b: &Value) -> bool {
    a == b
}

/// Gate that always passes.
#[must_use]
pub fn always(_: &Value, _: &Value) -> bool {
    true
}

/// Wrap a similarity so that absent values (`null` or `""`) score a fixed penalty
/// instead of being compared.
///
/// - both present: delegate to `similarity`
/// - both absent: `(1 - penalty)^2`
/// - one absent: `1 - penalty`
///
/// # Examples
///
/// ```
/// use bucketlist::matching::similarity::{exact, missing_or_compare};
/// use serde_json::{json, Value};
///
/// let sim = missing_or_compare(exact, 0.15);
/// assert_eq!(sim(&json!("a"), &json!("a")), 1.0);
/// assert!((sim(&json!("a"), &Value::Null) - 0.85).abs() < 1e-12);
/// ```
pub fn missing_or_compare<F>(similarity: F, penalty: f64) -> impl Fn(&Value, &Value) -> f64
where
    F: Fn(&Value, &Value) -> f64,
{
    move |a: &Value, b: &Value| match (is_absent(a), is_absent(b)) {
        (false, false) => similarity(a, b),
        (true, true) => (1.0 - penalty).powi(2),
        _ => 1.0 - penalty,
    }
}
