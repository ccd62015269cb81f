pub use serde_json::Value;

use crate::matching::MatchError;

/// A structured record: field name -> value.
///
/// Field order is irrelevant for matching; equality is structural.
pub type Record = serde_json::Map<String, Value>;

/// Look up a field that a rule requires.
///
/// # Errors
///
/// Returns [`MatchError::MissingField`] if the record has no such field.
pub fn field<'a>(record: &'a Record, name: &str) -> Result<&'a Value, MatchError> {
    record
        .get(name)
        .ok_or_else(|| MatchError::MissingField(name.to_string()))
}

/// True for values the missing-value adapter treats as absent: `null` and `""`.
#[must_use]
pub fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Build a record from a JSON object literal, dropping non-object input.
///
/// Convenience for tests and callers that already hold a `serde_json::Value`.
#[must_use]
pub fn from_value(value: Value) -> Option<Record> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
