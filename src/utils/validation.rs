//! Centralized validation for matcher parameters and on-disk digests.

use crate::matching::MatchError;

/// Length of a hex-encoded sha-256 digest
pub const SHA256_HEX_LENGTH: usize = 64;

/// Validate a Stone-Geary floor: finite and in `[0, 1)`.
///
/// # Errors
///
/// Returns [`MatchError::InvalidConfiguration`] if the floor is out of range.
pub fn validate_stone_geary(floor: f64) -> Result<f64, MatchError> {
    if floor.is_finite() && (0.0..1.0).contains(&floor) {
        Ok(floor)
    } else {
        Err(MatchError::InvalidConfiguration(format!(
            "stone_geary must be in [0, 1), got {floor}"
        )))
    }
}

/// Validate a `should` rule weight: finite and non-negative.
///
/// # Errors
///
/// Returns [`MatchError::InvalidConfiguration`] naming the offending field.
pub fn validate_weight(field: &str, weight: f64) -> Result<f64, MatchError> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(weight)
    } else {
        Err(MatchError::InvalidConfiguration(format!(
            "weight for '{field}' must be a non-negative number, got {weight}"
        )))
    }
}

/// Validate a missing-value penalty: finite and in `[0, 1]`.
///
/// # Errors
///
/// Returns [`MatchError::InvalidConfiguration`] naming the offending field.
pub fn validate_penalty(field: &str, penalty: f64) -> Result<f64, MatchError> {
    if penalty.is_finite() && (0.0..=1.0).contains(&penalty) {
        Ok(penalty)
    } else {
        Err(MatchError::InvalidConfiguration(format!(
            "missing_penalty for '{field}' must be in [0, 1], got {penalty}"
        )))
    }
}

/// Check that a string is a lowercase hex sha-256 digest (64 characters).
///
/// # Examples
///
/// ```
/// use bucketlist::utils::validation::is_valid_sha256;
///
/// assert!(is_valid_sha256(&"ab".repeat(32)));
/// assert!(!is_valid_sha256("not-a-digest"));
/// ```
#[must_use]
pub fn is_valid_sha256(s: &str) -> bool {
    s.len() == SHA256_HEX_LENGTH && s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}
