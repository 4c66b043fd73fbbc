//! Boundary argument checks shared by the crypto and archive crates.

use crate::error::{AegisError, AegisResult};

/// Fail with `InvalidArgument` when `bytes` is empty.
pub fn require_non_empty(name: &str, bytes: &[u8]) -> AegisResult<()> {
    if bytes.is_empty() {
        return Err(AegisError::invalid_argument(format!("{name} must not be empty")));
    }
    Ok(())
}

/// Fail with `InvalidArgument` when `bytes` is not exactly `expected` long.
pub fn require_len(name: &str, bytes: &[u8], expected: usize) -> AegisResult<()> {
    if bytes.len() != expected {
        return Err(AegisError::invalid_argument(format!(
            "{name} has wrong length: {} bytes (expected {expected})",
            bytes.len()
        )));
    }
    Ok(())
}

/// Fail with `InvalidArgument` when `value` falls outside `min..=max`.
pub fn require_in_range<T>(name: &str, value: T, min: T, max: T) -> AegisResult<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(AegisError::invalid_argument(format!(
            "{name} out of range: {value} (expected {min}..={max})"
        )));
    }
    Ok(())
}

/// Fail with `InvalidArgument` when a display string is blank.
pub fn require_non_blank(name: &str, value: &str) -> AegisResult<()> {
    if value.trim().is_empty() {
        return Err(AegisError::invalid_argument(format!("{name} must not be blank")));
    }
    Ok(())
}
