//! Field-level validation errors.
//!
//! Input validation stops at the first failing field; that field and the
//! reason it failed are reported together as a [`FieldError`].

use core::fmt;

/// The first field of an input that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct FieldError {
    /// Wire name of the offending field (e.g. `email`).
    pub field: &'static str,
    /// Human-readable reason.
    pub reason: String,
}

impl FieldError {
    /// Create a field error from any displayable reason.
    pub fn new(field: &'static str, reason: impl fmt::Display) -> Self {
        Self {
            field,
            reason: reason.to_string(),
        }
    }

    /// Shorthand for a required field that was absent or empty.
    #[must_use]
    pub fn required(field: &'static str) -> Self {
        Self::new(field, "is required")
    }
}
