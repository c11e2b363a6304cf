//! Shared primitives for all Rust crates in Billport.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across Billport crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
///
/// The access-control variants are precise on purpose: unknown roles,
/// capabilities, and companies are data-integrity failures that must never
/// degrade into a permissive outcome, while a detected hierarchy cycle must
/// block the offending write before it reaches storage.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Principal is authenticated but blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Role missing from the configured role hierarchy.
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// Capability missing from the configured capability table.
    #[error("unknown capability: {0}")]
    UnknownCapability(String),

    /// Company id absent from the hierarchy snapshot.
    #[error("unknown company: {0}")]
    UnknownCompany(String),

    /// Parent assignment would create a cycle in the company hierarchy.
    #[error("cycle detected: {0}")]
    CycleDetected(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::NonEmptyString;

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn non_empty_string_keeps_inner_value() {
        let value = NonEmptyString::new("Acme Industries");
        assert!(value.is_ok());
        assert_eq!(
            value.unwrap_or_else(|_| unreachable!()).as_str(),
            "Acme Industries"
        );
    }
}
