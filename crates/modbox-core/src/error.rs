//! # Error Types
//!
//! Domain-specific error types for modbox-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  modbox-core errors (this file)                                        │
//! │  ├── CoreError        - Parse and domain errors                        │
//! │  └── ValidationError  - Catalog validation failures                    │
//! │                                                                         │
//! │  modbox-sync errors (separate crate)                                   │
//! │  └── BoxError         - Config, workshop and install failures          │
//! │                                                                         │
//! │  Across the process boundary everything becomes a Diagnostic:          │
//! │  ValidationError / BoxError → Failures → bridge → Outcome::Failure     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::outcome::{Diagnostic, Failures};

// =============================================================================
// Core Error
// =============================================================================

/// Core parsing and domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A version string could not be parsed.
    ///
    /// Accepted forms are `1.2.3`, `v1.2.3`, `1.2` and `1`.
    #[error("Invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    /// Diagnostic payload was not valid JSON.
    #[error("Invalid diagnostic payload: {0}")]
    InvalidDiagnostics(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Catalog validation errors.
///
/// Raised before modules reach the store, so a bad backend listing shows up
/// as a warning instead of corrupting the id-keyed task list.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., two modules with one id).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Converts the error into a single-entry diagnostic list.
    pub fn to_failures(&self) -> Failures {
        Failures::from(Diagnostic::new("validation", self.to_string()))
    }
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidVersion {
            input: "x.y".to_string(),
            reason: "not a number".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid version 'x.y': not a number");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "id".to_string(),
        };
        assert_eq!(err.to_string(), "id is required");

        let err = ValidationError::Duplicate {
            field: "id".to_string(),
            value: "1001".to_string(),
        };
        assert_eq!(err.to_string(), "id '1001' already exists");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_validation_to_failures() {
        let err = ValidationError::Required {
            field: "title".to_string(),
        };
        let failures = err.to_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].code, "validation");
        assert_eq!(failures[0].description, "title is required");
    }
}
