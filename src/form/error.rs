//! Error types for the form engine

use super::field_array::StableId;
use super::path::FieldPath;
use thiserror::Error;

/// Misuse of the engine API.
///
/// These are programmer errors (wrong path, wrong value kind), never the
/// outcome of validating user input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("invalid field path `{0}`")]
    InvalidPath(String),

    #[error("field `{0}` is not registered")]
    UnknownField(FieldPath),

    #[error("field `{path}` expects a {expected} value, got {found}")]
    TypeMismatch {
        path: FieldPath,
        expected: &'static str,
        found: &'static str,
    },

    #[error("`{0}` is not a registered field array")]
    NotAnArray(FieldPath),

    #[error("field array `{array}` has no entry {id}")]
    UnknownEntry { array: FieldPath, id: StableId },

    #[error("field array `{array}` has no entry at index {index}")]
    IndexOutOfRange { array: FieldPath, index: usize },

    #[error("writing `{0}` would change the shape of the form; use append/remove for arrays")]
    StructuralWrite(FieldPath),

    #[error("a submit is in progress")]
    SubmitInProgress,
}

/// Outcome of a failed validation for one field.
///
/// `Display` yields the message shown next to the field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{message}")]
    Required { message: String },

    #[error("{message}")]
    PatternMismatch { message: String },

    #[error("{message}")]
    Custom { rule: String, message: String },

    /// The validator itself failed (e.g. the lookup service was unreachable)
    #[error("Could not validate this field")]
    ValidatorFailed { rule: String, reason: String },
}

impl ValidationError {
    /// Name of the rule that produced the error
    pub fn rule(&self) -> &str {
        match self {
            ValidationError::Required { .. } => "required",
            ValidationError::PatternMismatch { .. } => "pattern",
            ValidationError::Custom { rule, .. } | ValidationError::ValidatorFailed { rule, .. } => {
                rule
            }
        }
    }

    /// True for errors the user can fix by changing the value
    pub fn is_user_correctable(&self) -> bool {
        !matches!(self, ValidationError::ValidatorFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display_is_message() {
        let err = ValidationError::Required {
            message: "Username is required".to_string(),
        };
        assert_eq!(err.to_string(), "Username is required");
        assert_eq!(err.rule(), "required");
    }

    #[test]
    fn test_validator_failed_is_not_user_correctable() {
        let err = ValidationError::ValidatorFailed {
            rule: "emailAvailable".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(!err.is_user_correctable());
        assert_eq!(err.rule(), "emailAvailable");
        assert!(ValidationError::Custom {
            rule: "notAdmin".to_string(),
            message: "Enter a different email address".to_string(),
        }
        .is_user_correctable());
    }

    #[test]
    fn test_form_error_messages() {
        let err = FormError::TypeMismatch {
            path: FieldPath::of("age"),
            expected: "number",
            found: "text",
        };
        assert_eq!(err.to_string(), "field `age` expects a number value, got text");
    }
}
