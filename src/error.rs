//! Error types for the payroll engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while recording attendance,
//! work logs and salary components, and while computing salaries.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// The main error type for the payroll engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use payroll_engine::error::EngineError;
///
/// let error = EngineError::NotFound {
///     entity: "employee",
///     id: 42,
/// };
/// assert_eq!(error.to_string(), "employee 42 not found");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A lookup by id matched no live row.
    #[error("{entity} {id} not found")]
    NotFound {
        /// The kind of record that was looked up.
        entity: &'static str,
        /// The id that was looked up.
        id: i64,
    },

    /// One or more request fields failed validation.
    #[error("invalid request: {0}")]
    Validation(ValidationErrors),

    /// A dependency of a composite operation failed.
    ///
    /// The context names the step that failed, the source is the
    /// underlying error.
    #[error("{context}: {source}")]
    Dependency {
        /// What the operation was doing when the dependency failed.
        context: String,
        /// The underlying failure.
        source: Box<EngineError>,
    },

    /// A stored value could not be decoded into its domain type.
    #[error("corrupt {entity} record {id}: {message}")]
    CorruptRecord {
        /// The kind of record that could not be decoded.
        entity: &'static str,
        /// The id of the record.
        id: i64,
        /// What failed to decode.
        message: String,
    },

    /// The operation did not finish within the request deadline.
    #[error("{operation} timed out")]
    Timeout {
        /// The operation that timed out.
        operation: String,
    },

    /// The relational store returned an error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration could not be applied.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A payload could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Wraps this error with the name of the step that produced it.
    pub fn context(self, context: impl Into<String>) -> Self {
        EngineError::Dependency {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping any dependency wrappers.
    pub fn root_cause(&self) -> &EngineError {
        match self {
            EngineError::Dependency { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Returns true if the innermost error is a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), EngineError::NotFound { .. })
    }
}

impl From<ValidationErrors> for EngineError {
    fn from(errors: ValidationErrors) -> Self {
        EngineError::Validation(errors)
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FieldError;

    #[test]
    fn test_config_not_found_displays_path() {
        let error = EngineError::ConfigNotFound {
            path: "/missing/file.yaml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found: /missing/file.yaml"
        );
    }

    #[test]
    fn test_config_parse_error_displays_path_and_message() {
        let error = EngineError::ConfigParseError {
            path: "/config/bad.yaml".to_string(),
            message: "invalid YAML syntax".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse configuration file '/config/bad.yaml': invalid YAML syntax"
        );
    }

    #[test]
    fn test_not_found_displays_entity_and_id() {
        let error = EngineError::NotFound {
            entity: "snapshot",
            id: 7,
        };
        assert_eq!(error.to_string(), "snapshot 7 not found");
    }

    #[test]
    fn test_validation_displays_every_field() {
        let error: EngineError = ValidationErrors::from(vec![
            FieldError::new("name", "is required"),
            FieldError::new("shiftFee", "must be greater than 0"),
        ])
        .into();
        assert_eq!(
            error.to_string(),
            "invalid request: name is required; shiftFee must be greater than 0"
        );
    }

    #[test]
    fn test_context_wraps_and_keeps_root_cause() {
        let error = EngineError::NotFound {
            entity: "employee",
            id: 3,
        }
        .context("get employee")
        .context("get salary");

        assert_eq!(
            error.to_string(),
            "get salary: get employee: employee 3 not found"
        );
        assert!(error.is_not_found());
        assert!(matches!(
            error.root_cause(),
            EngineError::NotFound { id: 3, .. }
        ));
    }

    #[test]
    fn test_timeout_is_not_not_found() {
        let error = EngineError::Timeout {
            operation: "get salary".to_string(),
        };
        assert!(!error.is_not_found());
        assert_eq!(error.to_string(), "get salary timed out");
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_not_found() -> EngineResult<()> {
            Err(EngineError::NotFound {
                entity: "work log",
                id: 1,
            })
        }

        fn propagates_error() -> EngineResult<()> {
            returns_not_found()?;
            Ok(())
        }

        assert!(propagates_error().is_err());
    }
}
