//! Error types for the cleaning pipeline.
//!
//! Fatal conditions are [`CleaningError`] values and abort the run. Conditions
//! the pipeline recovers from are recorded as [`CleaningWarning`]s instead and
//! travel with the stage reports.
//!
//! Errors are serializable as `{code, message}` so a host UI can display them.

use crate::config::ConfigValidationError;
use crate::types::{NanStrategy, SemanticType};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// One or more required columns are absent from the input table.
    #[error("Required columns missing from input: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// The configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// A column named by the configuration is not in the table.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "SCHEMA_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error came from the configuration rather than the data.
    pub fn is_config_error(&self) -> bool {
        match self {
            Self::InvalidConfig(_) => true,
            Self::WithContext { source, .. } => source.is_config_error(),
            _ => false,
        }
    }

    /// Columns reported missing by a schema failure, if this is one.
    pub fn missing_columns(&self) -> Option<&[String]> {
        match self {
            Self::Schema { missing } => Some(missing),
            Self::WithContext { source, .. } => source.missing_columns(),
            _ => None,
        }
    }
}

impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}

/// A non-fatal condition met while cleaning.
///
/// Warnings are logged where they occur and collected into the stage
/// reports; the affected column is left as it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CleaningWarning {
    /// A column could not be coerced to its declared type.
    TypeCoercion {
        column: String,
        target: SemanticType,
        reason: String,
    },
    /// A statistic needed by a stage is undefined for the column.
    UndefinedStatistic { column: String, reason: String },
    /// A missing-value strategy does not apply to the column's type.
    ImputationSkipped {
        column: String,
        strategy: NanStrategy,
        reason: String,
    },
}

impl CleaningWarning {
    /// The column the warning is about.
    pub fn column(&self) -> &str {
        match self {
            Self::TypeCoercion { column, .. }
            | Self::UndefinedStatistic { column, .. }
            | Self::ImputationSkipped { column, .. } => column,
        }
    }
}

impl std::fmt::Display for CleaningWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TypeCoercion {
                column,
                target,
                reason,
            } => write!(f, "Could not convert column '{column}' to {target}: {reason}"),
            Self::UndefinedStatistic { column, reason } => {
                write!(f, "Statistic undefined for column '{column}': {reason}")
            }
            Self::ImputationSkipped {
                column,
                strategy,
                reason,
            } => write!(f, "Skipped {strategy} imputation for column '{column}': {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let error = CleaningError::Schema {
            missing: vec!["price".to_string()],
        };
        assert_eq!(error.error_code(), "SCHEMA_ERROR");
        assert_eq!(
            CleaningError::ColumnNotFound("test".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
    }

    #[test]
    fn test_schema_error_lists_all_missing_columns() {
        let error = CleaningError::Schema {
            missing: vec!["price".to_string(), "country".to_string()],
        };
        let message = error.to_string();
        assert!(message.contains("price"));
        assert!(message.contains("country"));
        assert_eq!(error.missing_columns().unwrap().len(), 2);
    }

    #[test]
    fn test_config_error_conversion() {
        let error: CleaningError = ConfigValidationError::EmptyColumns.into();
        assert!(error.is_config_error());
        assert_eq!(error.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_error_serialization() {
        let error = CleaningError::ColumnNotFound("demand".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("demand"));
    }

    #[test]
    fn test_with_context() {
        let error = CleaningError::Schema {
            missing: vec!["date".to_string()],
        }
        .with_context("During schema enforcement");
        assert!(error.to_string().contains("During schema enforcement"));
        assert_eq!(error.error_code(), "SCHEMA_ERROR");
        assert_eq!(error.missing_columns(), Some(&["date".to_string()][..]));
    }

    #[test]
    fn test_warning_serialization_is_tagged() {
        let warning = CleaningWarning::UndefinedStatistic {
            column: "price".to_string(),
            reason: "zero variance".to_string(),
        };
        let json = serde_json::to_string(&warning).unwrap();
        assert!(json.contains("\"kind\":\"undefined_statistic\""));
        assert_eq!(warning.column(), "price");
    }
}
