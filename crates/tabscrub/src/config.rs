//! Configuration for the cleaning pipeline.
//!
//! A [`CleaningConfig`] declares which columns a table must have, the type of
//! each, how missing values are resolved per column and which columns get
//! z-score outlier substitution. It is validated once, when it is built or
//! loaded, and is read-only for the duration of a run.
//!
//! Three ways to get one:
//!
//! ```rust,ignore
//! use tabscrub::config::{CleaningConfig, ConfigFields};
//! use tabscrub::types::{NanStrategy, SemanticType};
//!
//! // 1. Builder
//! let config = CleaningConfig::builder()
//!     .column("date", SemanticType::Temporal)
//!     .column("price", SemanticType::Float)
//!     .nan_strategy("price", NanStrategy::Drop)
//!     .outlier_threshold("price", 4.0)
//!     .build()?;
//!
//! // 2. JSON document
//! let config = CleaningConfig::from_json_file("cleaning.json")?;
//!
//! // 3. Free-text fields as typed by a user
//! let config = ConfigFields {
//!     required_columns: "date, price".into(),
//!     columns_dtype: "datetime, float".into(),
//!     nan_value_handler: "price=drop".into(),
//!     outliers_zscore_threshold: "price=4".into(),
//! }
//! .parse()?;
//! ```

use crate::error::{CleaningError, Result};
use crate::types::{NanStrategy, SemanticType};
use crate::utils::canonical_column_name;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Declarative cleaning policy for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Columns that must be present; also the output column order.
    pub required_columns: Vec<String>,

    /// Declared type of each required column, paired by position.
    pub columns_dtype: Vec<SemanticType>,

    /// Missing-value strategy per column, applied in insertion order.
    #[serde(default)]
    pub nan_value_handler: IndexMap<String, NanStrategy>,

    /// Absolute z-score above which a value is an outlier, per column.
    #[serde(default)]
    pub outliers_zscore_threshold: IndexMap<String, f64>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            required_columns: ["date", "demand", "supply", "price", "country"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            columns_dtype: vec![
                SemanticType::Temporal,
                SemanticType::Float,
                SemanticType::Float,
                SemanticType::Float,
                SemanticType::Text,
            ],
            nan_value_handler: IndexMap::from([
                ("demand".to_string(), NanStrategy::Mean),
                ("supply".to_string(), NanStrategy::Mean),
                ("price".to_string(), NanStrategy::Drop),
                ("country".to_string(), NanStrategy::Drop),
                ("date".to_string(), NanStrategy::Drop),
            ]),
            outliers_zscore_threshold: IndexMap::from([("price".to_string(), 4.0)]),
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder with no columns.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: CleaningConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CleaningError::Io(e).with_context(format!("Reading config {}", path.display()))
        })?;
        Self::from_json_str(&contents)
            .map_err(|e| e.with_context(format!("Loading config {}", path.display())))
    }

    /// Pretty-printed JSON, suitable for editing and reloading.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if self.required_columns.is_empty() {
            return Err(ConfigValidationError::EmptyColumns);
        }

        if self.required_columns.len() != self.columns_dtype.len() {
            return Err(ConfigValidationError::LengthMismatch {
                columns: self.required_columns.len(),
                dtypes: self.columns_dtype.len(),
            });
        }

        let mut seen = HashSet::new();
        for name in &self.required_columns {
            let canonical = canonical_column_name(name);
            if canonical.is_empty() || !seen.insert(canonical) {
                return Err(ConfigValidationError::DuplicateColumn(name.clone()));
            }
        }

        for column in self.nan_value_handler.keys() {
            if !seen.contains(&canonical_column_name(column)) {
                return Err(ConfigValidationError::UnknownColumn {
                    field: "nan_value_handler",
                    column: column.clone(),
                });
            }
        }

        for (column, threshold) in &self.outliers_zscore_threshold {
            if !seen.contains(&canonical_column_name(column)) {
                return Err(ConfigValidationError::UnknownColumn {
                    field: "outliers_zscore_threshold",
                    column: column.clone(),
                });
            }
            if !threshold.is_finite() || *threshold <= 0.0 {
                return Err(ConfigValidationError::InvalidThreshold {
                    column: column.clone(),
                    value: *threshold,
                });
            }
        }

        Ok(())
    }

    /// Required columns paired with their declared types.
    pub fn columns(&self) -> impl Iterator<Item = (&str, SemanticType)> {
        self.required_columns
            .iter()
            .map(String::as_str)
            .zip(self.columns_dtype.iter().copied())
    }

    /// Declared type of a required column (case-insensitive).
    pub fn dtype_of(&self, column: &str) -> Option<SemanticType> {
        let wanted = canonical_column_name(column);
        self.columns()
            .find(|(name, _)| canonical_column_name(name) == wanted)
            .map(|(_, dtype)| dtype)
    }

    /// Missing-value strategy configured for a column (case-insensitive).
    pub fn nan_strategy_of(&self, column: &str) -> Option<NanStrategy> {
        let wanted = canonical_column_name(column);
        self.nan_value_handler
            .iter()
            .find(|(name, _)| canonical_column_name(name) == wanted)
            .map(|(_, strategy)| *strategy)
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("No required columns declared")]
    EmptyColumns,

    #[error("{columns} required columns but {dtypes} column types (must be equal)")]
    LengthMismatch { columns: usize, dtypes: usize },

    #[error("Required column '{0}' is empty or declared more than once")]
    DuplicateColumn(String),

    #[error("'{column}' in {field} is not a required column")]
    UnknownColumn { field: &'static str, column: String },

    #[error("Invalid z-score threshold for '{column}': {value} (must be a positive number)")]
    InvalidThreshold { column: String, value: f64 },

    #[error("Could not parse {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    required_columns: Vec<String>,
    columns_dtype: Vec<SemanticType>,
    nan_value_handler: IndexMap<String, NanStrategy>,
    outliers_zscore_threshold: IndexMap<String, f64>,
}

impl CleaningConfigBuilder {
    /// Append a required column with its declared type.
    pub fn column(mut self, name: impl Into<String>, dtype: SemanticType) -> Self {
        self.required_columns.push(name.into());
        self.columns_dtype.push(dtype);
        self
    }

    /// Set the missing-value strategy for a column.
    ///
    /// Strategies run in the order they are added.
    pub fn nan_strategy(mut self, column: impl Into<String>, strategy: NanStrategy) -> Self {
        self.nan_value_handler.insert(column.into(), strategy);
        self
    }

    /// Enable outlier substitution for a column.
    pub fn outlier_threshold(mut self, column: impl Into<String>, threshold: f64) -> Self {
        self.outliers_zscore_threshold
            .insert(column.into(), threshold);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<CleaningConfig, ConfigValidationError> {
        let config = CleaningConfig {
            required_columns: self.required_columns,
            columns_dtype: self.columns_dtype,
            nan_value_handler: self.nan_value_handler,
            outliers_zscore_threshold: self.outliers_zscore_threshold,
        };

        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Free-text configuration fields
// ============================================================================

/// The four editable text fields of the configuration surface.
///
/// Each field accepts either JSON (`["a", "b"]`, `{"a": "mean"}`) or a
/// lighter comma-separated form (`a, b`, `a=mean, b=drop`). Text is parsed,
/// never evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFields {
    pub required_columns: String,
    pub columns_dtype: String,
    pub nan_value_handler: String,
    pub outliers_zscore_threshold: String,
}

impl ConfigFields {
    /// Render an existing configuration into editable fields.
    pub fn from_config(config: &CleaningConfig) -> Self {
        Self {
            required_columns: config.required_columns.join(", "),
            columns_dtype: config
                .columns_dtype
                .iter()
                .map(SemanticType::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            nan_value_handler: config
                .nan_value_handler
                .iter()
                .map(|(column, strategy)| format!("{column}={strategy}"))
                .collect::<Vec<_>>()
                .join(", "),
            outliers_zscore_threshold: config
                .outliers_zscore_threshold
                .iter()
                .map(|(column, threshold)| format!("{column}={threshold}"))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Parse all four fields into a validated configuration.
    pub fn parse(&self) -> std::result::Result<CleaningConfig, ConfigValidationError> {
        let config = CleaningConfig {
            required_columns: parse_column_list(&self.required_columns)?,
            columns_dtype: parse_dtype_list(&self.columns_dtype)?,
            nan_value_handler: parse_strategy_map(&self.nan_value_handler)?,
            outliers_zscore_threshold: parse_threshold_map(&self.outliers_zscore_threshold)?,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Parse a list of column names.
pub fn parse_column_list(text: &str) -> std::result::Result<Vec<String>, ConfigValidationError> {
    const FIELD: &str = "required_columns";
    let items: Vec<String> = match parse_json_if_bracketed(text, '[', FIELD)? {
        Some(value) => serde_json::from_value(value).map_err(|e| invalid(FIELD, e))?,
        None => split_items(text).map(str::to_string).collect(),
    };
    Ok(items.into_iter().map(|s| s.trim().to_string()).collect())
}

/// Parse a list of column types.
pub fn parse_dtype_list(
    text: &str,
) -> std::result::Result<Vec<SemanticType>, ConfigValidationError> {
    const FIELD: &str = "columns_dtype";
    let items: Vec<String> = match parse_json_if_bracketed(text, '[', FIELD)? {
        Some(value) => serde_json::from_value(value).map_err(|e| invalid(FIELD, e))?,
        None => split_items(text).map(str::to_string).collect(),
    };
    items
        .iter()
        .map(|item| item.parse::<SemanticType>().map_err(|e| invalid(FIELD, e)))
        .collect()
}

/// Parse a column-to-strategy mapping, keeping the written order.
pub fn parse_strategy_map(
    text: &str,
) -> std::result::Result<IndexMap<String, NanStrategy>, ConfigValidationError> {
    const FIELD: &str = "nan_value_handler";
    let pairs: Vec<(String, String)> = match parse_json_if_bracketed(text, '{', FIELD)? {
        Some(_) => {
            let map: IndexMap<String, String> =
                serde_json::from_str(text.trim()).map_err(|e| invalid(FIELD, e))?;
            map.into_iter().collect()
        }
        None => split_pairs(text, FIELD)?,
    };
    let mut map = IndexMap::with_capacity(pairs.len());
    for (column, strategy) in pairs {
        let strategy = strategy.parse::<NanStrategy>().map_err(|e| invalid(FIELD, e))?;
        map.insert(column, strategy);
    }
    Ok(map)
}

/// Parse a column-to-threshold mapping, keeping the written order.
pub fn parse_threshold_map(
    text: &str,
) -> std::result::Result<IndexMap<String, f64>, ConfigValidationError> {
    const FIELD: &str = "outliers_zscore_threshold";
    if parse_json_if_bracketed(text, '{', FIELD)?.is_some() {
        return serde_json::from_str(text.trim()).map_err(|e| invalid(FIELD, e));
    }
    let mut map = IndexMap::new();
    for (column, value) in split_pairs(text, FIELD)? {
        let threshold = value
            .parse::<f64>()
            .map_err(|_| invalid(FIELD, format!("'{value}' is not a number")))?;
        map.insert(column, threshold);
    }
    Ok(map)
}

fn invalid(field: &'static str, reason: impl ToString) -> ConfigValidationError {
    ConfigValidationError::InvalidField {
        field,
        reason: reason.to_string(),
    }
}

/// Parse `text` as JSON when it starts with `open`, otherwise return `None`.
fn parse_json_if_bracketed(
    text: &str,
    open: char,
    field: &'static str,
) -> std::result::Result<Option<serde_json::Value>, ConfigValidationError> {
    let trimmed = text.trim();
    if !trimmed.starts_with(open) {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| invalid(field, e))
}

fn split_items(text: &str) -> impl Iterator<Item = &str> {
    text.split([',', '\n'])
        .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\''))
        .filter(|s| !s.is_empty())
}

fn split_pairs(
    text: &str,
    field: &'static str,
) -> std::result::Result<Vec<(String, String)>, ConfigValidationError> {
    split_items(text)
        .map(|item| {
            let (key, value) = item
                .split_once('=')
                .or_else(|| item.split_once(':'))
                .ok_or_else(|| invalid(field, format!("expected 'column=value', got '{item}'")))?;
            let key = key.trim().trim_matches(|c| c == '"' || c == '\'');
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            if key.is_empty() || value.is_empty() {
                return Err(invalid(field, format!("incomplete pair '{item}'")));
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}
