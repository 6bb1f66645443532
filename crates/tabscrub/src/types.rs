use crate::error::CleaningWarning;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Column Policy Types
// ============================================================================

/// Semantic type a required column is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    /// Date or date-time values, stored as `Datetime(ns)`.
    #[serde(alias = "datetime", alias = "datetime64[ns]", alias = "date")]
    Temporal,
    /// Floating point numbers, stored as `Float64`.
    #[serde(alias = "float64", alias = "numeric")]
    Float,
    /// Free text or categories, stored as `String`.
    #[serde(
        alias = "object",
        alias = "string",
        alias = "str",
        alias = "categorical"
    )]
    Text,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temporal => "temporal",
            Self::Float => "float",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SemanticType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temporal" | "datetime" | "datetime64[ns]" | "date" => Ok(Self::Temporal),
            "float" | "float64" | "numeric" => Ok(Self::Float),
            "text" | "object" | "string" | "str" | "categorical" => Ok(Self::Text),
            other => Err(format!("unknown column type '{other}'")),
        }
    }
}

/// Strategy for resolving missing values in one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NanStrategy {
    /// Remove every row where the column is missing
    Drop,
    /// Fill with the mean of present values
    Mean,
    /// Fill with zero
    Zero,
    /// Fill with the median of present values
    Median,
}

impl NanStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Mean => "mean",
            Self::Zero => "zero",
            Self::Median => "median",
        }
    }

    /// Whether the strategy changes the row set.
    pub fn removes_rows(&self) -> bool {
        matches!(self, Self::Drop)
    }
}

impl fmt::Display for NanStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NanStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "mean" => Ok(Self::Mean),
            "zero" => Ok(Self::Zero),
            "median" => Ok(Self::Median),
            other => Err(format!(
                "unknown missing-value strategy '{other}' (expected drop, mean, zero or median)"
            )),
        }
    }
}

// ============================================================================
// Stage Reports
// ============================================================================

/// What the schema enforcer did to the table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaReport {
    /// Input columns not in the required set (original spelling).
    pub dropped_columns: Vec<String>,
    /// Required columns whose input spelling differed from the configuration.
    pub renamed_columns: Vec<(String, String)>,
    /// Columns whose dtype changed, with the original dtype.
    pub coerced_columns: Vec<ColumnCoercion>,
    pub warnings: Vec<CleaningWarning>,
}

/// A single successful dtype conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnCoercion {
    pub column: String,
    pub from_dtype: String,
    pub to: SemanticType,
    /// Values that became null because they were missing markers.
    pub nulled_markers: usize,
}

/// What the missing-value resolver did to the table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissingValueReport {
    pub rows_before: usize,
    pub rows_after: usize,
    pub duplicates_removed: usize,
    /// Rows removed by each `drop` strategy, in application order.
    pub rows_dropped: Vec<ColumnDrop>,
    /// Fills applied by `mean`/`median`/`zero` strategies, in application order.
    pub fills: Vec<ColumnFill>,
    pub warnings: Vec<CleaningWarning>,
}

impl MissingValueReport {
    /// Fraction of the stage's input rows that were removed (0.0 - 1.0).
    pub fn removed_fraction(&self) -> f64 {
        if self.rows_before == 0 {
            0.0
        } else {
            self.rows_before.saturating_sub(self.rows_after) as f64 / self.rows_before as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDrop {
    pub column: String,
    pub rows_removed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFill {
    pub column: String,
    pub strategy: NanStrategy,
    /// The fill value rendered as text.
    pub value: String,
    pub filled: usize,
}

/// What the outlier engine did to the table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutlierReport {
    pub columns: Vec<ColumnOutliers>,
    pub warnings: Vec<CleaningWarning>,
}

impl OutlierReport {
    /// Total number of cells replaced across all columns.
    pub fn total_modified(&self) -> usize {
        self.columns.iter().map(|c| c.modified).sum()
    }
}

/// Outlier counts for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnOutliers {
    pub column: String,
    pub threshold: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Rows whose absolute z-score exceeded the threshold.
    pub flagged: usize,
    /// Flagged rows that were replaced with the last valid value.
    pub modified: usize,
    /// Flagged rows left as-is because no valid value preceded them.
    pub leading_unmodified: usize,
}

// ============================================================================
// Cleaning Summary Types
// ============================================================================

/// Human-readable summary of what a pipeline run did.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    pub rows_before: usize,
    pub rows_after: usize,
    pub rows_removed: usize,

    pub columns_before: usize,
    pub columns_after: usize,
    pub columns_removed: usize,

    /// Cells replaced by the outlier engine.
    pub outliers_replaced: usize,

    /// Audit trail of the run.
    pub actions: Vec<CleaningAction>,

    /// Per-column summaries of changes.
    pub column_summaries: Vec<ColumnSummary>,

    /// Non-fatal conditions met during the run.
    pub warnings: Vec<CleaningWarning>,

    pub schema: SchemaReport,
    pub missing_values: MissingValueReport,
    pub outliers: OutlierReport,
}

impl CleaningSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_action(&mut self, action: CleaningAction) {
        self.actions.push(action);
    }

    pub fn add_column_summary(&mut self, summary: ColumnSummary) {
        self.column_summaries.push(summary);
    }

    /// Calculate the percentage of rows removed.
    pub fn rows_removed_percentage(&self) -> f32 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.rows_removed as f32 / self.rows_before as f32) * 100.0
        }
    }

    /// Calculate the percentage of columns removed.
    pub fn columns_removed_percentage(&self) -> f32 {
        if self.columns_before == 0 {
            0.0
        } else {
            (self.columns_removed as f32 / self.columns_before as f32) * 100.0
        }
    }

    pub fn column_summary_mut(&mut self, name: &str) -> Option<&mut ColumnSummary> {
        self.column_summaries.iter_mut().find(|c| c.name == name)
    }
}

/// A single action taken during cleaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningAction {
    pub action_type: ActionType,
    /// Column name or "dataset".
    pub target: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CleaningAction {
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Types of actions recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// An input column outside the required set was dropped.
    ColumnRemoved,
    /// A column was converted to its declared type.
    TypeCorrected,
    /// Exact-duplicate rows were removed.
    DuplicatesRemoved,
    /// Rows were removed by a `drop` strategy.
    RowsRemoved,
    /// Missing values were filled.
    ValueImputed,
    /// Outlier cells were replaced with the last valid value.
    OutlierReplaced,
}

impl ActionType {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ColumnRemoved => "Column Removed",
            Self::TypeCorrected => "Type Corrected",
            Self::DuplicatesRemoved => "Duplicates Removed",
            Self::RowsRemoved => "Rows Removed",
            Self::ValueImputed => "Value Imputed",
            Self::OutlierReplaced => "Outlier Replaced",
        }
    }
}

/// Summary of changes made to a single required column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub declared_type: SemanticType,
    /// Data type on entry to the pipeline.
    pub original_type: String,
    /// Data type after cleaning.
    pub final_type: String,
    /// Missing values after schema enforcement.
    pub missing_before: usize,
    /// Missing values after cleaning.
    pub missing_after: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nan_strategy: Option<NanStrategy>,
    pub values_imputed: usize,
    pub rows_dropped: usize,
    pub outliers_replaced: usize,
    pub coercion_failed: bool,
}

impl ColumnSummary {
    pub fn new(
        name: impl Into<String>,
        declared_type: SemanticType,
        original_type: impl Into<String>,
    ) -> Self {
        let original_type = original_type.into();
        Self {
            name: name.into(),
            declared_type,
            final_type: original_type.clone(),
            original_type,
            missing_before: 0,
            missing_after: 0,
            nan_strategy: None,
            values_imputed: 0,
            rows_dropped: 0,
            outliers_replaced: 0,
            coercion_failed: false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_type_aliases() {
        assert_eq!("datetime64[ns]".parse::<SemanticType>(), Ok(SemanticType::Temporal));
        assert_eq!("Float".parse::<SemanticType>(), Ok(SemanticType::Float));
        assert_eq!(" object ".parse::<SemanticType>(), Ok(SemanticType::Text));
        assert!("complex".parse::<SemanticType>().is_err());
    }

    #[test]
    fn test_semantic_type_deserialize_alias() {
        let parsed: Vec<SemanticType> =
            serde_json::from_str(r#"["datetime", "float64", "categorical"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![SemanticType::Temporal, SemanticType::Float, SemanticType::Text]
        );
        assert_eq!(serde_json::to_string(&SemanticType::Temporal).unwrap(), "\"temporal\"");
    }

    #[test]
    fn test_nan_strategy_parse() {
        assert_eq!("MEAN".parse::<NanStrategy>(), Ok(NanStrategy::Mean));
        assert_eq!("drop".parse::<NanStrategy>(), Ok(NanStrategy::Drop));
        assert!("ffill".parse::<NanStrategy>().is_err());
        assert!(NanStrategy::Drop.removes_rows());
        assert!(!NanStrategy::Median.removes_rows());
    }

    #[test]
    fn test_removed_fraction() {
        let report = MissingValueReport {
            rows_before: 8,
            rows_after: 6,
            ..Default::default()
        };
        assert!((report.removed_fraction() - 0.25).abs() < 1e-12);
        assert_eq!(MissingValueReport::default().removed_fraction(), 0.0);
    }

    #[test]
    fn test_summary_percentages() {
        let mut summary = CleaningSummary::new();
        summary.rows_before = 100;
        summary.rows_removed = 10;
        summary.columns_before = 8;
        summary.columns_removed = 2;

        assert!((summary.rows_removed_percentage() - 10.0).abs() < 0.01);
        assert!((summary.columns_removed_percentage() - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_action_with_details() {
        let action = CleaningAction::new(ActionType::ValueImputed, "demand", "Filled 2 values")
            .with_details("mean = 7");
        assert_eq!(action.action_type, ActionType::ValueImputed);
        assert_eq!(action.details.as_deref(), Some("mean = 7"));
        assert_eq!(ActionType::OutlierReplaced.display_name(), "Outlier Replaced");
    }

    #[test]
    fn test_action_type_serializes_snake_case() {
        let json = serde_json::to_string(&ActionType::DuplicatesRemoved).unwrap();
        assert_eq!(json, "\"duplicates_removed\"");
    }
}
