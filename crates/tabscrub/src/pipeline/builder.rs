//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for running
//! the three cleaning stages in order over one table.

use crate::config::{CleaningConfig, ConfigValidationError};
use crate::error::{Result, ResultExt};
use crate::pipeline::progress::{
    ClosureProgressReporter, CleaningStage, ProgressReporter, ProgressUpdate,
};
use crate::pipeline::{MissingValueResolver, OutlierSubstitution};
use crate::schema::SchemaEnforcer;
use crate::types::{ActionType, CleaningAction, CleaningSummary, ColumnSummary};
use crate::utils::{count_missing, find_column};
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// The cleaned table together with the audit trail of the run.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub data: DataFrame,
    pub summary: CleaningSummary,
}

/// The main cleaning pipeline.
///
/// Runs schema enforcement, missing-value resolution and outlier
/// substitution, strictly in that order. Use [`Pipeline::builder()`] to
/// create one.
///
/// # Example
///
/// ```rust,ignore
/// use tabscrub::{CleaningConfig, Pipeline};
///
/// let outcome = Pipeline::builder()
///     .config(CleaningConfig::default())
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run(dataframe)?;
///
/// println!("{} rows left", outcome.data.height());
/// ```
pub struct Pipeline {
    config: CleaningConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// The pipeline may be moved to a worker thread; each run owns its table.
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The validated configuration this pipeline runs with.
    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Clean a DataFrame.
    ///
    /// # Errors
    ///
    /// Fails if the table lacks a required column, or on an underlying
    /// polars error. Conditions the stages recover from are returned as
    /// warnings in the summary instead.
    pub fn run(&self, df: DataFrame) -> Result<CleaningOutcome> {
        match self.run_internal(df) {
            Ok(outcome) => {
                self.report_progress(ProgressUpdate::complete("Cleaning completed successfully"));
                Ok(outcome)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self, df: DataFrame) -> Result<CleaningOutcome> {
        let start_time = Instant::now();

        info!(rows = df.height(), columns = df.width(), "Starting cleaning pipeline");
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Initializing,
            0.0,
            "Starting cleaning pipeline...",
        ));

        let mut summary = CleaningSummary::new();
        summary.rows_before = df.height();
        summary.columns_before = df.width();

        let original_types: Vec<String> = self
            .config
            .required_columns
            .iter()
            .map(|name| {
                find_column(&df, name)
                    .and_then(|input| df.column(&input).ok().map(|c| c.dtype().to_string()))
                    .unwrap_or_default()
            })
            .collect();

        // ===== Stage 1: schema =====
        self.report_progress(ProgressUpdate::new(
            CleaningStage::SchemaEnforcement,
            0.0,
            "Selecting required columns and coercing types...",
        ));
        let (df, schema) =
            SchemaEnforcer::enforce(df, &self.config).context("Schema enforcement")?;

        for ((name, dtype), original_type) in self.config.columns().zip(original_types) {
            let mut column = ColumnSummary::new(name, dtype, original_type);
            column.missing_before = count_missing(df.column(name)?.as_materialized_series())?;
            column.coercion_failed = schema.warnings.iter().any(|w| w.column() == name);
            column.nan_strategy = self.config.nan_strategy_of(name);
            summary.add_column_summary(column);
        }
        for dropped in &schema.dropped_columns {
            summary.add_action(CleaningAction::new(
                ActionType::ColumnRemoved,
                dropped,
                "Dropped column not in the required set",
            ));
        }
        for coercion in &schema.coerced_columns {
            let mut action = CleaningAction::new(
                ActionType::TypeCorrected,
                &coercion.column,
                format!("Converted from {} to {}", coercion.from_dtype, coercion.to),
            );
            if coercion.nulled_markers > 0 {
                action = action.with_details(format!(
                    "{} missing-value markers became null",
                    coercion.nulled_markers
                ));
            }
            summary.add_action(action);
        }

        // ===== Stage 2: missing values =====
        self.report_progress(ProgressUpdate::new(
            CleaningStage::MissingValues,
            0.0,
            "Removing duplicates and resolving missing values...",
        ));
        let (df, missing) =
            MissingValueResolver::resolve(df, &self.config).context("Missing-value resolution")?;

        if missing.duplicates_removed > 0 {
            summary.add_action(CleaningAction::new(
                ActionType::DuplicatesRemoved,
                "dataset",
                format!("Removed {} duplicate rows", missing.duplicates_removed),
            ));
        }
        for drop in &missing.rows_dropped {
            if let Some(column) = summary.column_summary_mut(&drop.column) {
                column.rows_dropped += drop.rows_removed;
            }
            if drop.rows_removed > 0 {
                summary.add_action(CleaningAction::new(
                    ActionType::RowsRemoved,
                    &drop.column,
                    format!("Removed {} rows missing '{}'", drop.rows_removed, drop.column),
                ));
            }
        }
        for fill in &missing.fills {
            if let Some(column) = summary.column_summary_mut(&fill.column) {
                column.values_imputed += fill.filled;
            }
            summary.add_action(
                CleaningAction::new(
                    ActionType::ValueImputed,
                    &fill.column,
                    format!("Filled {} missing values", fill.filled),
                )
                .with_details(format!("{} = {}", fill.strategy, fill.value)),
            );
        }

        // ===== Stage 3: outliers =====
        self.report_progress(ProgressUpdate::new(
            CleaningStage::OutlierSubstitution,
            0.0,
            "Substituting z-score outliers...",
        ));
        let (df, outliers) = OutlierSubstitution::substitute(df, &self.config)
            .context("Outlier substitution")?;

        for column in &outliers.columns {
            if let Some(entry) = summary.column_summary_mut(&column.column) {
                entry.outliers_replaced = column.modified;
            }
            if column.modified > 0 {
                summary.add_action(
                    CleaningAction::new(
                        ActionType::OutlierReplaced,
                        &column.column,
                        format!(
                            "Replaced {} of {} outliers with the last valid value",
                            column.modified, column.flagged
                        ),
                    )
                    .with_details(format!(
                        "|z| > {} (mean {:.4}, std {:.4})",
                        column.threshold, column.mean, column.std_dev
                    )),
                );
            }
        }

        // ===== Summary =====
        for column in summary.column_summaries.iter_mut() {
            if let Ok(col) = df.column(&column.name) {
                column.final_type = col.dtype().to_string();
                column.missing_after = count_missing(col.as_materialized_series())?;
            }
        }

        summary.rows_after = df.height();
        summary.columns_after = df.width();
        summary.rows_removed = summary.rows_before.saturating_sub(summary.rows_after);
        summary.columns_removed = summary.columns_before.saturating_sub(summary.columns_after);
        summary.outliers_replaced = outliers.total_modified();
        summary.warnings = schema
            .warnings
            .iter()
            .chain(&missing.warnings)
            .chain(&outliers.warnings)
            .cloned()
            .collect();
        summary.schema = schema;
        summary.missing_values = missing;
        summary.outliers = outliers;
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            rows_before = summary.rows_before,
            rows_after = summary.rows_after,
            columns_removed = summary.columns_removed,
            outliers_replaced = summary.outliers_replaced,
            warnings = summary.warnings.len(),
            duration_ms = summary.duration_ms,
            "Cleaning pipeline finished"
        );

        Ok(CleaningOutcome { data: df, summary })
    }
}

/// Builder for creating a [`Pipeline`] with custom configuration.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<CleaningConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the cleaning configuration. Defaults to [`CleaningConfig::default()`].
    pub fn config(mut self, config: CleaningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during cleaning.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
        })
    }
}
