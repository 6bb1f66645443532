//! Missing-value resolution.
//!
//! Removes exact-duplicate rows, then applies each configured strategy in
//! turn. A `drop` shrinks the table for every strategy after it.

use crate::config::CleaningConfig;
use crate::error::{CleaningError, Result, ResultExt};
use crate::imputers::{FillOutcome, StatisticalImputer, drop_missing_rows, remove_duplicate_rows};
use crate::types::{ColumnDrop, ColumnFill, MissingValueReport, NanStrategy};
use crate::utils::find_column;
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Deduplicates rows and resolves missing values per column.
pub struct MissingValueResolver;

impl MissingValueResolver {
    /// Deduplicate `df` and apply `config.nan_value_handler` in order.
    ///
    /// Columns without a strategy are left alone.
    ///
    /// # Errors
    ///
    /// [`CleaningError::ColumnNotFound`] if a strategy names a column the
    /// table does not have.
    pub fn resolve(
        df: DataFrame,
        config: &CleaningConfig,
    ) -> Result<(DataFrame, MissingValueReport)> {
        let mut report = MissingValueReport {
            rows_before: df.height(),
            ..Default::default()
        };

        let (mut df, duplicates) =
            remove_duplicate_rows(df).context("Removing duplicate rows")?;
        report.duplicates_removed = duplicates;
        if duplicates > 0 {
            debug!(duplicates, "Removed duplicate rows");
        }

        for (key, strategy) in &config.nan_value_handler {
            let column =
                find_column(&df, key).ok_or_else(|| CleaningError::ColumnNotFound(key.clone()))?;

            let outcome = {
                let series = df.column(&column)?.as_materialized_series();
                match strategy {
                    NanStrategy::Drop => None,
                    NanStrategy::Mean => Some(StatisticalImputer::apply_mean(series)?),
                    NanStrategy::Median => Some(StatisticalImputer::apply_median(series)?),
                    NanStrategy::Zero => Some(StatisticalImputer::apply_zero(series)?),
                }
            };

            match outcome {
                None => {
                    let (remaining, rows_removed) = drop_missing_rows(df, &column)
                        .context(format!("Dropping rows missing '{column}'"))?;
                    df = remaining;
                    debug!(column = %column, rows_removed, "Dropped rows with missing values");
                    report.rows_dropped.push(ColumnDrop {
                        column,
                        rows_removed,
                    });
                }
                Some(FillOutcome::Filled {
                    series,
                    value,
                    filled,
                }) => {
                    df.replace(&column, series)?;
                    debug!(column = %column, %strategy, %value, filled, "Filled missing values");
                    report.fills.push(ColumnFill {
                        column,
                        strategy: *strategy,
                        value,
                        filled,
                    });
                }
                Some(FillOutcome::NothingMissing) => {
                    debug!(column = %column, %strategy, "No missing values to fill");
                }
                Some(FillOutcome::Skipped(warning)) => {
                    warn!("{warning}");
                    report.warnings.push(warning);
                }
            }
        }

        report.rows_after = df.height();

        info!(
            rows_before = report.rows_before,
            rows_after = report.rows_after,
            duplicates = report.duplicates_removed,
            removed_fraction = report.removed_fraction(),
            "Missing values resolved"
        );

        Ok((df, report))
    }
}
