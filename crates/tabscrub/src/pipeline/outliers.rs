//! Outlier substitution.
//!
//! For each configured column, values whose absolute z-score exceeds the
//! column's threshold are replaced with the most recent non-outlier value
//! above them. Outliers with no such value above them are left in place.

use crate::config::CleaningConfig;
use crate::error::{CleaningError, CleaningWarning, Result};
use crate::types::{ColumnOutliers, OutlierReport};
use crate::utils::{count_missing, find_column, float_values, is_numeric_dtype};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Replaces z-score outliers with the last valid value.
pub struct OutlierSubstitution;

impl OutlierSubstitution {
    /// Apply `config.outliers_zscore_threshold` to `df`, in order.
    ///
    /// Row count and column set never change. A column whose statistics are
    /// undefined (non-numeric, has missing values, empty, zero or non-finite
    /// standard deviation) is left unchanged and a warning is recorded.
    ///
    /// # Errors
    ///
    /// [`CleaningError::ColumnNotFound`] if a threshold names a column the
    /// table does not have.
    pub fn substitute(
        mut df: DataFrame,
        config: &CleaningConfig,
    ) -> Result<(DataFrame, OutlierReport)> {
        let mut report = OutlierReport::default();

        for (key, &threshold) in &config.outliers_zscore_threshold {
            let column =
                find_column(&df, key).ok_or_else(|| CleaningError::ColumnNotFound(key.clone()))?;

            let series = df.column(&column)?.as_materialized_series().clone();
            match Self::substitute_column(&series, threshold)? {
                Ok((replaced, stats)) => {
                    if stats.modified > 0 {
                        df.replace(&column, replaced)?;
                    }
                    info!(
                        column = %column,
                        threshold,
                        flagged = stats.flagged,
                        modified = stats.modified,
                        leading_unmodified = stats.leading_unmodified,
                        "Outliers substituted"
                    );
                    report.columns.push(stats);
                }
                Err(reason) => {
                    let warning = CleaningWarning::UndefinedStatistic {
                        column: column.clone(),
                        reason,
                    };
                    warn!("{warning}");
                    report.warnings.push(warning);
                }
            }
        }

        Ok((df, report))
    }

    /// Substitute outliers in one column.
    ///
    /// The inner `Err` carries the reason the z-score is undefined.
    fn substitute_column(
        series: &Series,
        threshold: f64,
    ) -> Result<std::result::Result<(Series, ColumnOutliers), String>> {
        let dtype = series.dtype().clone();
        if !is_numeric_dtype(&dtype) {
            return Ok(Err(format!("z-score needs a numeric column, found {dtype}")));
        }
        if series.is_empty() {
            return Ok(Err("column is empty".to_string()));
        }
        let missing = count_missing(series)?;
        if missing > 0 {
            return Ok(Err(format!(
                "column has {missing} missing values; resolve them before outlier substitution"
            )));
        }

        let floats = float_values(series)?;
        let values = floats.f64()?;
        // ddof = 0: population standard deviation.
        let (Some(column_mean), Some(std_dev)) = (values.mean(), values.std(0)) else {
            return Ok(Err("column is empty".to_string()));
        };
        if !std_dev.is_finite() || std_dev == 0.0 {
            return Ok(Err(format!(
                "standard deviation is {std_dev}; z-scores are undefined"
            )));
        }

        let mut stats = ColumnOutliers {
            column: series.name().to_string(),
            threshold,
            mean: column_mean,
            std_dev,
            flagged: 0,
            modified: 0,
            leading_unmodified: 0,
        };

        // z-scores come from the original column; replacements never feed back.
        let mut last_valid: Option<f64> = None;
        let mut result_vec: Vec<f64> = Vec::with_capacity(values.len());
        for (row, value) in values.into_no_null_iter().enumerate() {
            let z = (value - column_mean) / std_dev;
            if z.abs() > threshold {
                stats.flagged += 1;
                match last_valid {
                    Some(previous) => {
                        debug!(row, value, z, replacement = previous, "Replacing outlier");
                        stats.modified += 1;
                        result_vec.push(previous);
                    }
                    None => {
                        debug!(row, value, z, "Leading outlier left unmodified");
                        stats.leading_unmodified += 1;
                        result_vec.push(value);
                    }
                }
            } else {
                last_valid = Some(value);
                result_vec.push(value);
            }
        }

        let replaced = Series::new(series.name().clone(), result_vec).cast(&dtype)?;
        Ok(Ok((replaced, stats)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SemanticType;
    use pretty_assertions::assert_eq;

    fn price_config(threshold: f64) -> CleaningConfig {
        CleaningConfig::builder()
            .column("price", SemanticType::Float)
            .outlier_threshold("price", threshold)
            .build()
            .unwrap()
    }

    fn prices(df: &DataFrame) -> Vec<f64> {
        df.column("price")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect()
    }

    #[test]
    fn test_spike_replaced_with_previous_value() {
        // Population z of the spike is exactly 2.0.
        let df = df! { "price" => &[10.0, 10.0, 10.0, 1000.0, 10.0] }.unwrap();
        let (df, report) = OutlierSubstitution::substitute(df, &price_config(1.5)).unwrap();

        assert_eq!(prices(&df), vec![10.0, 10.0, 10.0, 10.0, 10.0]);
        assert_eq!(report.columns[0].flagged, 1);
        assert_eq!(report.columns[0].modified, 1);
        assert_eq!(report.total_modified(), 1);
    }

    #[test]
    fn test_spike_below_threshold_is_kept() {
        let df = df! { "price" => &[10.0, 10.0, 10.0, 1000.0, 10.0] }.unwrap();
        let (df, report) = OutlierSubstitution::substitute(df, &price_config(4.0)).unwrap();

        assert_eq!(prices(&df), vec![10.0, 10.0, 10.0, 1000.0, 10.0]);
        assert_eq!(report.columns[0].flagged, 0);
    }

    #[test]
    fn test_threshold_four_on_long_series() {
        let mut values = vec![10.0; 30];
        values.insert(15, 1000.0);
        let df = df! { "price" => &values }.unwrap();

        let (df, report) = OutlierSubstitution::substitute(df, &price_config(4.0)).unwrap();

        assert!(prices(&df).iter().all(|v| *v == 10.0));
        assert_eq!(report.columns[0].modified, 1);
        assert_eq!(df.height(), 31);
    }

    #[test]
    fn test_leading_outlier_left_unmodified() {
        // |z| of the leading value is sqrt(3).
        let df = df! { "price" => &[1000.0, 1.0, 1.0, 1.0] }.unwrap();
        let (df, report) = OutlierSubstitution::substitute(df, &price_config(1.5)).unwrap();

        assert_eq!(prices(&df), vec![1000.0, 1.0, 1.0, 1.0]);
        assert_eq!(report.columns[0].flagged, 1);
        assert_eq!(report.columns[0].modified, 0);
        assert_eq!(report.columns[0].leading_unmodified, 1);
    }

    #[test]
    fn test_second_pass_changes_nothing() {
        let mut values: Vec<f64> = (0..30).map(|i| 10.0 + (i % 3) as f64).collect();
        values.insert(15, 1000.0);
        let df = df! { "price" => &values }.unwrap();
        let config = price_config(4.0);

        let (once, first) = OutlierSubstitution::substitute(df, &config).unwrap();
        assert_eq!(first.columns[0].modified, 1);

        let (twice, second) = OutlierSubstitution::substitute(once.clone(), &config).unwrap();
        assert_eq!(second.columns[0].flagged, 0);
        assert_eq!(second.columns[0].modified, 0);
        assert!(second.warnings.is_empty());
        assert_eq!(prices(&twice), prices(&once));
    }

    #[test]
    fn test_second_pass_reports_leading_outlier_again() {
        let df = df! { "price" => &[1000.0, 1.0, 1.0, 1.0] }.unwrap();
        let config = price_config(1.5);

        let (once, _) = OutlierSubstitution::substitute(df, &config).unwrap();
        let (twice, second) = OutlierSubstitution::substitute(once.clone(), &config).unwrap();

        assert_eq!(prices(&twice), prices(&once));
        assert_eq!(second.columns[0].modified, 0);
        assert_eq!(second.columns[0].leading_unmodified, 1);
    }

    #[test]
    fn test_consecutive_outliers_share_last_valid() {
        let mut values = vec![5.0; 20];
        values[10] = 500.0;
        values[11] = 500.0;
        values[9] = 6.0;
        let df = df! { "price" => &values }.unwrap();

        let (df, report) = OutlierSubstitution::substitute(df, &price_config(2.0)).unwrap();
        let result = prices(&df);
        assert_eq!(result[10], 6.0);
        assert_eq!(result[11], 6.0);
        assert_eq!(report.columns[0].modified, 2);
    }

    #[test]
    fn test_constant_column_is_undefined() {
        let df = df! { "price" => &[3.0, 3.0, 3.0] }.unwrap();
        let (df, report) = OutlierSubstitution::substitute(df, &price_config(1.0)).unwrap();

        assert_eq!(prices(&df), vec![3.0, 3.0, 3.0]);
        assert!(report.columns.is_empty());
        assert!(matches!(
            report.warnings.as_slice(),
            [CleaningWarning::UndefinedStatistic { .. }]
        ));
    }

    #[test]
    fn test_column_with_missing_values_is_skipped() {
        let df = df! { "price" => &[Some(1.0), None, Some(100.0)] }.unwrap();
        let (df, report) = OutlierSubstitution::substitute(df, &price_config(0.5)).unwrap();

        assert_eq!(df.column("price").unwrap().null_count(), 1);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_text_column_is_skipped() {
        let config = CleaningConfig::builder()
            .column("price", SemanticType::Text)
            .outlier_threshold("price", 1.0)
            .build()
            .unwrap();
        let df = df! { "price" => &["a", "b"] }.unwrap();

        let (_, report) = OutlierSubstitution::substitute(df, &config).unwrap();
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_empty_column_is_skipped() {
        let df = df! { "price" => Vec::<f64>::new() }.unwrap();
        let (df, report) = OutlierSubstitution::substitute(df, &price_config(1.0)).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_integer_column_keeps_dtype() {
        let mut values = vec![10i64; 30];
        values.push(1000);
        let df = df! { "price" => &values }.unwrap();

        let (df, report) = OutlierSubstitution::substitute(df, &price_config(4.0)).unwrap();
        let column = df.column("price").unwrap();
        assert_eq!(column.dtype(), &DataType::Int64);
        assert_eq!(column.as_materialized_series().i64().unwrap().get(30), Some(10));
        assert_eq!(report.columns[0].modified, 1);
    }

    #[test]
    fn test_unknown_column_is_error() {
        let config = price_config(3.0);
        let df = df! { "demand" => &[1.0] }.unwrap();
        let err = OutlierSubstitution::substitute(df, &config).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }
}
