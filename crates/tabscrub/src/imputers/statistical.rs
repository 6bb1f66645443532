//! Statistical imputation methods.
//!
//! Provides mean, median and zero fills. Statistics are computed from the
//! values present before the fill.

use crate::error::{CleaningWarning, Result};
use crate::types::NanStrategy;
use crate::utils::{count_missing, float_values, is_numeric_dtype, is_temporal_dtype};
use polars::prelude::*;

/// Result of filling one column.
#[derive(Debug)]
pub enum FillOutcome {
    /// Missing values were replaced.
    Filled {
        series: Series,
        /// The fill value as it appears in the column.
        value: String,
        filled: usize,
    },
    /// The column had nothing to fill.
    NothingMissing,
    /// The strategy could not be applied; the column is unchanged.
    Skipped(CleaningWarning),
}

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill missing values with the mean of present values.
    pub fn apply_mean(series: &Series) -> Result<FillOutcome> {
        Self::apply_statistic(series, NanStrategy::Mean)
    }

    /// Fill missing values with the median of present values.
    pub fn apply_median(series: &Series) -> Result<FillOutcome> {
        Self::apply_statistic(series, NanStrategy::Median)
    }

    /// Fill missing values with zero, or `"0"` in a text column.
    pub fn apply_zero(series: &Series) -> Result<FillOutcome> {
        let filled = count_missing(series)?;
        if filled == 0 {
            return Ok(FillOutcome::NothingMissing);
        }

        let dtype = series.dtype();
        let result = if is_numeric_dtype(dtype) {
            float_values(series)?.fill_null(FillNullStrategy::Zero)?
        } else if dtype == &DataType::String {
            let zeros = StringChunked::full(series.name().clone(), "0", series.len());
            fill_missing(series, &zeros.into_series())?
        } else {
            return Ok(FillOutcome::Skipped(CleaningWarning::ImputationSkipped {
                column: series.name().to_string(),
                strategy: NanStrategy::Zero,
                reason: format!("zero is not a meaningful {dtype} value"),
            }));
        };

        Ok(FillOutcome::Filled {
            series: result,
            value: "0".to_string(),
            filled,
        })
    }

    fn apply_statistic(series: &Series, strategy: NanStrategy) -> Result<FillOutcome> {
        let filled = count_missing(series)?;
        if filled == 0 {
            return Ok(FillOutcome::NothingMissing);
        }

        let dtype = series.dtype();
        let numeric = is_numeric_dtype(dtype);
        if !numeric && !is_temporal_dtype(dtype) {
            return Ok(FillOutcome::Skipped(CleaningWarning::ImputationSkipped {
                column: series.name().to_string(),
                strategy,
                reason: format!("{strategy} is undefined for {dtype} values"),
            }));
        }

        let values = float_values(series)?;
        let statistic = match strategy {
            NanStrategy::Median => values.median(),
            _ => values.mean(),
        };
        let Some(statistic) = statistic else {
            return Ok(FillOutcome::Skipped(CleaningWarning::UndefinedStatistic {
                column: series.name().to_string(),
                reason: format!("no present values to compute the {strategy} from"),
            }));
        };

        let name = series.name().clone();
        let (result, value) = if numeric {
            let fill = Float64Chunked::full(name, statistic, series.len()).into_series();
            (fill_missing(&values, &fill)?, statistic.to_string())
        } else {
            // Temporal statistics are computed on the physical timestamp.
            let physical = series.to_physical_repr().cast(&DataType::Int64)?;
            let fill = Int64Chunked::full(name, statistic.round() as i64, series.len())
                .into_series();
            let value = fill.cast(dtype)?.get(0)?.to_string();
            let result = fill_missing(&physical, &fill)?.cast(dtype)?;
            (result, value)
        };

        Ok(FillOutcome::Filled {
            series: result,
            value,
            filled,
        })
    }
}

/// Take `fill` wherever `values` is null.
fn fill_missing(values: &Series, fill: &Series) -> PolarsResult<Series> {
    values.zip_with(&values.is_not_null(), fill)
}
