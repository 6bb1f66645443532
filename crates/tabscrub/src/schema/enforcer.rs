//! Required-column selection and type coercion.

use super::converters::{Coercion, to_float, to_temporal, to_text};
use crate::config::CleaningConfig;
use crate::error::{CleaningError, CleaningWarning, Result, ResultExt};
use crate::types::{ColumnCoercion, SchemaReport, SemanticType};
use crate::utils::canonical_column_name;
use polars::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Reduces a table to the configured columns and coerces their types.
pub struct SchemaEnforcer;

impl SchemaEnforcer {
    /// Select the required columns, in configuration order, and coerce each
    /// one to its declared type.
    ///
    /// Input column names are matched after trimming and lower-casing. The
    /// output columns are named exactly as written in the configuration; every
    /// other input column is dropped. Rows are never removed.
    ///
    /// # Errors
    ///
    /// [`CleaningError::Schema`] naming every required column the input lacks.
    /// A column that cannot be coerced is not an error: it keeps its original
    /// dtype and a [`CleaningWarning::TypeCoercion`] is recorded.
    pub fn enforce(df: DataFrame, config: &CleaningConfig) -> Result<(DataFrame, SchemaReport)> {
        let mut report = SchemaReport::default();

        // First input column wins when two canonicalise to the same name.
        let mut by_canonical: HashMap<String, String> = HashMap::new();
        for name in df.get_column_names() {
            by_canonical
                .entry(canonical_column_name(name))
                .or_insert_with(|| name.to_string());
        }

        let missing: Vec<String> = config
            .required_columns
            .iter()
            .filter(|name| !by_canonical.contains_key(&canonical_column_name(name)))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(CleaningError::Schema { missing });
        }

        let selected: Vec<(&str, &str, SemanticType)> = config
            .columns()
            .filter_map(|(required, dtype)| {
                by_canonical
                    .get(&canonical_column_name(required))
                    .map(|input| (required, input.as_str(), dtype))
            })
            .collect();

        report.dropped_columns = df
            .get_column_names()
            .into_iter()
            .filter(|name| !selected.iter().any(|(_, input, _)| *input == name.as_str()))
            .map(|name| name.to_string())
            .collect();
        for dropped in &report.dropped_columns {
            debug!(column = %dropped, "Dropping column not in required set");
        }

        let mut columns = Vec::with_capacity(selected.len());
        for (required, input, dtype) in selected {
            let mut series = df
                .column(input)?
                .as_materialized_series()
                .clone();
            series.rename(required.into());

            if input != required {
                report
                    .renamed_columns
                    .push((input.to_string(), required.to_string()));
            }

            let series = Self::coerce_column(series, dtype, &mut report)
                .context(format!("Coercing column '{required}' to {dtype}"))?;
            columns.push(series.into_column());
        }

        let result = DataFrame::new(columns)?;

        info!(
            kept = result.width(),
            dropped = report.dropped_columns.len(),
            coerced = report.coerced_columns.len(),
            failed = report.warnings.len(),
            "Schema enforced"
        );

        Ok((result, report))
    }

    fn coerce_column(
        series: Series,
        dtype: SemanticType,
        report: &mut SchemaReport,
    ) -> Result<Series> {
        let from_dtype = series.dtype().clone();

        let coercion = match dtype {
            SemanticType::Float => to_float(&series)?,
            SemanticType::Temporal => to_temporal(&series)?,
            SemanticType::Text => to_text(&series)?,
        };

        match coercion {
            Coercion::Converted {
                series: converted,
                nulled_markers,
            } => {
                if converted.dtype() != &from_dtype || nulled_markers > 0 {
                    debug!(
                        column = %converted.name(),
                        from = %from_dtype,
                        to = %converted.dtype(),
                        nulled_markers,
                        "Column coerced"
                    );
                    report.coerced_columns.push(ColumnCoercion {
                        column: converted.name().to_string(),
                        from_dtype: from_dtype.to_string(),
                        to: dtype,
                        nulled_markers,
                    });
                }
                Ok(converted)
            }
            Coercion::Failed(reason) => {
                let warning = CleaningWarning::TypeCoercion {
                    column: series.name().to_string(),
                    target: dtype,
                    reason,
                };
                warn!("{warning}");
                report.warnings.push(warning);
                Ok(series)
            }
        }
    }
}
