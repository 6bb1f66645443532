//! Column coercion to the declared semantic types.
//!
//! Each converter is all-or-nothing: either every present value converts, or
//! the caller gets [`Coercion::Failed`] with the first offending value and the
//! column is left as it was.

use crate::utils::{
    clean_numeric_string, is_integer_dtype, is_missing_marker, is_numeric_dtype,
    is_temporal_dtype, parse_numeric_string, temporal_dtype,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

/// Outcome of converting one column.
#[derive(Debug)]
pub(crate) enum Coercion {
    /// The converted series, plus how many marker strings became null.
    Converted { series: Series, nulled_markers: usize },
    /// The column cannot be represented in the target type.
    Failed(String),
}

/// How a recognised date shape is parsed.
#[derive(Debug, Clone, Copy)]
enum DateShape {
    Date(&'static str),
    DateTime(&'static str),
    Rfc3339,
}

static DATE_SHAPES: Lazy<Vec<(Regex, DateShape)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}$").expect("Invalid regex: YYYY-MM-DD"),
            DateShape::Date("%Y-%m-%d"),
        ),
        (
            Regex::new(r"^\d{4}/\d{1,2}/\d{1,2}$").expect("Invalid regex: YYYY/MM/DD"),
            DateShape::Date("%Y/%m/%d"),
        ),
        (
            Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").expect("Invalid regex: MM/DD/YYYY"),
            DateShape::Date("%m/%d/%Y"),
        ),
        (
            Regex::new(r"^\d{1,2}\.\d{1,2}\.\d{4}$").expect("Invalid regex: DD.MM.YYYY"),
            DateShape::Date("%d.%m.%Y"),
        ),
        (
            Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})$")
                .expect("Invalid regex: RFC 3339"),
            DateShape::Rfc3339,
        ),
        (
            Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?$")
                .expect("Invalid regex: ISO datetime"),
            DateShape::DateTime("%Y-%m-%dT%H:%M:%S%.f"),
        ),
        (
            Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(\.\d+)?$")
                .expect("Invalid regex: datetime"),
            DateShape::DateTime("%Y-%m-%d %H:%M:%S%.f"),
        ),
        (
            Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}$").expect("Invalid regex: ISO minutes"),
            DateShape::DateTime("%Y-%m-%dT%H:%M"),
        ),
        (
            Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}$").expect("Invalid regex: minutes"),
            DateShape::DateTime("%Y-%m-%d %H:%M"),
        ),
    ]
});

// Plausible Unix epoch ranges (roughly 2001 to 2033).
const EPOCH_SECONDS: std::ops::Range<i64> = 1_000_000_000..2_000_000_000;
const EPOCH_MILLIS: std::ops::Range<i64> = 1_000_000_000_000..2_000_000_000_000;

/// Parse a single date or date-time string to nanoseconds since the epoch.
pub(crate) fn parse_datetime_nanos(value: &str) -> Option<i64> {
    let trimmed = value.trim();

    if let Ok(raw) = trimmed.parse::<i64>() {
        return epoch_to_nanos(raw);
    }

    let (_, shape) = DATE_SHAPES.iter().find(|(re, _)| re.is_match(trimmed))?;
    match shape {
        DateShape::Date(fmt) => NaiveDate::parse_from_str(trimmed, fmt)
            .ok()?
            .and_hms_opt(0, 0, 0)?
            .and_utc()
            .timestamp_nanos_opt(),
        DateShape::DateTime(fmt) => NaiveDateTime::parse_from_str(trimmed, fmt)
            .ok()?
            .and_utc()
            .timestamp_nanos_opt(),
        DateShape::Rfc3339 => DateTime::parse_from_rfc3339(trimmed)
            .ok()?
            .timestamp_nanos_opt(),
    }
}

/// Interpret an integer as Unix seconds or milliseconds, as nanoseconds.
fn epoch_to_nanos(raw: i64) -> Option<i64> {
    if EPOCH_SECONDS.contains(&raw) {
        raw.checked_mul(1_000_000_000)
    } else if EPOCH_MILLIS.contains(&raw) {
        raw.checked_mul(1_000_000)
    } else {
        None
    }
}

/// Convert a column to `Float64`.
pub(crate) fn to_float(series: &Series) -> PolarsResult<Coercion> {
    let dtype = series.dtype();

    if is_temporal_dtype(dtype) {
        return Ok(Coercion::Failed(format!(
            "{dtype} values cannot be represented as float"
        )));
    }

    if dtype == &DataType::String {
        let str_series = series.str()?;
        let mut result_vec: Vec<Option<f64>> = Vec::with_capacity(str_series.len());
        let mut nulled_markers = 0;

        for (row, opt_val) in str_series.into_iter().enumerate() {
            match opt_val {
                Some(val) if is_missing_marker(val) => {
                    nulled_markers += 1;
                    result_vec.push(None);
                }
                Some(val) => match parse_numeric_string(val) {
                    Some(v) => result_vec.push(Some(v)),
                    None => {
                        return Ok(Coercion::Failed(format!(
                            "value '{val}' at row {row} is not numeric (cleaned: '{}')",
                            clean_numeric_string(val)
                        )));
                    }
                },
                None => result_vec.push(None),
            }
        }

        return Ok(Coercion::Converted {
            series: Series::new(series.name().clone(), result_vec),
            nulled_markers,
        });
    }

    if is_numeric_dtype(dtype) || matches!(dtype, DataType::Boolean | DataType::Null) {
        let floats = series.cast(&DataType::Float64)?;
        let result_vec: Vec<Option<f64>> = floats
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        return Ok(Coercion::Converted {
            series: Series::new(series.name().clone(), result_vec),
            nulled_markers: 0,
        });
    }

    Ok(Coercion::Failed(format!("{dtype} values cannot be represented as float")))
}

/// Convert a column to `Datetime(ns)`.
pub(crate) fn to_temporal(series: &Series) -> PolarsResult<Coercion> {
    let target = temporal_dtype();
    let dtype = series.dtype();

    match dtype {
        DataType::Datetime(TimeUnit::Nanoseconds, _) => Ok(Coercion::Converted {
            series: series.clone(),
            nulled_markers: 0,
        }),
        DataType::Datetime(_, tz) => Ok(Coercion::Converted {
            series: series.cast(&DataType::Datetime(TimeUnit::Nanoseconds, tz.clone()))?,
            nulled_markers: 0,
        }),
        DataType::Date | DataType::Null => Ok(Coercion::Converted {
            series: series.cast(&target)?,
            nulled_markers: 0,
        }),
        DataType::String => {
            let str_series = series.str()?;
            let mut nanos: Vec<Option<i64>> = Vec::with_capacity(str_series.len());
            let mut nulled_markers = 0;

            for (row, opt_val) in str_series.into_iter().enumerate() {
                match opt_val {
                    Some(val) if is_missing_marker(val) => {
                        nulled_markers += 1;
                        nanos.push(None);
                    }
                    Some(val) => match parse_datetime_nanos(val) {
                        Some(ns) => nanos.push(Some(ns)),
                        None => {
                            return Ok(Coercion::Failed(format!(
                                "value '{val}' at row {row} is not a recognised date"
                            )));
                        }
                    },
                    None => nanos.push(None),
                }
            }

            Ok(Coercion::Converted {
                series: Series::new(series.name().clone(), nanos).cast(&target)?,
                nulled_markers,
            })
        }
        dtype if is_integer_dtype(dtype) => {
            let ints = series.cast(&DataType::Int64)?;
            let mut nanos: Vec<Option<i64>> = Vec::with_capacity(ints.len());

            for (row, opt_val) in ints.i64()?.into_iter().enumerate() {
                match opt_val {
                    Some(raw) => match epoch_to_nanos(raw) {
                        Some(ns) => nanos.push(Some(ns)),
                        None => {
                            return Ok(Coercion::Failed(format!(
                                "integer {raw} at row {row} is not a plausible Unix timestamp"
                            )));
                        }
                    },
                    None => nanos.push(None),
                }
            }

            Ok(Coercion::Converted {
                series: Series::new(series.name().clone(), nanos).cast(&target)?,
                nulled_markers: 0,
            })
        }
        other => Ok(Coercion::Failed(format!(
            "{other} values cannot be represented as dates"
        ))),
    }
}

/// Convert a column to `String`.
pub(crate) fn to_text(series: &Series) -> PolarsResult<Coercion> {
    if series.dtype() == &DataType::String {
        return Ok(Coercion::Converted {
            series: series.clone(),
            nulled_markers: 0,
        });
    }

    match series.cast(&DataType::String) {
        Ok(series) => Ok(Coercion::Converted {
            series,
            nulled_markers: 0,
        }),
        Err(e) => Ok(Coercion::Failed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converted(coercion: Coercion) -> (Series, usize) {
        match coercion {
            Coercion::Converted {
                series,
                nulled_markers,
            } => (series, nulled_markers),
            Coercion::Failed(reason) => panic!("expected conversion, got failure: {reason}"),
        }
    }

    fn floats(series: &Series) -> Vec<Option<f64>> {
        series.f64().unwrap().into_iter().collect()
    }

    // ========================================================================
    // to_float() tests
    // ========================================================================

    #[test]
    fn test_to_float_from_strings_with_markers() {
        let series = Series::new(
            "price".into(),
            &[Some("1.5"), Some("$1,200"), Some("NA"), None, Some(""), Some("-")],
        );
        let (result, nulled) = converted(to_float(&series).unwrap());

        assert_eq!(result.dtype(), &DataType::Float64);
        assert_eq!(
            floats(&result),
            vec![Some(1.5), Some(1200.0), None, None, None, None]
        );
        assert_eq!(nulled, 3);
    }

    #[test]
    fn test_to_float_is_all_or_nothing() {
        let series = Series::new("price".into(), &["1.0", "2.0", "cheap"]);
        match to_float(&series).unwrap() {
            Coercion::Failed(reason) => assert!(reason.contains("cheap")),
            Coercion::Converted { .. } => panic!("mixed column must not convert"),
        }
    }

    #[test]
    fn test_to_float_from_integers_and_nan() {
        let ints = Series::new("n".into(), &[1i64, 2, 3]);
        let (result, _) = converted(to_float(&ints).unwrap());
        assert_eq!(floats(&result), vec![Some(1.0), Some(2.0), Some(3.0)]);

        let with_nan = Series::new("n".into(), &[1.0, f64::NAN]);
        let (result, _) = converted(to_float(&with_nan).unwrap());
        assert_eq!(floats(&result), vec![Some(1.0), None]);
    }

    #[test]
    fn test_to_float_from_bool() {
        let series = Series::new("flag".into(), &[true, false]);
        let (result, _) = converted(to_float(&series).unwrap());
        assert_eq!(floats(&result), vec![Some(1.0), Some(0.0)]);
    }

    #[test]
    fn test_to_float_rejects_dates() {
        let series = Series::new("d".into(), &[0i64])
            .cast(&temporal_dtype())
            .unwrap();
        assert!(matches!(to_float(&series).unwrap(), Coercion::Failed(_)));
    }

    // ========================================================================
    // to_temporal() tests
    // ========================================================================

    #[test]
    fn test_parse_datetime_formats() {
        let midnight = 1_704_067_200_000_000_000i64; // 2024-01-01T00:00:00Z
        assert_eq!(parse_datetime_nanos("2024-01-01"), Some(midnight));
        assert_eq!(parse_datetime_nanos("2024/01/01"), Some(midnight));
        assert_eq!(parse_datetime_nanos("01/01/2024"), Some(midnight));
        assert_eq!(parse_datetime_nanos("01.01.2024"), Some(midnight));
        assert_eq!(parse_datetime_nanos("2024-01-01T00:00:00"), Some(midnight));
        assert_eq!(parse_datetime_nanos("2024-01-01 00:00"), Some(midnight));
        assert_eq!(
            parse_datetime_nanos("2024-01-01 00:00:01.5"),
            Some(midnight + 1_500_000_000)
        );
        assert_eq!(parse_datetime_nanos("2024-01-01T01:00:00+01:00"), Some(midnight));
        assert_eq!(parse_datetime_nanos("2024-01-01T00:00:00Z"), Some(midnight));
    }

    #[test]
    fn test_parse_datetime_rejects_garbage() {
        assert_eq!(parse_datetime_nanos("yesterday"), None);
        assert_eq!(parse_datetime_nanos("2024-13-01"), None);
        assert_eq!(parse_datetime_nanos("42"), None);
    }

    #[test]
    fn test_parse_epoch_values() {
        assert_eq!(
            parse_datetime_nanos("1704067200"),
            Some(1_704_067_200_000_000_000)
        );
        assert_eq!(
            parse_datetime_nanos("1704067200000"),
            Some(1_704_067_200_000_000_000)
        );
    }

    #[test]
    fn test_to_temporal_from_strings() {
        let series = Series::new("date".into(), &[Some("2024-01-01"), Some("n/a"), None]);
        let (result, nulled) = converted(to_temporal(&series).unwrap());

        assert_eq!(result.dtype(), &temporal_dtype());
        assert_eq!(result.null_count(), 2);
        assert_eq!(nulled, 1);
    }

    #[test]
    fn test_to_temporal_is_all_or_nothing() {
        let series = Series::new("date".into(), &["2024-01-01", "soon"]);
        assert!(matches!(to_temporal(&series).unwrap(), Coercion::Failed(_)));
    }

    #[test]
    fn test_to_temporal_from_epoch_integers() {
        let series = Series::new("ts".into(), &[1_704_067_200i64, 1_704_067_200_000]);
        let (result, _) = converted(to_temporal(&series).unwrap());
        assert_eq!(result.dtype(), &temporal_dtype());
        assert_eq!(result.n_unique().unwrap(), 1);

        let small = Series::new("ts".into(), &[1i64, 2]);
        assert!(matches!(to_temporal(&small).unwrap(), Coercion::Failed(_)));
    }

    #[test]
    fn test_to_temporal_widens_datetime_precision() {
        let series = Series::new("ts".into(), &[1_704_067_200_000i64])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let (result, _) = converted(to_temporal(&series).unwrap());
        assert_eq!(result.dtype(), &temporal_dtype());
    }

    #[test]
    fn test_to_temporal_rejects_floats() {
        let series = Series::new("x".into(), &[1.5f64]);
        assert!(matches!(to_temporal(&series).unwrap(), Coercion::Failed(_)));
    }

    // ========================================================================
    // to_text() tests
    // ========================================================================

    #[test]
    fn test_to_text_casts_numbers() {
        let series = Series::new("country".into(), &[1i64, 2]);
        let (result, _) = converted(to_text(&series).unwrap());
        assert_eq!(result.dtype(), &DataType::String);
        assert_eq!(result.str().unwrap().get(0), Some("1"));
    }

    #[test]
    fn test_to_text_keeps_strings() {
        let series = Series::new("country".into(), &[Some("DE"), None]);
        let (result, nulled) = converted(to_text(&series).unwrap());
        assert_eq!(result.null_count(), 1);
        assert_eq!(nulled, 0);
    }
}
