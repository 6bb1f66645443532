//! Shared utilities for the cleaning pipeline.
//!
//! Column-name matching, dtype checks, missing-marker parsing and the small
//! helpers that hand columns to polars aggregations.

use polars::prelude::*;

// =============================================================================
// Column Names
// =============================================================================

/// Canonical form of a column name: trimmed and ASCII lower-cased.
pub fn canonical_column_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Find the first column of `df` whose canonical name matches `name`.
pub fn find_column(df: &DataFrame, name: &str) -> Option<String> {
    let wanted = canonical_column_name(name);
    df.get_column_names()
        .into_iter()
        .find(|col| canonical_column_name(col) == wanted)
        .map(|col| col.to_string())
}

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    is_numeric_dtype(dtype) && !matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType holds dates or timestamps.
#[inline]
pub fn is_temporal_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

/// The dtype every temporal column is normalised to.
pub fn temporal_dtype() -> DataType {
    DataType::Datetime(TimeUnit::Nanoseconds, None)
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 6] = [',', '$', '%', '€', '£', ' '];

/// Text values that mean "no value here".
pub const MISSING_MARKERS: [&str; 8] = ["na", "n/a", "null", "none", "nan", "missing", "#n/a", "-"];

/// Clean a string for numeric parsing by removing formatting characters.
///
/// # Example
///
/// ```rust,ignore
/// use tabscrub::utils::clean_numeric_string;
///
/// assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
/// assert_eq!(clean_numeric_string("  42%  "), "42");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Check if a string is empty or a missing-value marker.
pub fn is_missing_marker(s: &str) -> bool {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lower = trimmed.to_ascii_lowercase();
    MISSING_MARKERS.iter().any(|&marker| lower == marker)
}

/// Try to parse a string as a finite numeric value.
///
/// Handles common formatting like currency symbols, percentages, and thousands separators.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// =============================================================================
// Missing Values
// =============================================================================

/// Per-row missing flags: null anywhere, or NaN in a float column.
pub fn missing_mask(series: &Series) -> PolarsResult<Vec<bool>> {
    let mask = match series.dtype() {
        DataType::Float64 => series
            .f64()?
            .into_iter()
            .map(|v| v.is_none_or(f64::is_nan))
            .collect(),
        DataType::Float32 => series
            .f32()?
            .into_iter()
            .map(|v| v.is_none_or(f32::is_nan))
            .collect(),
        _ => {
            let nulls = series.is_null();
            nulls.into_iter().map(|v| v.unwrap_or(true)).collect()
        }
    };
    Ok(mask)
}

/// Number of missing values in a series.
pub fn count_missing(series: &Series) -> PolarsResult<usize> {
    Ok(missing_mask(series)?.into_iter().filter(|m| *m).count())
}

/// A numeric or temporal series as `Float64`, with NaN turned into null.
///
/// Temporal columns yield their physical integer representation.
pub fn float_values(series: &Series) -> PolarsResult<Series> {
    let floats = series.to_physical_repr().cast(&DataType::Float64)?;
    let ca: Float64Chunked = floats
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(ca.with_name(series.name().clone()).into_series())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_column_name() {
        assert_eq!(canonical_column_name("  Price "), "price");
        assert_eq!(canonical_column_name("DATE"), "date");
    }

    #[test]
    fn test_find_column_case_insensitive() {
        let df = df! {
            "Date" => &["2024-01-01"],
            " PRICE" => &[1.0],
        }
        .unwrap();
        assert_eq!(find_column(&df, "price").as_deref(), Some(" PRICE"));
        assert_eq!(find_column(&df, "date").as_deref(), Some("Date"));
        assert_eq!(find_column(&df, "demand"), None);
    }

    #[test]
    fn test_dtype_checks() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float32));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(is_integer_dtype(&DataType::UInt16));
        assert!(!is_integer_dtype(&DataType::Float64));
        assert!(is_temporal_dtype(&DataType::Date));
        assert!(is_temporal_dtype(&temporal_dtype()));
        assert!(!is_temporal_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_missing_markers() {
        for marker in ["", "  ", "NA", "n/a", "Null", "NaN", "-", "#N/A", "missing"] {
            assert!(is_missing_marker(marker), "{marker:?} should be a marker");
        }
        assert!(!is_missing_marker("0"));
        assert!(!is_missing_marker("Germany"));
    }

    #[test]
    fn test_parse_numeric_string() {
        assert_eq!(parse_numeric_string("42"), Some(42.0));
        assert_eq!(parse_numeric_string("$1,234.56"), Some(1234.56));
        assert_eq!(parse_numeric_string("-100"), Some(-100.0));
        assert_eq!(parse_numeric_string(""), None);
        assert_eq!(parse_numeric_string("inf"), None);
        assert_eq!(parse_numeric_string("hello"), None);
    }

    #[test]
    fn test_missing_mask_treats_nan_as_missing() {
        let series = Series::new("x".into(), &[Some(1.0), None, Some(f64::NAN), Some(4.0)]);
        assert_eq!(missing_mask(&series).unwrap(), vec![false, true, true, false]);
        assert_eq!(count_missing(&series).unwrap(), 2);

        let text = Series::new("t".into(), &[Some("a"), None]);
        assert_eq!(missing_mask(&text).unwrap(), vec![false, true]);
    }

    #[test]
    fn test_float_values_from_integers_and_nan() {
        let ints = Series::new("x".into(), &[Some(1i64), None, Some(3)]);
        let result = float_values(&ints).unwrap();
        assert_eq!(result.dtype(), &DataType::Float64);
        assert_eq!(result.name().as_str(), "x");
        assert_eq!(result.null_count(), 1);

        let with_nan = Series::new("y".into(), &[Some(2.0), Some(f64::NAN), Some(4.0)]);
        let result = float_values(&with_nan).unwrap();
        assert_eq!(result.null_count(), 1);
        assert_eq!(result.mean(), Some(3.0));
    }
}
