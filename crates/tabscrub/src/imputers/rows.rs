//! Row-level removal: exact duplicates and rows missing a value.

use crate::utils::missing_mask;
use polars::prelude::*;

/// Remove rows identical to an earlier row in every column.
///
/// Nulls compare equal to nulls. The first occurrence is kept and the
/// surviving rows stay in their original order.
pub fn remove_duplicate_rows(df: DataFrame) -> PolarsResult<(DataFrame, usize)> {
    if df.height() < 2 || df.width() == 0 {
        return Ok((df, 0));
    }

    let before = df.height();
    let unique = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
    let removed = before - unique.height();
    Ok((unique, removed))
}

/// Remove every row where `column` is missing (null, or NaN in a float column).
pub fn drop_missing_rows(df: DataFrame, column: &str) -> PolarsResult<(DataFrame, usize)> {
    let missing = missing_mask(df.column(column)?.as_materialized_series())?;
    let removed = missing.iter().filter(|m| **m).count();
    if removed == 0 {
        return Ok((df, 0));
    }

    let keep: Vec<bool> = missing.into_iter().map(|m| !m).collect();
    let mask = BooleanChunked::from_slice("present".into(), &keep);
    Ok((df.filter(&mask)?, removed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices(df: &DataFrame) -> Vec<Option<f64>> {
        df.column("price")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_remove_duplicates_keeps_first_in_order() {
        let df = df! {
            "price" => &[Some(3.0), Some(1.0), Some(3.0), None, None, Some(2.0)],
            "country" => &["DE", "FR", "DE", "IT", "IT", "DE"],
        }
        .unwrap();

        let (df, removed) = remove_duplicate_rows(df).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(prices(&df), vec![Some(3.0), Some(1.0), None, Some(2.0)]);
    }

    #[test]
    fn test_remove_duplicates_requires_every_column_equal() {
        let df = df! {
            "price" => &[1.0, 1.0],
            "country" => &["DE", "FR"],
        }
        .unwrap();

        let (df, removed) = remove_duplicate_rows(df).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_null_differs_from_null_string() {
        let df = df! { "country" => &[None, Some("null")] }.unwrap();
        let (df, removed) = remove_duplicate_rows(df).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_nearly_equal_floats_are_distinct() {
        let df = df! {
            "price" => &[1_000_001.0, 1_000_002.0, 12.0000001, 12.0000002],
        }
        .unwrap();

        let (df, removed) = remove_duplicate_rows(df).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(
            prices(&df),
            vec![Some(1_000_001.0), Some(1_000_002.0), Some(12.0000001), Some(12.0000002)]
        );
    }

    #[test]
    fn test_control_characters_do_not_merge_rows() {
        let df = df! {
            "a" => &["x\u{1f}y", "x"],
            "b" => &["z", "y\u{1f}z"],
        }
        .unwrap();

        let (df, removed) = remove_duplicate_rows(df).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_drop_missing_rows() {
        let df = df! {
            "price" => &[Some(1.0), None, Some(f64::NAN), Some(4.0)],
        }
        .unwrap();

        let (df, removed) = drop_missing_rows(df, "price").unwrap();
        assert_eq!(removed, 2);
        assert_eq!(prices(&df), vec![Some(1.0), Some(4.0)]);
    }

    #[test]
    fn test_drop_missing_rows_unknown_column() {
        let df = df! { "price" => &[1.0] }.unwrap();
        assert!(drop_missing_rows(df, "demand").is_err());
    }
}
