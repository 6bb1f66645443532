//! Missing-value handling primitives.
//!
//! - Statistical imputation (mean, median, zero)
//! - Row removal (exact duplicates, rows missing a value)

mod rows;
mod statistical;

pub use rows::{drop_missing_rows, remove_duplicate_rows};
pub use statistical::{FillOutcome, StatisticalImputer};
