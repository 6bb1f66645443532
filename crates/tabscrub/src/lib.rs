//! # tabscrub
//!
//! Configuration-driven cleaning for tabular data held in a polars
//! [`DataFrame`](polars::prelude::DataFrame).
//!
//! A run passes one table through three stages, strictly in order:
//!
//! 1. **Schema enforcement**: keep only the required columns (matched
//!    case-insensitively), fail if any is missing, coerce each to its
//!    declared type.
//! 2. **Missing values**: drop exact-duplicate rows, then apply a per-column
//!    strategy (`drop`, `mean`, `median`, `zero`) in configuration order.
//! 3. **Outliers**: flag values whose population z-score exceeds a per-column
//!    threshold and replace each with the last non-outlier value above it.
//!
//! Every stage reports what it did. Conditions a stage can recover from
//! (a column that won't coerce, a statistic that is undefined) become
//! [`CleaningWarning`]s rather than errors.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use polars::prelude::*;
//! use tabscrub::{CleaningConfig, NanStrategy, Pipeline, SemanticType};
//!
//! let df = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .try_into_reader_with_file_path(Some("electricity.csv".into()))?
//!     .finish()?;
//!
//! let config = CleaningConfig::builder()
//!     .column("date", SemanticType::Temporal)
//!     .column("price", SemanticType::Float)
//!     .nan_strategy("price", NanStrategy::Drop)
//!     .outlier_threshold("price", 4.0)
//!     .build()?;
//!
//! let outcome = Pipeline::builder().config(config).build()?.run(df)?;
//!
//! println!("Rows: {} -> {}", outcome.summary.rows_before, outcome.summary.rows_after);
//! println!("Outliers replaced: {}", outcome.summary.outliers_replaced);
//! ```
//!
//! The stages can also be used on their own through [`SchemaEnforcer`],
//! [`MissingValueResolver`] and [`OutlierSubstitution`].

pub mod config;
pub mod error;
pub mod imputers;
pub mod pipeline;
pub mod reporting;
pub mod schema;
pub mod types;
pub mod utils;

pub use config::{CleaningConfig, CleaningConfigBuilder, ConfigFields, ConfigValidationError};
pub use error::{CleaningError, CleaningWarning, Result, ResultExt};
pub use pipeline::{
    CleaningOutcome, CleaningStage, ClosureProgressReporter, MissingValueResolver,
    OutlierSubstitution, Pipeline, PipelineBuilder, ProgressReporter, ProgressUpdate,
};
pub use reporting::{CleaningReport, ReportGenerator};
pub use schema::SchemaEnforcer;
pub use types::{
    ActionType, CleaningAction, CleaningSummary, ColumnSummary, MissingValueReport, NanStrategy,
    OutlierReport, SchemaReport, SemanticType,
};
