//! Report generation module.
//!
//! Writes the cleaned table as CSV and, optionally, a JSON report of the run.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabscrub::reporting::ReportGenerator;
//!
//! let generator = ReportGenerator::new(PathBuf::from("outputs"), None);
//! let csv_path = generator.write_csv(&mut outcome.data, "prices", false)?;
//!
//! let report = ReportGenerator::build_report(
//!     Path::new("data/prices.csv"),
//!     Some(&csv_path),
//!     pipeline.config(),
//!     &outcome.summary,
//! );
//! generator.write_report(&report, "prices")?;
//! ```

mod generator;

pub use generator::{CleaningReport, INDEX_COLUMN, ReportGenerator};
