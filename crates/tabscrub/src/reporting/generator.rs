use crate::config::CleaningConfig;
use crate::error::{CleaningError, Result, ResultExt};
use crate::types::CleaningSummary;
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the row-ordinal column prepended when the index is exported.
pub const INDEX_COLUMN: &str = "index";

/// Everything known about one cleaning run, for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Path to the input file
    pub input_file: String,
    /// Path to the cleaned output file (if written)
    pub output_file: Option<String>,
    /// The configuration the run used
    pub config: CleaningConfig,
    /// Audit trail and stage reports
    pub summary: CleaningSummary,
}

/// Writes cleaned tables and run reports to an output directory.
pub struct ReportGenerator {
    output_dir: PathBuf,
    output_name: Option<String>,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./outputs"),
            output_name: None,
        }
    }
}

impl ReportGenerator {
    /// Create a new ReportGenerator with custom output settings.
    pub fn new(output_dir: PathBuf, output_name: Option<String>) -> Self {
        Self {
            output_dir,
            output_name,
        }
    }

    /// Path the cleaned CSV is written to.
    ///
    /// Uses the configured output name, or `<input_stem>_cleaned`.
    pub fn csv_path(&self, input_stem: &str) -> PathBuf {
        let file_name = self
            .output_name
            .clone()
            .unwrap_or_else(|| format!("{input_stem}_cleaned"));
        self.output_dir.join(format!("{file_name}.csv"))
    }

    /// Write the cleaned table as CSV.
    ///
    /// With `include_index`, a zero-based `index` column holding each row's
    /// ordinal is written first.
    pub fn write_csv(
        &self,
        df: &mut DataFrame,
        input_stem: &str,
        include_index: bool,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| CleaningError::Io(e).with_context("Creating output directory"))?;

        let output_path = self.csv_path(input_stem);
        let mut file = File::create(&output_path)?;

        let mut indexed;
        let to_write = if include_index {
            indexed = df.with_row_index(INDEX_COLUMN.into(), None)?;
            &mut indexed
        } else {
            df
        };

        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(to_write)
            .context(format!("Writing {}", output_path.display()))?;

        info!("Dataset saved: {}", output_path.display());
        Ok(output_path)
    }

    /// Build the report for a finished run.
    pub fn build_report(
        input_file: &Path,
        output_file: Option<&Path>,
        config: &CleaningConfig,
        summary: &CleaningSummary,
    ) -> CleaningReport {
        CleaningReport {
            generated_at: Local::now().to_rfc3339(),
            input_file: input_file.display().to_string(),
            output_file: output_file.map(|p| p.display().to_string()),
            config: config.clone(),
            summary: summary.clone(),
        }
    }

    /// Write a report as `<report_base_name>_report.json` in the output directory.
    pub fn write_report(&self, report: &CleaningReport, report_base_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self
            .output_dir
            .join(format!("{report_base_name}_report.json"));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());
        Ok(report_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tabscrub-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_csv_path_defaults_to_input_stem() {
        let generator = ReportGenerator::new(PathBuf::from("out"), None);
        assert_eq!(generator.csv_path("prices"), PathBuf::from("out/prices_cleaned.csv"));

        let named = ReportGenerator::new(PathBuf::from("out"), Some("final".to_string()));
        assert_eq!(named.csv_path("prices"), PathBuf::from("out/final.csv"));
    }

    #[test]
    fn test_write_csv_with_index() {
        let dir = scratch_dir("index");
        let generator = ReportGenerator::new(dir.clone(), None);
        let mut df = df! { "price" => &[1.5, 2.5] }.unwrap();

        let path = generator.write_csv(&mut df, "prices", true).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines, vec!["index,price", "0,1.5", "1,2.5"]);
        // the caller's frame is not modified
        assert_eq!(df.width(), 1);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_write_csv_without_index() {
        let dir = scratch_dir("plain");
        let generator = ReportGenerator::new(dir.clone(), Some("clean".to_string()));
        let mut df = df! { "country" => &["DE", "FR"] }.unwrap();

        let path = generator.write_csv(&mut df, "ignored", false).unwrap();
        assert!(path.ends_with("clean.csv"));
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("country\n"));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_write_report_json() {
        let dir = scratch_dir("report");
        let generator = ReportGenerator::new(dir.clone(), None);

        let mut summary = CleaningSummary::new();
        summary.rows_before = 10;
        summary.rows_after = 8;
        let report = ReportGenerator::build_report(
            Path::new("data/prices.csv"),
            Some(Path::new("outputs/prices_cleaned.csv")),
            &CleaningConfig::default(),
            &summary,
        );

        let path = generator.write_report(&report, "prices").unwrap();
        assert!(path.ends_with("prices_report.json"));

        let parsed: CleaningReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.input_file, "data/prices.csv");
        assert_eq!(parsed.summary.rows_after, 8);
        assert_eq!(parsed.config, CleaningConfig::default());
        fs::remove_dir_all(dir).unwrap();
    }
}
