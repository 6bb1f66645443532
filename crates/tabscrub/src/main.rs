//! CLI entry point for tabscrub.

use anyhow::{Result, anyhow};
use clap::Parser;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tabscrub::{
    CleaningConfig, CleaningOutcome, CleaningReport, ConfigFields, Pipeline, ReportGenerator,
};
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Configuration-driven cleaning for tabular data",
    long_about = "Selects and type-checks the required columns of a CSV file, removes \
                  duplicate rows, resolves missing values per column and replaces z-score \
                  outliers with the last valid value.\n\n\
                  EXAMPLES:\n  \
                  # Clean with the built-in defaults\n  \
                  tabscrub -i electricity.csv\n\n  \
                  # Load a config file, override one field, write a report\n  \
                  tabscrub -i data.csv -c cleaning.json --nan-value-handler 'price=median' -r\n\n  \
                  # Show the effective configuration\n  \
                  tabscrub -i data.csv --print-config"
)]
struct Args {
    /// Path to the CSV file to clean
    #[arg(short, long)]
    input: String,

    /// Output directory for results
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// Custom output file name (without extension)
    ///
    /// If not specified, uses "<input_name>_cleaned"
    #[arg(long)]
    output_name: Option<String>,

    /// JSON configuration file
    ///
    /// If not specified, the built-in defaults are used
    #[arg(short, long)]
    config: Option<String>,

    /// Required columns, e.g. "date, price" or '["date", "price"]'
    #[arg(long)]
    required_columns: Option<String>,

    /// Column types matching --required-columns, e.g. "datetime, float"
    #[arg(long)]
    columns_dtype: Option<String>,

    /// Missing-value strategy per column, e.g. "price=drop, demand=mean"
    #[arg(long)]
    nan_value_handler: Option<String>,

    /// Z-score threshold per column, e.g. "price=4"
    #[arg(long)]
    outliers_zscore_threshold: Option<String>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Write the row index as the first column of the cleaned CSV
    #[arg(long)]
    write_index: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Write a detailed JSON report to the output directory
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    let config = load_config(&args)?;

    if args.print_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    let input = Path::new(&args.input);
    if !input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }
    let is_csv = input
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(anyhow!(
            "Unsupported input format: {} (only .csv files are supported)",
            args.input
        ));
    }

    info!("Loading dataset from: {}", args.input);
    let data = load_csv_with_fallbacks(&args.input)?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    let mut builder = Pipeline::builder().config(config);
    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }
    let pipeline = builder.build()?;

    match pipeline.run(data) {
        Ok(outcome) => handle_pipeline_output(outcome, &pipeline, &args),
        Err(e) => {
            error!("Pipeline failed: {}", e);
            Err(anyhow!("Pipeline failed: {}", e))
        }
    }
}

/// Build the effective configuration: defaults or `--config`, then any
/// per-field overrides from the command line.
fn load_config(args: &Args) -> Result<CleaningConfig> {
    let base = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            CleaningConfig::from_json_file(path)?
        }
        None => CleaningConfig::default(),
    };

    let overrides = [
        &args.required_columns,
        &args.columns_dtype,
        &args.nan_value_handler,
        &args.outliers_zscore_threshold,
    ];
    if overrides.iter().all(|o| o.is_none()) {
        return Ok(base);
    }

    let mut fields = ConfigFields::from_config(&base);
    if let Some(text) = &args.required_columns {
        fields.required_columns = text.clone();
    }
    if let Some(text) = &args.columns_dtype {
        fields.columns_dtype = text.clone();
    }
    if let Some(text) = &args.nan_value_handler {
        fields.nan_value_handler = text.clone();
    }
    if let Some(text) = &args.outliers_zscore_threshold {
        fields.outliers_zscore_threshold = text.clone();
    }
    debug!(?fields, "Applying configuration overrides");

    Ok(fields.parse()?)
}

/// Handle pipeline output based on CLI flags.
///
/// Output behavior:
/// - Default: Print human-readable summary to stdout
/// - `--json`: Print JSON to stdout only (no logs)
/// - `--emit-report`: Write JSON report to file
fn handle_pipeline_output(
    mut outcome: CleaningOutcome,
    pipeline: &Pipeline,
    args: &Args,
) -> Result<()> {
    let input_stem = extract_file_stem(&args.input);
    let generator = ReportGenerator::new(PathBuf::from(&args.output), args.output_name.clone());

    let csv_path = generator.write_csv(&mut outcome.data, &input_stem, args.write_index)?;

    let report = ReportGenerator::build_report(
        Path::new(&args.input),
        Some(&csv_path),
        pipeline.config(),
        &outcome.summary,
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if args.emit_report {
        let report_path = generator.write_report(&report, &input_stem)?;
        info!("Report written to: {}", report_path.display());
    }

    print_human_readable_summary(&report);
    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

/// Print a human-readable summary of the cleaning run.
fn print_human_readable_summary(report: &CleaningReport) {
    let summary = &report.summary;

    println!("\n{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}\n", "=".repeat(80));

    println!("  Input:  {}", report.input_file);
    if let Some(output) = &report.output_file {
        println!("  Output: {}", output);
    }
    println!();

    println!("DATASET");
    println!("{}", "-".repeat(40));
    println!(
        "  Rows:    {} -> {} ({} removed, {:.1}%)",
        summary.rows_before,
        summary.rows_after,
        summary.rows_removed,
        summary.rows_removed_percentage()
    );
    println!(
        "  Columns: {} -> {} ({} removed)",
        summary.columns_before, summary.columns_after, summary.columns_removed
    );
    println!(
        "  Duplicates removed: {}",
        summary.missing_values.duplicates_removed
    );
    println!("  Outliers replaced:  {}", summary.outliers_replaced);
    println!("  Duration: {} ms", summary.duration_ms);
    println!();

    println!("COLUMNS");
    println!("{}", "-".repeat(40));
    println!(
        "{:<20} {:<10} {:<22} {:<8} {:<8} {:<8} {:<8}",
        "Column", "Declared", "Final type", "Strategy", "Filled", "Dropped", "Outliers"
    );
    println!("{}", "-".repeat(90));
    for column in &summary.column_summaries {
        println!(
            "{:<20} {:<10} {:<22} {:<8} {:<8} {:<8} {:<8}",
            truncate_str(&column.name, 19),
            column.declared_type.as_str(),
            truncate_str(&column.final_type, 21),
            column.nan_strategy.map(|s| s.as_str()).unwrap_or("-"),
            column.values_imputed,
            column.rows_dropped,
            column.outliers_replaced
        );
    }
    println!();

    if !summary.actions.is_empty() {
        println!("ACTIONS");
        println!("{}", "-".repeat(40));
        for action in &summary.actions {
            match &action.details {
                Some(details) => println!(
                    "  [{}] {}: {} ({})",
                    action.action_type.display_name(),
                    action.target,
                    action.description,
                    details
                ),
                None => println!(
                    "  [{}] {}: {}",
                    action.action_type.display_name(),
                    action.target,
                    action.description
                ),
            }
        }
        println!();
    }

    if !summary.warnings.is_empty() {
        println!("WARNINGS");
        println!("{}", "-".repeat(40));
        for warning in &summary.warnings {
            println!("  - {}", warning);
        }
        println!();
    }

    println!("{}", "=".repeat(80));
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Load a CSV file, retrying with looser settings if the first read fails.
///
/// Tries `"`-quoted fields, then no quoting, then a pre-cleaned copy of the
/// text with full schema inference.
fn load_csv_with_fallbacks(path: &str) -> Result<DataFrame> {
    for quote_char in [Some(b'"'), None] {
        let attempt = CsvReadOptions::default()
            .with_infer_schema_length(Some(100))
            .with_has_header(true)
            .with_parse_options(CsvParseOptions::default().with_quote_char(quote_char))
            .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
            .finish();
        match attempt {
            Ok(df) => return Ok(df),
            Err(e) => debug!(quoted = quote_char.is_some(), "CSV read failed: {}", e),
        }
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        error!("Could not read file: {}", e);
        anyhow!("Could not read {}: {}", path, e)
    })?;
    let cursor = std::io::Cursor::new(clean_csv_content(&content));

    CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .into_reader_with_file_handle(cursor)
        .finish()
        .map_err(|e| anyhow!("Failed to parse {} as CSV: {}", path, e))
}

/// Collapse doubled quotes and drop blank lines.
fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
