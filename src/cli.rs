//! Command-line interface components.

use crate::config::{ImputeConfig, OutputCompression};
use crate::constants::{SHORT_GAP_MAX_LEN, columns};
use crate::imputer::GapImputer;
use crate::imputer::stats::ImputationReport;
use crate::io::{default_output_path, read_observations, write_observations};
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "station-gapfill")]
#[command(about = "Fill missing values in hourly per-station weather observations")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Observation table to process (.csv or .parquet)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file (defaults to <input stem>_imputed.<ext> next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Target variable columns, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [columns::TEMPERATURE.to_string(), columns::HUMIDITY.to_string()])]
    pub columns: Vec<String>,

    /// Timestamp column name
    #[arg(long, default_value = columns::TIMESTAMP)]
    pub timestamp_column: String,

    /// Station identifier column name
    #[arg(long, default_value = columns::STATION)]
    pub station_column: String,

    /// Longest gap filled by interpolation; longer gaps use the climatology
    #[arg(long, default_value_t = SHORT_GAP_MAX_LEN)]
    pub short_gap_max: usize,

    /// Also write the imputation report as JSON
    #[arg(long, value_name = "PATH")]
    pub report_json: Option<PathBuf>,

    /// Parquet compression algorithm (snappy, zstd, lz4, none)
    #[arg(long, default_value = "snappy")]
    pub compression: String,

    /// Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only show errors; no progress or report output
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    pub fn show_progress(&self) -> bool {
        !self.quiet
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input))
    }

    /// Build the imputation configuration from the command line
    pub fn to_config(&self) -> ImputeConfig {
        ImputeConfig::default()
            .with_columns(self.columns.iter().map(|c| c.trim().to_string()))
            .with_timestamp_column(&self.timestamp_column)
            .with_station_column(&self.station_column)
            .with_short_gap_max_len(self.short_gap_max)
            .with_verbose(true)
    }
}

/// Set up structured logging based on CLI arguments
pub fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("station_gapfill={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
}

/// Read, impute and write one observation table
pub fn run(args: Args) -> Result<ImputationReport> {
    let start_time = Instant::now();
    setup_logging(&args);
    debug!("Command line arguments: {:?}", args);

    let compression = OutputCompression::from_name(&args.compression)?;
    let imputer = GapImputer::new(args.to_config())?;
    let output_path = args.output_path();

    let spinner = args.show_progress().then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });
    let set_message = |msg: String| {
        if let Some(pb) = &spinner {
            pb.set_message(msg);
        }
    };

    set_message(format!("Reading {}", args.input.display()));
    let df = read_observations(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    info!(
        "Loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        args.input.display()
    );

    set_message(format!("Imputing {} rows", df.height()));
    let (mut output, report) = imputer.run(&df)?;

    set_message(format!("Writing {}", output_path.display()));
    write_observations(&mut output, &output_path, compression)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    if let Some(pb) = &spinner {
        pb.finish_and_clear();
    }

    if let Some(report_path) = &args.report_json {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(report_path, json)
            .with_context(|| format!("Failed to write report {}", report_path.display()))?;
        info!("Report written to {}", report_path.display());
    }

    if !args.quiet {
        report.print_summary();
        println!(
            "\n{} {} ({})",
            "Saved:".bright_green().bold(),
            output_path.display(),
            HumanDuration(start_time.elapsed())
        );
    }

    Ok(report)
}
