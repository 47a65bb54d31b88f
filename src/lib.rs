//! Station Gapfill Library
//!
//! Fills missing values in hourly weather observation tables that hold
//! many stations and several variables.
//!
//! This library provides tools for:
//! - Detecting runs of missing values per station and variable
//! - Filling short runs with a not-a-knot cubic spline (linear fallback)
//! - Filling long runs from a same-calendar-hour climatology, falling back
//!   to the station mean and then the dataset mean
//! - Reporting missing counts, method usage and gap lengths
//! - Reading and writing observation tables as CSV or Parquet

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod imputer;
pub mod io;
pub mod models;

pub use config::{ImputeConfig, OutputCompression};
pub use error::{GapfillError, Result};
pub use imputer::stats::ImputationReport;
pub use imputer::{GapImputer, ImputeOutput, impute_missing_values};
pub use models::{ClimatologyKey, FallbackLevel, Gap, ImputationMethod};
