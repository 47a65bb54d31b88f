//! Configuration management and validation.
//!
//! Provides the imputation configuration (target columns, column name
//! resolution, gap routing threshold, verbosity) and the Parquet output
//! compression setting used by the I/O helpers.

use crate::constants::{DEFAULT_TARGET_COLUMNS, SHORT_GAP_MAX_LEN, columns};
use crate::error::{GapfillError, Result};
use polars::prelude::ParquetCompression;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Supported compression algorithms for parquet output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputCompression {
    /// Snappy compression - good balance of speed and compression
    #[default]
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl OutputCompression {
    /// Parse a compression name as accepted on the command line
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "snappy" => Ok(Self::Snappy),
            "zstd" => Ok(Self::Zstd),
            "lz4" => Ok(Self::Lz4),
            "none" | "uncompressed" => Ok(Self::Uncompressed),
            other => Err(GapfillError::configuration(format!(
                "unknown compression '{}' (expected snappy, zstd, lz4 or none)",
                other
            ))),
        }
    }

    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            OutputCompression::Snappy => ParquetCompression::Snappy,
            OutputCompression::Zstd => ParquetCompression::Zstd(None),
            OutputCompression::Lz4 => ParquetCompression::Lz4Raw,
            OutputCompression::Uncompressed => ParquetCompression::Uncompressed,
        }
    }
}

/// Configuration for a missing-value imputation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputeConfig {
    /// Target variable columns, processed in this order
    pub columns: Vec<String>,

    /// Preferred timestamp column name
    pub timestamp_column: String,

    /// Timestamp column used when the preferred one is absent
    pub timestamp_fallback: String,

    /// Preferred station identifier column name
    pub station_column: String,

    /// Station column used when the preferred one is absent
    pub station_fallback: String,

    /// Optional integer hour column overriding the timestamp's hour in climatology keys
    pub hour_column: Option<String>,

    /// Gaps up to this length are interpolated, longer ones use climatology
    pub short_gap_max_len: usize,

    /// Return the imputation report alongside the table
    pub verbose: bool,
}

impl Default for ImputeConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_TARGET_COLUMNS.iter().map(|c| c.to_string()).collect(),
            timestamp_column: columns::TIMESTAMP.to_string(),
            timestamp_fallback: columns::TIMESTAMP_FALLBACK.to_string(),
            station_column: columns::STATION.to_string(),
            station_fallback: columns::STATION_FALLBACK.to_string(),
            hour_column: Some(columns::HOUR.to_string()),
            short_gap_max_len: SHORT_GAP_MAX_LEN,
            verbose: true,
        }
    }
}

impl ImputeConfig {
    /// Set the target variable columns
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the preferred timestamp column name
    pub fn with_timestamp_column(mut self, name: impl Into<String>) -> Self {
        self.timestamp_column = name.into();
        self
    }

    /// Set the preferred station column name
    pub fn with_station_column(mut self, name: impl Into<String>) -> Self {
        self.station_column = name.into();
        self
    }

    /// Set the hour override column name
    pub fn with_hour_column(mut self, name: impl Into<String>) -> Self {
        self.hour_column = Some(name.into());
        self
    }

    /// Always derive the climatology hour from the timestamp
    pub fn without_hour_column(mut self) -> Self {
        self.hour_column = None;
        self
    }

    /// Set the longest gap routed to curve interpolation
    pub fn with_short_gap_max_len(mut self, max_len: usize) -> Self {
        self.short_gap_max_len = max_len;
        self
    }

    /// Set whether the report is returned alongside the table
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Candidate names for the timestamp column, in lookup order
    pub fn timestamp_candidates(&self) -> Vec<String> {
        candidates(&self.timestamp_column, &self.timestamp_fallback)
    }

    /// Candidate names for the station column, in lookup order
    pub fn station_candidates(&self) -> Vec<String> {
        candidates(&self.station_column, &self.station_fallback)
    }

    /// Check the configuration before any data is touched
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(GapfillError::configuration(
                "at least one target column is required",
            ));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.as_str()) {
                return Err(GapfillError::configuration(format!(
                    "target column '{}' listed more than once",
                    column
                )));
            }
        }

        if self.timestamp_column.is_empty() || self.station_column.is_empty() {
            return Err(GapfillError::configuration(
                "timestamp and station column names must not be empty",
            ));
        }

        debug!(
            "Imputation config: columns={:?}, short gaps <= {}, timestamp={:?}, station={:?}",
            self.columns,
            self.short_gap_max_len,
            self.timestamp_candidates(),
            self.station_candidates()
        );
        Ok(())
    }
}

fn candidates(primary: &str, fallback: &str) -> Vec<String> {
    let mut names = vec![primary.to_string()];
    if !fallback.is_empty() && fallback != primary {
        names.push(fallback.to_string());
    }
    names
}
