//! Error handling for gap-filling operations.
//!
//! Only configuration problems are fatal. Data-quality issues (coerced
//! columns, unfillable gaps) are reported through the imputation report
//! and logging rather than as errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GapfillError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Configuration error: no {role} column found (tried: {})", .candidates.join(", "))]
    MissingColumn {
        role: &'static str,
        candidates: Vec<String>,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unsupported file format: {path} (expected .csv or .parquet)")]
    UnsupportedFormat { path: PathBuf },
}

impl GapfillError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True for errors raised by the precondition checks, before any row is touched
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GapfillError::MissingColumn { .. } | GapfillError::Configuration { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GapfillError>;
