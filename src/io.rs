//! Reading and writing observation tables.
//!
//! CSV (header row, optional UTF-8 BOM) and Parquet, chosen by file
//! extension.

use crate::config::OutputCompression;
use crate::constants::{IMPUTED_FILE_SUFFIX, UTF8_BOM};
use crate::error::{GapfillError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Table formats understood by the I/O helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    /// Detect the format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(TableFormat::Csv),
            Some("parquet") | Some("pq") => Ok(TableFormat::Parquet),
            _ => Err(GapfillError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Load an observation table from a CSV or Parquet file
pub fn read_observations(path: &Path) -> Result<DataFrame> {
    let format = TableFormat::from_path(path)?;
    debug!("Reading {:?} table from {}", format, path.display());

    let mut df = match format {
        TableFormat::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10_000))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
        TableFormat::Parquet => ParquetReader::new(File::open(path)?).finish()?,
    };

    strip_header_bom(&mut df)?;
    debug!("Read {} rows x {} columns", df.height(), df.width());
    Ok(df)
}

/// Write an observation table, format chosen by the output extension
pub fn write_observations(
    df: &mut DataFrame,
    path: &Path,
    compression: OutputCompression,
) -> Result<()> {
    let format = TableFormat::from_path(path)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    match format {
        TableFormat::Csv => {
            CsvWriter::new(&mut file).include_header(true).finish(df)?;
        }
        TableFormat::Parquet => {
            ParquetWriter::new(file)
                .with_compression(compression.to_polars_compression())
                .finish(df)?;
        }
    }

    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// `<stem>_imputed.<ext>` next to the input file
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "observations".to_string());
    let file_name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, IMPUTED_FILE_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, IMPUTED_FILE_SUFFIX),
    };
    input.with_file_name(file_name)
}

/// Exported spreadsheets often carry a BOM that ends up in the first column name
fn strip_header_bom(df: &mut DataFrame) -> Result<()> {
    let first = match df.get_column_names().first() {
        Some(name) if name.starts_with(UTF8_BOM) => name.to_string(),
        _ => return Ok(()),
    };

    let cleaned = first.trim_start_matches(UTF8_BOM).to_string();
    debug!("Stripping byte order mark from column '{}'", cleaned);
    df.rename(&first, cleaned.into())?;
    Ok(())
}
