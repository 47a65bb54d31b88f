//! Missing-value imputation engine.
//!
//! Splits the table by station, finds runs of missing values in each
//! target variable and routes every run by length: short runs to spline
//! interpolation, long runs to the climatology fallback chain. Filled
//! station series are written back into a copy of the table.
//!
//! All estimates are computed from observed values only, so the result
//! does not depend on the order gaps are processed in.

pub mod climatology;
pub mod runs;
pub mod spline;
pub mod stats;
pub mod table;

#[cfg(test)]
pub mod tests;

use self::climatology::{Climatology, LongGapImputer, mean_of};
use self::runs::{count_missing, find_missing_runs};
use self::spline::{ShortGapFill, ShortGapInterpolator};
use self::stats::{ColumnSummary, ImputationReport};
use self::table::{StationGroup, has_column, partition_by_station, resolve_column};

use crate::config::ImputeConfig;
use crate::error::Result;
use crate::models::{ClimatologyKey, ImputationMethod};

use polars::prelude::DataFrame;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of [`impute_missing_values`], shaped by `ImputeConfig::verbose`
#[derive(Debug, Clone)]
pub enum ImputeOutput {
    Frame(DataFrame),
    WithReport(DataFrame, ImputationReport),
}

impl ImputeOutput {
    pub fn frame(&self) -> &DataFrame {
        match self {
            ImputeOutput::Frame(df) | ImputeOutput::WithReport(df, _) => df,
        }
    }

    pub fn report(&self) -> Option<&ImputationReport> {
        match self {
            ImputeOutput::Frame(_) => None,
            ImputeOutput::WithReport(_, report) => Some(report),
        }
    }

    pub fn into_frame(self) -> DataFrame {
        self.into_parts().0
    }

    pub fn into_parts(self) -> (DataFrame, Option<ImputationReport>) {
        match self {
            ImputeOutput::Frame(df) => (df, None),
            ImputeOutput::WithReport(df, report) => (df, Some(report)),
        }
    }
}

/// Fill missing values in `df` according to `config`.
///
/// Returns the processed copy alone, or together with the imputation
/// report when `config.verbose` is set. Fails only when the configuration
/// is invalid or the timestamp/station columns cannot be found.
pub fn impute_missing_values(df: &DataFrame, config: &ImputeConfig) -> Result<ImputeOutput> {
    let imputer = GapImputer::new(config.clone())?;
    let (frame, report) = imputer.run(df)?;

    if config.verbose {
        info!("{}", report.summary());
        Ok(ImputeOutput::WithReport(frame, report))
    } else {
        Ok(ImputeOutput::Frame(frame))
    }
}

/// One target variable while it is being processed
#[derive(Debug)]
struct TargetColumn {
    name: String,
    /// Values as read (after coercion); source of every estimate
    observed: Vec<Option<f64>>,
    /// Output values, updated station by station
    filled: Vec<Option<f64>>,
    dataset_mean: Option<f64>,
    /// Source column is left as it was: numeric, nothing missing
    unchanged: bool,
}

/// Per-station, per-variable gap-filling orchestrator
#[derive(Debug, Clone)]
pub struct GapImputer {
    config: ImputeConfig,
}

impl GapImputer {
    /// Create an imputer, validating the configuration
    pub fn new(config: ImputeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Process the whole table, returning the filled copy and its report
    pub fn run(&self, df: &DataFrame) -> Result<(DataFrame, ImputationReport)> {
        let start_time = Instant::now();

        // Preconditions: nothing is read before both columns are located
        let timestamp_col = resolve_column(df, "timestamp", self.config.timestamp_candidates())?;
        let station_col = resolve_column(df, "station", self.config.station_candidates())?;

        let mut report = ImputationReport::new();
        report.total_rows = df.height();
        report.total_columns = df.width();

        let mut targets = self.load_targets(df, &mut report)?;

        let labels = table::station_labels(df, &station_col)?;
        let groups = partition_by_station(&labels);
        report.station_count = groups.len();
        info!(
            "Imputing {} columns over {} rows from {} stations",
            targets.len(),
            df.height(),
            groups.len()
        );

        if !targets.is_empty() {
            let keys = self.climatology_keys(df, &timestamp_col)?;

            for (station_idx, group) in groups.iter().enumerate() {
                debug!(
                    "[{}/{}] station {} ({} rows)",
                    station_idx + 1,
                    groups.len(),
                    group.station,
                    group.rows.len()
                );
                let station_keys: Vec<Option<ClimatologyKey>> =
                    group.rows.iter().map(|&row| keys[row]).collect();

                for target in targets.iter_mut() {
                    self.process_group(group, &station_keys, target, &mut report);
                }
            }
        }

        let mut output = df.clone();
        for target in targets {
            report
                .after
                .insert(target.name.clone(), ColumnSummary::from_values(&target.filled));
            if let Some(residual) = report.residual_missing(&target.name).filter(|&n| n > 0) {
                warn!(
                    "{}: {} values could not be filled and remain missing",
                    target.name, residual
                );
            }
            if target.unchanged {
                debug!("{}: complete, keeping source column", target.name);
                continue;
            }
            table::replace_column(&mut output, &target.name, target.filled)?;
        }

        report.processing_time = start_time.elapsed();
        debug!("{}", report.summary());
        Ok((output, report))
    }

    /// Read every requested column that exists, coercing text to numbers
    fn load_targets(
        &self,
        df: &DataFrame,
        report: &mut ImputationReport,
    ) -> Result<Vec<TargetColumn>> {
        let mut targets = Vec::with_capacity(self.config.columns.len());

        for name in &self.config.columns {
            if !has_column(df, name) {
                warn!("Column '{}' not found, skipping", name);
                report.skipped_columns.push(name.clone());
                continue;
            }

            let column = table::numeric_values(df, name)?;
            if column.coerced {
                warn!(
                    "Column '{}' held text and was converted to numeric ({} unparseable entries set missing)",
                    name, column.unparseable
                );
                report.coerced_columns.push(name.clone());
            }
            if column.non_finite > 0 {
                warn!(
                    "Column '{}' has {} infinite values, treated as missing",
                    name, column.non_finite
                );
            }

            let before = ColumnSummary::from_values(&column.values);
            let unchanged = !column.coerced && before.missing_count == 0;
            report.before.insert(name.clone(), before);

            targets.push(TargetColumn {
                name: name.clone(),
                unchanged,
                dataset_mean: mean_of(&column.values),
                filled: column.values.clone(),
                observed: column.values,
            });
        }

        Ok(targets)
    }

    fn climatology_keys(
        &self,
        df: &DataFrame,
        timestamp_col: &str,
    ) -> Result<Vec<Option<ClimatologyKey>>> {
        let timestamps = table::timestamps(df, timestamp_col)?;
        let unreadable = timestamps.iter().filter(|ts| ts.is_none()).count();
        if unreadable > 0 {
            warn!(
                "{} rows have no readable '{}' timestamp; they are excluded from climatology lookups",
                unreadable, timestamp_col
            );
        }

        let hours = match &self.config.hour_column {
            Some(name) if has_column(df, name) => {
                debug!("Using '{}' for the climatology hour", name);
                Some(table::hour_overrides(df, name)?)
            }
            _ => None,
        };

        Ok(table::climatology_keys(&timestamps, hours.as_deref()))
    }

    /// Detect and fill every gap of one variable at one station
    fn process_group(
        &self,
        group: &StationGroup,
        station_keys: &[Option<ClimatologyKey>],
        target: &mut TargetColumn,
        report: &mut ImputationReport,
    ) {
        let series: Vec<Option<f64>> = group.rows.iter().map(|&row| target.observed[row]).collect();
        let initial_missing = count_missing(&series);
        if initial_missing == 0 {
            debug!("  {}: no missing values", target.name);
            return;
        }

        let gaps = find_missing_runs(&series);
        debug!(
            "  {}: {} missing in {} runs",
            target.name,
            initial_missing,
            gaps.len()
        );

        let mut filled = series.clone();
        let mut interpolator: Option<ShortGapInterpolator> = None;
        let mut climatology: Option<Climatology> = None;

        for gap in gaps {
            let method = ImputationMethod::for_gap(&gap, self.config.short_gap_max_len);
            report.record_gap(&group.station, &target.name, &gap, method);
            debug!(
                "    run of {} at position {} -> {}",
                gap.len, gap.start, method
            );

            match method {
                ImputationMethod::Spline => {
                    let interpolator =
                        interpolator.get_or_insert_with(|| ShortGapInterpolator::new(&series));
                    let outcome = interpolator.fill(&mut filled, gap);
                    let tally = report.method_tally_mut(&target.name);
                    match outcome {
                        ShortGapFill::Spline => tally.spline_fits += 1,
                        ShortGapFill::Linear => tally.linear_fallbacks += 1,
                        ShortGapFill::Unfilled => {
                            tally.unfilled_short_groups += 1;
                            debug!(
                                "    {} valid points at station {}, run left missing",
                                interpolator.valid_points(),
                                group.station
                            );
                        }
                    }
                }
                ImputationMethod::Climatology => {
                    let climatology = climatology.get_or_insert_with(|| {
                        let built = Climatology::build(station_keys, &series);
                        if built.is_empty() {
                            debug!(
                                "    no same-hour observations at station {}, using mean fallbacks",
                                group.station
                            );
                        }
                        built
                    });
                    let imputer = LongGapImputer::new(climatology, target.dataset_mean);
                    let tally = imputer.fill(&mut filled, station_keys, gap);
                    report
                        .method_tally_mut(&target.name)
                        .fallbacks
                        .merge(&tally);
                }
            }
        }

        let final_missing = count_missing(&filled);
        if final_missing > 0 {
            debug!(
                "  {}: {} -> {} missing, some runs unresolved",
                target.name, initial_missing, final_missing
            );
        } else {
            debug!("  {}: {} -> 0 missing", target.name, initial_missing);
        }

        for (&row, value) in group.rows.iter().zip(filled) {
            target.filled[row] = value;
        }
    }
}
