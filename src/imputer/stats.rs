//! Imputation statistics and reporting
//!
//! Passive accumulators filled in by the orchestrator. Nothing here is
//! consulted by the imputation logic itself.

use crate::models::{FallbackLevel, Gap, ImputationMethod};
use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Missing count and descriptive statistics for one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub missing_count: usize,
    pub missing_pct: f64,
    pub mean: Option<f64>,
    /// Sample standard deviation (ddof = 1)
    pub std: Option<f64>,
}

impl ColumnSummary {
    pub fn from_values(values: &[Option<f64>]) -> Self {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let missing_count = values.len() - present.len();
        let missing_pct = if values.is_empty() {
            0.0
        } else {
            missing_count as f64 / values.len() as f64 * 100.0
        };

        let mean = (!present.is_empty()).then(|| present.iter().sum::<f64>() / present.len() as f64);
        let std = match mean {
            Some(mean) if present.len() > 1 => {
                let ss: f64 = present.iter().map(|v| (v - mean).powi(2)).sum();
                Some((ss / (present.len() - 1) as f64).sqrt())
            }
            _ => None,
        };

        Self {
            missing_count,
            missing_pct,
            mean,
            std,
        }
    }
}

/// Which level of the long-gap fallback chain served each position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FallbackTally {
    pub climatology: usize,
    pub station_mean: usize,
    pub dataset_mean: usize,
    pub unresolved: usize,
}

impl FallbackTally {
    pub fn record(&mut self, level: FallbackLevel) {
        match level {
            FallbackLevel::Climatology => self.climatology += 1,
            FallbackLevel::StationMean => self.station_mean += 1,
            FallbackLevel::DatasetMean => self.dataset_mean += 1,
            FallbackLevel::Unresolved => self.unresolved += 1,
        }
    }

    pub fn merge(&mut self, other: &FallbackTally) {
        self.climatology += other.climatology;
        self.station_mean += other.station_mean;
        self.dataset_mean += other.dataset_mean;
        self.unresolved += other.unresolved;
    }

    /// Positions that received a value
    pub fn filled(&self) -> usize {
        self.climatology + self.station_mean + self.dataset_mean
    }
}

/// Per-column counts of gaps and values routed to each method
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MethodTally {
    pub spline_groups: usize,
    pub climatology_groups: usize,
    pub spline_values: usize,
    pub climatology_values: usize,
    pub total_missing: usize,
    /// Short gaps filled from the cubic spline
    pub spline_fits: usize,
    /// Short gaps filled by linear interpolation
    pub linear_fallbacks: usize,
    /// Short gaps left missing for lack of observed points
    pub unfilled_short_groups: usize,
    pub fallbacks: FallbackTally,
}

impl MethodTally {
    pub fn record_gap(&mut self, method: ImputationMethod, len: usize) {
        match method {
            ImputationMethod::Spline => {
                self.spline_groups += 1;
                self.spline_values += len;
            }
            ImputationMethod::Climatology => {
                self.climatology_groups += 1;
                self.climatology_values += len;
            }
        }
        self.total_missing += len;
    }

    pub fn merge(&mut self, other: &MethodTally) {
        self.spline_groups += other.spline_groups;
        self.climatology_groups += other.climatology_groups;
        self.spline_values += other.spline_values;
        self.climatology_values += other.climatology_values;
        self.total_missing += other.total_missing;
        self.spline_fits += other.spline_fits;
        self.linear_fallbacks += other.linear_fallbacks;
        self.unfilled_short_groups += other.unfilled_short_groups;
        self.fallbacks.merge(&other.fallbacks);
    }
}

/// Gap counts for one station and column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StationTally {
    pub missing_groups: usize,
    pub missing_values: usize,
}

/// Statistics for a complete imputation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImputationReport {
    pub total_rows: usize,
    pub total_columns: usize,
    pub station_count: usize,
    pub before: BTreeMap<String, ColumnSummary>,
    pub after: BTreeMap<String, ColumnSummary>,
    pub methods: BTreeMap<String, MethodTally>,
    pub gap_length_histogram: BTreeMap<usize, usize>,
    pub station_stats: BTreeMap<String, BTreeMap<String, StationTally>>,
    /// Text columns converted to numeric
    pub coerced_columns: Vec<String>,
    /// Requested columns absent from the table
    pub skipped_columns: Vec<String>,
    pub total_groups: usize,
    pub processing_time: Duration,
}

impl ImputationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one detected gap before it is imputed
    pub fn record_gap(&mut self, station: &str, column: &str, gap: &Gap, method: ImputationMethod) {
        self.total_groups += 1;
        *self.gap_length_histogram.entry(gap.len).or_insert(0) += 1;

        let tally = self
            .station_stats
            .entry(station.to_string())
            .or_default()
            .entry(column.to_string())
            .or_default();
        tally.missing_groups += 1;
        tally.missing_values += gap.len;

        self.method_tally_mut(column).record_gap(method, gap.len);
    }

    pub fn method_tally_mut(&mut self, column: &str) -> &mut MethodTally {
        self.methods.entry(column.to_string()).or_default()
    }

    /// Values still missing after imputation
    pub fn residual_missing(&self, column: &str) -> Option<usize> {
        self.after.get(column).map(|s| s.missing_count)
    }

    /// Percentage of originally missing values that were filled
    pub fn reduction_pct(&self, column: &str) -> Option<f64> {
        let before = self.before.get(column)?.missing_count;
        let after = self.after.get(column)?.missing_count;
        Some(if before == 0 {
            0.0
        } else {
            before.saturating_sub(after) as f64 / before as f64 * 100.0
        })
    }

    /// Add another report's gap tallies to this one.
    ///
    /// Table-level fields (row counts, before/after summaries, timing) are
    /// left untouched; they describe the whole table and belong to the
    /// caller that partitioned it.
    pub fn merge(&mut self, other: &ImputationReport) {
        self.total_groups += other.total_groups;
        for (len, count) in &other.gap_length_histogram {
            *self.gap_length_histogram.entry(*len).or_insert(0) += count;
        }
        for (column, tally) in &other.methods {
            self.method_tally_mut(column).merge(tally);
        }
        for (station, columns) in &other.station_stats {
            let entry = self.station_stats.entry(station.clone()).or_default();
            for (column, tally) in columns {
                let target = entry.entry(column.clone()).or_default();
                target.missing_groups += tally.missing_groups;
                target.missing_values += tally.missing_values;
            }
        }
        for column in &other.coerced_columns {
            if !self.coerced_columns.contains(column) {
                self.coerced_columns.push(column.clone());
            }
        }
        for column in &other.skipped_columns {
            if !self.skipped_columns.contains(column) {
                self.skipped_columns.push(column.clone());
            }
        }
    }

    /// One-line summary for logging
    pub fn summary(&self) -> String {
        let before: usize = self.before.values().map(|s| s.missing_count).sum();
        let after: usize = self.after.values().map(|s| s.missing_count).sum();
        format!(
            "Imputation Summary: {} rows, {} stations | {} gaps | missing {} -> {} | {:.2}s",
            self.total_rows,
            self.station_count,
            self.total_groups,
            before,
            after,
            self.processing_time.as_secs_f64()
        )
    }

    /// Print the full report to stdout
    pub fn print_summary(&self) {
        println!("\n{}", "Missing Values Before Imputation".bright_green().bold());
        println!(
            "  {} {} rows x {} columns",
            "Table:".bright_cyan(),
            self.total_rows.to_string().bright_white(),
            self.total_columns.to_string().bright_white()
        );
        println!(
            "  {} {}",
            "Stations:".bright_cyan(),
            self.station_count.to_string().bright_white()
        );
        for (column, summary) in &self.before {
            print_column_summary(column, summary);
        }

        println!("\n{}", "Missing Values After Imputation".bright_green().bold());
        for (column, summary) in &self.after {
            print_column_summary(column, summary);
            if let (Some(before), Some(reduction)) =
                (self.before.get(column), self.reduction_pct(column))
            {
                println!(
                    "    {} {} -> {} ({:.1}% filled)",
                    "Change:".bright_cyan(),
                    before.missing_count,
                    summary.missing_count,
                    reduction
                );
            }
        }

        println!("\n{}", "Imputation Methods".bright_green().bold());
        for (column, tally) in &self.methods {
            println!("  {}", column.bright_white().bold());
            println!(
                "    {} {} groups ({} values; {} spline, {} linear, {} unfilled)",
                "Spline:".bright_cyan(),
                tally.spline_groups,
                tally.spline_values,
                tally.spline_fits,
                tally.linear_fallbacks,
                tally.unfilled_short_groups
            );
            println!(
                "    {} {} groups ({} values; {} same-hour, {} station mean, {} dataset mean)",
                "Climatology:".bright_cyan(),
                tally.climatology_groups,
                tally.climatology_values,
                tally.fallbacks.climatology,
                tally.fallbacks.station_mean,
                tally.fallbacks.dataset_mean
            );
            if tally.fallbacks.unresolved > 0 {
                println!(
                    "    {} {}",
                    "Unresolved:".bright_red(),
                    tally.fallbacks.unresolved.to_string().bright_red().bold()
                );
            }
        }

        println!("\n{}", "Gap Length Distribution".bright_green().bold());
        for (len, count) in &self.gap_length_histogram {
            println!("  length {:>4}: {} groups", len, count);
        }

        if !self.coerced_columns.is_empty() {
            println!(
                "\n  {} {}",
                "Coerced to numeric:".bright_yellow(),
                self.coerced_columns.join(", ")
            );
        }
        if !self.skipped_columns.is_empty() {
            println!(
                "  {} {}",
                "Skipped (not in table):".bright_yellow(),
                self.skipped_columns.join(", ")
            );
        }

        println!(
            "\n  {} {:.2}s",
            "Time elapsed:".bright_cyan(),
            self.processing_time.as_secs_f64()
        );
        println!(
            "  {} {}",
            "Groups processed:".bright_cyan(),
            self.total_groups.to_string().bright_white().bold()
        );
    }
}

fn print_column_summary(column: &str, summary: &ColumnSummary) {
    println!(
        "  {} {} missing ({:.2}%)",
        format!("{}:", column).bright_white().bold(),
        summary.missing_count,
        summary.missing_pct
    );
    if let Some(mean) = summary.mean {
        print!("    {} {:.2}", "Mean:".bright_cyan(), mean);
        match summary.std {
            Some(std) => println!("  {} {:.2}", "Std:".bright_cyan(), std),
            None => println!(),
        }
    }
}
