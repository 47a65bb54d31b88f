//! Core data structures for gap filling.
//!
//! Defines missing-value runs, calendar keys for climatology lookups and
//! the labels used when tallying how each value was filled.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A maximal run of missing values within one station's series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gap {
    pub start: usize,
    pub len: usize,
}

impl Gap {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// One past the last missing position
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn positions(&self) -> std::ops::Range<usize> {
        self.start..self.end()
    }
}

/// Calendar identity shared by the same hour on the same day across years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClimatologyKey {
    pub month: u32,
    pub day: u32,
    pub hour: u32,
}

impl ClimatologyKey {
    pub fn new(month: u32, day: u32, hour: u32) -> Self {
        Self { month, day, hour }
    }

    /// Derive the key from a timestamp, optionally overriding the hour
    pub fn from_datetime(timestamp: &NaiveDateTime, hour_override: Option<u32>) -> Self {
        Self {
            month: timestamp.month(),
            day: timestamp.day(),
            hour: hour_override.unwrap_or_else(|| timestamp.hour()),
        }
    }
}

impl fmt::Display for ClimatologyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02} {:02}h", self.month, self.day, self.hour)
    }
}

/// Strategy a gap was routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImputationMethod {
    /// Cubic spline (or linear fallback) through surrounding valid points
    Spline,
    /// Same month/day/hour average with mean fallbacks
    Climatology,
}

impl ImputationMethod {
    /// Route a gap by its length
    pub fn for_gap(gap: &Gap, short_gap_max_len: usize) -> Self {
        if gap.len <= short_gap_max_len {
            ImputationMethod::Spline
        } else {
            ImputationMethod::Climatology
        }
    }
}

impl fmt::Display for ImputationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImputationMethod::Spline => write!(f, "spline"),
            ImputationMethod::Climatology => write!(f, "climatology"),
        }
    }
}

/// Level of the long-gap fallback chain that produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FallbackLevel {
    Climatology,
    StationMean,
    DatasetMean,
    Unresolved,
}
