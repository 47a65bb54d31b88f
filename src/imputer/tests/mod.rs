//! Integration tests for the imputation engine
//!
//! Exercise the orchestrator over small in-memory observation tables.


use crate::imputer::table::numeric_values;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::prelude::DataFrame;

/// `count` hourly timestamps starting at `start`, formatted like station exports
pub fn hourly_timestamps(start: NaiveDateTime, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            (start + Duration::hours(i as i64))
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .collect()
}

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

/// Float values of a column in the output table
pub fn column_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    numeric_values(df, name).unwrap().values
}

pub fn missing(values: &[Option<f64>]) -> usize {
    values.iter().filter(|v| v.is_none()).count()
}
