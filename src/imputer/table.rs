//! Column access on observation tables.
//!
//! Resolves the timestamp and station columns, materialises target
//! variables as `Vec<Option<f64>>` (coercing text columns), decodes
//! timestamps for climatology keys and partitions rows by station.

use crate::constants::{
    DATE_FORMATS, DATETIME_FORMATS, NULL_STATION_LABEL, UNIX_EPOCH_DAYS_FROM_CE,
};
use crate::error::{GapfillError, Result};
use crate::models::ClimatologyKey;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;
use std::collections::HashMap;
use tracing::{debug, warn};

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// First candidate present in the table, or a configuration error naming all of them
pub fn resolve_column(
    df: &DataFrame,
    role: &'static str,
    candidates: Vec<String>,
) -> Result<String> {
    match candidates.iter().find(|name| has_column(df, name)) {
        Some(name) => {
            debug!("Using '{}' as {} column", name, role);
            Ok(name.clone())
        }
        None => Err(GapfillError::MissingColumn { role, candidates }),
    }
}

/// A target column read as floats
#[derive(Debug, Clone, PartialEq)]
pub struct NumericColumn {
    pub values: Vec<Option<f64>>,
    /// The source column held text and was parsed
    pub coerced: bool,
    /// Non-empty text entries that did not parse as finite numbers
    pub unparseable: usize,
    /// Infinite values in a numeric column, set missing
    pub non_finite: usize,
}

/// Read a column as floats. Text is parsed, with unparseable entries
/// becoming missing; NaN and infinities are treated as missing.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<NumericColumn> {
    let series = df.column(name)?.as_materialized_series();

    match series.dtype() {
        DataType::String => {
            let mut unparseable = 0;
            let values = series
                .str()?
                .into_iter()
                .map(|entry| {
                    let text = entry?.trim();
                    if text.is_empty() {
                        return None;
                    }
                    match text.parse::<f64>() {
                        Ok(v) if v.is_finite() => Some(v),
                        _ => {
                            unparseable += 1;
                            None
                        }
                    }
                })
                .collect();
            Ok(NumericColumn {
                values,
                coerced: true,
                unparseable,
                non_finite: 0,
            })
        }
        _ => {
            let floats = series.cast(&DataType::Float64)?;
            let mut non_finite = 0;
            let values = floats
                .f64()?
                .into_iter()
                .map(|v| {
                    let v = v?;
                    if v.is_infinite() {
                        non_finite += 1;
                    }
                    v.is_finite().then_some(v)
                })
                .collect();
            Ok(NumericColumn {
                values,
                coerced: false,
                unparseable: 0,
                non_finite,
            })
        }
    }
}

/// Replace (or add) a float column
pub fn replace_column(df: &mut DataFrame, name: &str, values: Vec<Option<f64>>) -> Result<()> {
    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

/// Station identifiers as strings; nulls get a shared label
pub fn station_labels(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|s| s.unwrap_or(NULL_STATION_LABEL).to_string())
        .collect())
}

/// Rows belonging to one station, in table order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationGroup {
    pub station: String,
    pub rows: Vec<usize>,
}

/// Partition row indices by station, stations in first-appearance order
pub fn partition_by_station(labels: &[String]) -> Vec<StationGroup> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<StationGroup> = Vec::new();

    for (row, label) in labels.iter().enumerate() {
        let slot = *index.entry(label.as_str()).or_insert_with(|| {
            groups.push(StationGroup {
                station: label.clone(),
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].rows.push(row);
    }

    groups
}

/// Decode a timestamp column (datetime, date or text).
///
/// Zoned datetimes yield the wall-clock time in their own zone; naive
/// datetimes are read as stored.
pub fn timestamps(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDateTime>>> {
    let series = df.column(name)?.as_materialized_series();

    let decoded = match series.dtype() {
        DataType::Datetime(unit, tz) => {
            let unit = *unit;
            let zone = match tz.as_ref().map(|tz| tz.to_chrono()) {
                Some(Ok(zone)) => Some(zone),
                Some(Err(e)) => {
                    warn!("'{}': {}; reading timestamps as UTC", name, e);
                    None
                }
                None => None,
            };
            let physical = series.cast(&DataType::Int64)?;
            physical
                .i64()?
                .into_iter()
                .map(|raw| {
                    let instant = from_epoch(raw?, unit)?;
                    Some(match zone {
                        Some(zone) => instant.with_timezone(&zone).naive_local(),
                        None => instant.naive_utc(),
                    })
                })
                .collect()
        }
        DataType::Date => {
            let physical = series.cast(&DataType::Int32)?;
            physical
                .i32()?
                .into_iter()
                .map(|days| days.and_then(from_epoch_days))
                .collect()
        }
        DataType::String => series
            .str()?
            .into_iter()
            .map(|s| s.and_then(parse_timestamp))
            .collect(),
        _ => {
            let text = series.cast(&DataType::String)?;
            text.str()?
                .into_iter()
                .map(|s| s.and_then(parse_timestamp))
                .collect()
        }
    };

    Ok(decoded)
}

/// Integer hours in `0..=23` from an hour column; anything else is `None`
pub fn hour_overrides(df: &DataFrame, name: &str) -> Result<Vec<Option<u32>>> {
    let column = numeric_values(df, name)?;
    Ok(column
        .values
        .into_iter()
        .map(|v| v.filter(|h| h.fract() == 0.0 && (0.0..=23.0).contains(h)).map(|h| h as u32))
        .collect())
}

/// Calendar keys for every row, `None` where the timestamp is unknown
pub fn climatology_keys(
    timestamps: &[Option<NaiveDateTime>],
    hours: Option<&[Option<u32>]>,
) -> Vec<Option<ClimatologyKey>> {
    timestamps
        .iter()
        .enumerate()
        .map(|(row, ts)| {
            let hour = hours.and_then(|h| h[row]);
            ts.as_ref()
                .map(|ts| ClimatologyKey::from_datetime(ts, hour))
        })
        .collect()
}

/// Parse a timestamp string in any of the accepted layouts
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn from_epoch(raw: i64, unit: TimeUnit) -> Option<DateTime<Utc>> {
    match unit {
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(raw),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(raw),
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(raw)),
    }
}

fn from_epoch_days(days: i32) -> Option<NaiveDateTime> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)?
        .and_hms_opt(0, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_resolve_column_uses_fallback() {
        let df = df!("date" => ["2023-01-01"], "stnNm" => ["A"]).unwrap();

        let name = resolve_column(&df, "timestamp", vec!["tm".into(), "date".into()]).unwrap();
        assert_eq!(name, "date");
    }

    #[test]
    fn test_resolve_column_reports_all_candidates() {
        let df = df!("x" => [1.0]).unwrap();

        let err = resolve_column(&df, "station", vec!["stnNm".into(), "station_name".into()])
            .unwrap_err();
        match err {
            GapfillError::MissingColumn { role, candidates } => {
                assert_eq!(role, "station");
                assert_eq!(candidates, vec!["stnNm", "station_name"]);
            }
            other => panic!("Expected MissingColumn error, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_values_from_floats_treats_nan_as_missing() {
        let df = df!("ta" => [Some(1.5), None, Some(f64::NAN)]).unwrap();

        let column = numeric_values(&df, "ta").unwrap();
        assert_eq!(column.values, vec![Some(1.5), None, None]);
        assert!(!column.coerced);
    }

    #[test]
    fn test_numeric_values_treats_infinities_as_missing() {
        let df = df!("ta" => [Some(1.0), Some(f64::INFINITY), Some(f64::NEG_INFINITY), None]).unwrap();

        let column = numeric_values(&df, "ta").unwrap();
        assert_eq!(column.values, vec![Some(1.0), None, None, None]);
        assert_eq!(column.non_finite, 2);
    }

    #[test]
    fn test_numeric_values_from_integers() {
        let df = df!("hm" => [Some(40i64), None, Some(55)]).unwrap();

        let column = numeric_values(&df, "hm").unwrap();
        assert_eq!(column.values, vec![Some(40.0), None, Some(55.0)]);
    }

    #[test]
    fn test_numeric_values_coerces_text() {
        let df = df!("ta" => [Some("21.3"), Some("N/A"), None, Some(" 4 "), Some("")]).unwrap();

        let column = numeric_values(&df, "ta").unwrap();
        assert_eq!(column.values, vec![Some(21.3), None, None, Some(4.0), None]);
        assert!(column.coerced);
        assert_eq!(column.unparseable, 1);
    }

    #[test]
    fn test_numeric_values_rejects_infinite_text() {
        let df = df!("ta" => ["1", "inf", "-inf", "NaN", "2"]).unwrap();

        let column = numeric_values(&df, "ta").unwrap();
        assert_eq!(column.values, vec![Some(1.0), None, None, None, Some(2.0)]);
        assert_eq!(column.unparseable, 3);
    }

    #[test]
    fn test_replace_column_changes_dtype() {
        let mut df = df!("ta" => ["1", "x"], "other" => [1, 2]).unwrap();

        replace_column(&mut df, "ta", vec![Some(1.0), None]).unwrap();

        assert_eq!(df.width(), 2);
        assert_eq!(df.column("ta").unwrap().dtype(), &DataType::Float64);
        assert_eq!(numeric_values(&df, "ta").unwrap().values, vec![Some(1.0), None]);
    }

    #[test]
    fn test_partition_by_station_first_appearance_order() {
        let labels: Vec<String> = ["B", "A", "B", "C", "A"].iter().map(|s| s.to_string()).collect();

        let groups = partition_by_station(&labels);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].station, "B");
        assert_eq!(groups[0].rows, vec![0, 2]);
        assert_eq!(groups[1].station, "A");
        assert_eq!(groups[1].rows, vec![1, 4]);
        assert_eq!(groups[2].rows, vec![3]);
    }

    #[test]
    fn test_station_labels_casts_numeric_ids_and_labels_nulls() {
        let df = df!("stnId" => [Some(108i64), None, Some(108)]).unwrap();

        let labels = station_labels(&df, "stnId").unwrap();
        assert_eq!(labels, vec!["108", NULL_STATION_LABEL, "108"]);
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        let expected = datetime(2023, 7, 14, 14);
        for text in [
            "2023-07-14 14:00:00",
            "2023-07-14 14:00",
            "2023-07-14T14:00:00",
            "2023/07/14 14:00",
            "202307141400",
            "2023-07-14T14:00:00+09:00",
        ] {
            assert_eq!(parse_timestamp(text), Some(expected), "layout: {}", text);
        }
        assert_eq!(parse_timestamp("2023-07-14"), Some(datetime(2023, 7, 14, 0)));
        assert_eq!(parse_timestamp("20230714"), Some(datetime(2023, 7, 14, 0)));
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("  "), None);
    }

    #[test]
    fn test_timestamps_from_datetime_column() {
        let millis = datetime(2023, 7, 14, 14).and_utc().timestamp_millis();
        let series = Series::new("tm".into(), [Some(millis), None])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let df = DataFrame::new(vec![series.into()]).unwrap();

        let decoded = timestamps(&df, "tm").unwrap();
        assert_eq!(decoded, vec![Some(datetime(2023, 7, 14, 14)), None]);
    }

    #[test]
    fn test_timestamps_from_zoned_datetime_use_local_time() {
        // 05:00 UTC is 14:00 in Seoul
        let millis = datetime(2023, 7, 14, 5).and_utc().timestamp_millis();
        let zone = TimeZone::opt_try_new(Some("Asia/Seoul")).unwrap();
        let series = Series::new("tm".into(), [Some(millis)])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, zone))
            .unwrap();
        let df = DataFrame::new(vec![series.into()]).unwrap();

        let decoded = timestamps(&df, "tm").unwrap();
        assert_eq!(decoded, vec![Some(datetime(2023, 7, 14, 14))]);

        let keys = climatology_keys(&decoded, None);
        assert_eq!(keys, vec![Some(ClimatologyKey::new(7, 14, 14))]);
    }

    #[test]
    fn test_timestamps_from_fixed_offset_datetime() {
        let millis = datetime(2023, 12, 31, 20).and_utc().timestamp_millis();
        let zone = TimeZone::opt_try_new(Some("+09:00")).unwrap();
        let series = Series::new("tm".into(), [Some(millis)])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, zone))
            .unwrap();
        let df = DataFrame::new(vec![series.into()]).unwrap();

        let decoded = timestamps(&df, "tm").unwrap();
        assert_eq!(decoded, vec![Some(datetime(2024, 1, 1, 5))]);
    }

    #[test]
    fn test_timestamps_from_date_column() {
        let days = (NaiveDate::from_ymd_opt(2020, 2, 29).unwrap()
            - NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
        .num_days() as i32;
        let series = Series::new("date".into(), [days])
            .cast(&DataType::Date)
            .unwrap();
        let df = DataFrame::new(vec![series.into()]).unwrap();

        let decoded = timestamps(&df, "date").unwrap();
        assert_eq!(decoded, vec![Some(datetime(2020, 2, 29, 0))]);
    }

    #[test]
    fn test_climatology_keys_with_hour_override() {
        let ts = vec![Some(datetime(2023, 1, 2, 0)), None, Some(datetime(2023, 1, 2, 5))];
        let hours = vec![Some(7), Some(8), None];

        let keys = climatology_keys(&ts, Some(&hours));
        assert_eq!(
            keys,
            vec![
                Some(ClimatologyKey::new(1, 2, 7)),
                None,
                Some(ClimatologyKey::new(1, 2, 5)),
            ]
        );
    }

    #[test]
    fn test_hour_overrides_reject_out_of_range() {
        let df = df!("hour" => [Some(0.0), Some(23.0), Some(24.0), Some(1.5), None]).unwrap();

        let hours = hour_overrides(&df, "hour").unwrap();
        assert_eq!(hours, vec![Some(0), Some(23), None, None, None]);
    }
}
