//! Integration tests for file-based imputation
//!
//! Write realistic hourly station exports to a temporary directory, run
//! them through the reader, the imputer and the writer, and check what
//! lands on disk.

use polars::prelude::*;
use station_gapfill::io::{default_output_path, read_observations, write_observations};
use station_gapfill::{GapImputer, ImputeConfig, ImputeOutput, OutputCompression};
use station_gapfill::{impute_missing_values, imputer::table::numeric_values};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const YEARS: [i32; 3] = [2021, 2022, 2023];

fn temperature(year: i32, hour: u32) -> f64 {
    20.0 + (year - 2021) as f64 + hour as f64 * 0.5
}

fn humidity(hour: u32) -> f64 {
    60.0 + hour as f64
}

/// Two stations, 14 July 00:00-23:00 for three years.
///
/// Seoul loses 10:00-15:00 of ta in 2023 and hm at 05:00 in 2023.
/// Busan reports hm as "N/A" at 20:00 in 2023.
fn write_station_export(dir: &Path) -> PathBuf {
    let mut csv = String::from("\u{feff}tm,stnNm,ta,hm\n");
    for station in ["Seoul", "Busan"] {
        for year in YEARS {
            for hour in 0..24u32 {
                let ta = if station == "Seoul" && year == 2023 && (10..16).contains(&hour) {
                    String::new()
                } else {
                    temperature(year, hour).to_string()
                };
                let hm = match (station, year, hour) {
                    ("Seoul", 2023, 5) => String::new(),
                    ("Busan", 2023, 20) => "N/A".to_string(),
                    _ => humidity(hour).to_string(),
                };
                writeln!(
                    csv,
                    "{}-07-14 {:02}:00,{},{},{}",
                    year, hour, station, ta, hm
                )
                .unwrap();
            }
        }
    }

    let path = dir.join("hourly_2021_2023.csv");
    fs::write(&path, csv).unwrap();
    path
}

fn values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    numeric_values(df, name).unwrap().values
}

fn row(station_idx: usize, year: i32, hour: u32) -> usize {
    station_idx * 72 + (year - 2021) as usize * 24 + hour as usize
}

#[test]
fn test_csv_to_parquet_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_station_export(temp_dir.path());

    let df = read_observations(&input).unwrap();
    assert_eq!(df.height(), 144);
    assert_eq!(df.get_column_names()[0].as_str(), "tm");

    let (mut output, report) = GapImputer::new(ImputeConfig::default())
        .unwrap()
        .run(&df)
        .unwrap();

    let output_path = temp_dir.path().join("filled.parquet");
    write_observations(&mut output, &output_path, OutputCompression::Snappy).unwrap();
    let written = read_observations(&output_path).unwrap();

    assert_eq!(written.height(), 144);
    assert_eq!(written.get_column_names(), df.get_column_names());

    let ta = values(&written, "ta");
    for hour in 10..16u32 {
        let expected = (temperature(2021, hour) + temperature(2022, hour)) / 2.0;
        let filled = ta[row(0, 2023, hour)].unwrap();
        assert!((filled - expected).abs() < 1e-9, "hour {}: {}", hour, filled);
    }

    // The daily humidity ramp resets at midnight, so the spline only
    // approximates the ramp near the day boundary
    let hm = values(&written, "hm");
    for (station_idx, hour) in [(0, 5u32), (1, 20)] {
        let filled = hm[row(station_idx, 2023, hour)].unwrap();
        assert!((filled - humidity(hour)).abs() < 0.1, "hour {}: {}", hour, filled);
    }

    assert_eq!(report.coerced_columns, vec!["hm"]);
    assert_eq!(report.station_count, 2);
    assert_eq!(report.methods["ta"].climatology_groups, 1);
    assert_eq!(report.methods["hm"].spline_groups, 2);
    assert_eq!(report.residual_missing("ta"), Some(0));
    assert_eq!(report.residual_missing("hm"), Some(0));
    assert_eq!(report.reduction_pct("ta"), Some(100.0));
}

#[test]
fn test_csv_output_next_to_input() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_station_export(temp_dir.path());
    let output_path = default_output_path(&input);
    assert_eq!(
        output_path,
        temp_dir.path().join("hourly_2021_2023_imputed.csv")
    );

    let df = read_observations(&input).unwrap();
    let output = impute_missing_values(&df, &ImputeConfig::default().with_verbose(false)).unwrap();
    assert!(matches!(output, ImputeOutput::Frame(_)));

    let mut frame = output.into_frame();
    write_observations(&mut frame, &output_path, OutputCompression::default()).unwrap();

    let written = read_observations(&output_path).unwrap();
    assert_eq!(written.height(), 144);
    assert_eq!(written.column("ta").unwrap().null_count(), 0);
    assert_eq!(written.column("hm").unwrap().null_count(), 0);
}

#[test]
fn test_report_serializes_to_json() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_station_export(temp_dir.path());
    let df = read_observations(&input).unwrap();

    let (_, report) = GapImputer::new(ImputeConfig::default())
        .unwrap()
        .run(&df)
        .unwrap();

    let json: serde_json::Value = serde_json::to_value(&report).unwrap();
    assert_eq!(json["total_rows"], 144);
    assert_eq!(json["before"]["ta"]["missing_count"], 6);
    assert_eq!(json["after"]["hm"]["missing_count"], 0);
    assert_eq!(json["station_stats"]["Seoul"]["ta"]["missing_values"], 6);
    assert_eq!(json["gap_length_histogram"]["6"], 1);
}
