//! Application constants for station gap filling
//!
//! Default column names, routing thresholds and the timestamp layouts
//! accepted when decoding string timestamp columns.

// =============================================================================
// Column Name Constants
// =============================================================================

/// Canonical column names in hourly station observation tables
pub mod columns {
    // Temporal columns
    pub const TIMESTAMP: &str = "tm";
    pub const TIMESTAMP_FALLBACK: &str = "date";
    pub const HOUR: &str = "hour";

    // Station reference columns
    pub const STATION: &str = "stnNm";
    pub const STATION_FALLBACK: &str = "station_name";

    // Observed variables
    pub const TEMPERATURE: &str = "ta";
    pub const HUMIDITY: &str = "hm";
}

/// Target variables processed when none are specified
pub const DEFAULT_TARGET_COLUMNS: &[&str] = &[columns::TEMPERATURE, columns::HUMIDITY];

/// Label used for rows whose station identifier is null
pub const NULL_STATION_LABEL: &str = "<null>";

// =============================================================================
// Imputation Constants
// =============================================================================

/// Longest gap (in samples) filled by curve interpolation; longer gaps use climatology
pub const SHORT_GAP_MAX_LEN: usize = 3;

/// Minimum number of knots for a not-a-knot cubic spline
pub const MIN_SPLINE_POINTS: usize = 4;

/// Minimum number of valid points for any interpolation
pub const MIN_INTERPOLATION_POINTS: usize = 2;

/// Pivots smaller than this abort the spline solve
pub const SPLINE_PIVOT_EPSILON: f64 = 1e-12;

// =============================================================================
// Timestamp Formats
// =============================================================================

/// Date-time layouts tried in order when decoding string timestamps
pub const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M",
    "%Y%m%d%H%M",
];

/// Date-only layouts, interpreted as midnight
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

/// Days from 0001-01-01 (CE) to 1970-01-01
pub const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

// =============================================================================
// Output Constants
// =============================================================================

/// Suffix appended to the input file stem for the default output path
pub const IMPUTED_FILE_SUFFIX: &str = "_imputed";

/// UTF-8 byte order mark that spreadsheet exports prepend to the first header
pub const UTF8_BOM: char = '\u{feff}';

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_targets_are_canonical_weather_columns() {
        assert_eq!(DEFAULT_TARGET_COLUMNS, &["ta", "hm"]);
    }

    #[test]
    fn test_epoch_offset_matches_chrono() {
        let epoch = chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(
            chrono::NaiveDate::from_num_days_from_ce_opt(UNIX_EPOCH_DAYS_FROM_CE),
            Some(epoch)
        );
    }

    #[test]
    fn test_spline_needs_more_points_than_linear() {
        assert!(MIN_SPLINE_POINTS > MIN_INTERPOLATION_POINTS);
    }
}
