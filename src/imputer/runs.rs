//! Run detection for missing values.
//!
//! A single left-to-right pass over a series yields every maximal run of
//! missing entries as a [`Gap`], in ascending order.

use crate::models::Gap;

/// Find all maximal runs of `None` in `values`
pub fn find_missing_runs<T>(values: &[Option<T>]) -> Vec<Gap> {
    let mut gaps = Vec::new();
    let mut run_start: Option<usize> = None;

    for (idx, value) in values.iter().enumerate() {
        match (value.is_none(), run_start) {
            (true, None) => run_start = Some(idx),
            (false, Some(start)) => {
                gaps.push(Gap::new(start, idx - start));
                run_start = None;
            }
            _ => {}
        }
    }

    if let Some(start) = run_start {
        gaps.push(Gap::new(start, values.len() - start));
    }

    gaps
}

/// Number of missing entries in `values`
pub fn count_missing<T>(values: &[Option<T>]) -> usize {
    values.iter().filter(|v| v.is_none()).count()
}
