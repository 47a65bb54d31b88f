//! Climatology lookups and long-gap imputation.
//!
//! For one station and variable, observed values are grouped once by
//! calendar key (month, day, hour) into running means. Each position of a
//! long gap is then served by the first available estimate of:
//! same-key mean, station mean, dataset mean. Positions with none of the
//! three stay missing.

use crate::imputer::stats::FallbackTally;
use crate::models::{ClimatologyKey, FallbackLevel, Gap};
use std::collections::HashMap;

/// Running sum and count for an arithmetic mean
#[derive(Debug, Default, Clone, Copy)]
struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Mean of the non-missing entries, `None` if there are none
pub fn mean_of(values: &[Option<f64>]) -> Option<f64> {
    let mut acc = MeanAccumulator::default();
    values.iter().flatten().for_each(|v| acc.add(*v));
    acc.mean()
}

/// Same-calendar-key means and the overall mean for one station/variable
#[derive(Debug, Clone, Default)]
pub struct Climatology {
    means: HashMap<ClimatologyKey, f64>,
    station_mean: Option<f64>,
}

impl Climatology {
    /// Group observed values by calendar key in a single pass.
    ///
    /// `keys` and `values` are parallel slices over the station's rows.
    /// Rows with a missing value or no key contribute nothing to the
    /// calendar map; every observed value counts toward the station mean.
    pub fn build(keys: &[Option<ClimatologyKey>], values: &[Option<f64>]) -> Self {
        let mut groups: HashMap<ClimatologyKey, MeanAccumulator> = HashMap::new();
        let mut overall = MeanAccumulator::default();

        for (key, value) in keys.iter().zip(values) {
            let Some(value) = value else { continue };
            overall.add(*value);
            if let Some(key) = key {
                groups.entry(*key).or_default().add(*value);
            }
        }

        let means = groups
            .into_iter()
            .filter_map(|(key, acc)| acc.mean().map(|mean| (key, mean)))
            .collect();

        Self {
            means,
            station_mean: overall.mean(),
        }
    }

    pub fn lookup(&self, key: &ClimatologyKey) -> Option<f64> {
        self.means.get(key).copied()
    }

    pub fn station_mean(&self) -> Option<f64> {
        self.station_mean
    }

    /// Number of calendar keys with at least one observation
    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }
}

/// Fills long gaps from a station climatology and a dataset-wide mean
#[derive(Debug)]
pub struct LongGapImputer<'a> {
    climatology: &'a Climatology,
    dataset_mean: Option<f64>,
}

impl<'a> LongGapImputer<'a> {
    pub fn new(climatology: &'a Climatology, dataset_mean: Option<f64>) -> Self {
        Self {
            climatology,
            dataset_mean,
        }
    }

    /// Estimate for a single timestamp and the fallback level that produced it
    pub fn estimate(&self, key: Option<&ClimatologyKey>) -> (Option<f64>, FallbackLevel) {
        if let Some(mean) = key.and_then(|k| self.climatology.lookup(k)) {
            return (Some(mean), FallbackLevel::Climatology);
        }
        if let Some(mean) = self.climatology.station_mean() {
            return (Some(mean), FallbackLevel::StationMean);
        }
        if let Some(mean) = self.dataset_mean {
            return (Some(mean), FallbackLevel::DatasetMean);
        }
        (None, FallbackLevel::Unresolved)
    }

    /// Fill every position of `gap` independently
    pub fn fill(
        &self,
        series: &mut [Option<f64>],
        keys: &[Option<ClimatologyKey>],
        gap: Gap,
    ) -> FallbackTally {
        let mut tally = FallbackTally::default();
        for pos in gap.positions() {
            let (estimate, level) = self.estimate(keys[pos].as_ref());
            series[pos] = estimate;
            tally.record(level);
        }
        tally
    }
}
