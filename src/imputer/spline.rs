//! Short-gap interpolation.
//!
//! Short gaps are filled from a not-a-knot cubic spline fitted through
//! every valid point of the station's series, with x = position in the
//! series. Gaps touching either end of the series, series with too few
//! points for a cubic, and numerically failed fits fall back to linear
//! interpolation that holds the edge value beyond the first/last valid
//! point.

use crate::constants::{MIN_INTERPOLATION_POINTS, MIN_SPLINE_POINTS, SPLINE_PIVOT_EPSILON};
use crate::models::Gap;
use thiserror::Error;
use tracing::debug;

/// Reasons a cubic spline cannot be fitted
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplineError {
    #[error("need at least {required} points, found {found}")]
    TooFewPoints { found: usize, required: usize },

    #[error("x coordinates must be strictly increasing (index {index})")]
    NonIncreasing { index: usize },

    #[error("x and y lengths differ ({xs} vs {ys})")]
    LengthMismatch { xs: usize, ys: usize },

    #[error("singular system at row {row}")]
    Singular { row: usize },

    #[error("non-finite coefficient at row {row}")]
    NonFinite { row: usize },
}

/// Interpolating cubic spline with not-a-knot end conditions
#[derive(Debug, Clone)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivative at each knot
    moments: Vec<f64>,
}

impl CubicSpline {
    /// Fit a spline through `(xs[i], ys[i])`; `xs` must be strictly increasing
    pub fn fit(xs: &[f64], ys: &[f64]) -> Result<Self, SplineError> {
        if xs.len() != ys.len() {
            return Err(SplineError::LengthMismatch {
                xs: xs.len(),
                ys: ys.len(),
            });
        }
        let n = xs.len();
        if n < MIN_SPLINE_POINTS {
            return Err(SplineError::TooFewPoints {
                found: n,
                required: MIN_SPLINE_POINTS,
            });
        }

        let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
        if let Some(index) = h.iter().position(|&step| !(step > 0.0)) {
            return Err(SplineError::NonIncreasing { index: index + 1 });
        }
        let slopes: Vec<f64> = ys
            .windows(2)
            .zip(&h)
            .map(|(w, step)| (w[1] - w[0]) / step)
            .collect();

        // Tridiagonal system for the interior moments M[1..n-1]; the
        // not-a-knot conditions eliminate M[0] and M[n-1].
        let m = n - 2;
        let mut sub = vec![0.0; m];
        let mut diag = vec![0.0; m];
        let mut sup = vec![0.0; m];
        let mut rhs = vec![0.0; m];

        for k in 0..m {
            let i = k + 1;
            sub[k] = h[i - 1];
            diag[k] = 2.0 * (h[i - 1] + h[i]);
            sup[k] = h[i];
            rhs[k] = 6.0 * (slopes[i] - slopes[i - 1]);
        }

        // Third derivative continuous at x[1]
        let (h0, h1) = (h[0], h[1]);
        diag[0] += h0 + h0 * h0 / h1;
        sup[0] -= h0 * h0 / h1;
        sub[0] = 0.0;

        // Third derivative continuous at x[n-2]
        let (hl, hp) = (h[n - 2], h[n - 3]);
        diag[m - 1] += hl + hl * hl / hp;
        sub[m - 1] -= hl * hl / hp;
        sup[m - 1] = 0.0;

        let interior = solve_tridiagonal(&sub, &diag, &sup, &rhs)?;

        let mut moments = Vec::with_capacity(n);
        moments.push((1.0 + h0 / h1) * interior[0] - (h0 / h1) * interior[1]);
        moments.extend_from_slice(&interior);
        moments.push((1.0 + hl / hp) * interior[m - 1] - (hl / hp) * interior[m - 2]);

        if let Some(row) = moments.iter().position(|v| !v.is_finite()) {
            return Err(SplineError::NonFinite { row });
        }

        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            moments,
        })
    }

    /// Evaluate the spline, extrapolating with the end pieces outside the knots
    pub fn evaluate(&self, x: f64) -> f64 {
        let last_interval = self.xs.len() - 2;
        let i = self
            .xs
            .partition_point(|&knot| knot <= x)
            .saturating_sub(1)
            .min(last_interval);

        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        let (m0, m1) = (self.moments[i], self.moments[i + 1]);
        let h = x1 - x0;
        let left = x1 - x;
        let right = x - x0;

        m0 * left.powi(3) / (6.0 * h)
            + m1 * right.powi(3) / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * left
            + (y1 / h - m1 * h / 6.0) * right
    }
}

/// Thomas algorithm; `sub[0]` and `sup[n-1]` are ignored
fn solve_tridiagonal(
    sub: &[f64],
    diag: &[f64],
    sup: &[f64],
    rhs: &[f64],
) -> Result<Vec<f64>, SplineError> {
    let n = diag.len();
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];

    if diag[0].abs() < SPLINE_PIVOT_EPSILON {
        return Err(SplineError::Singular { row: 0 });
    }
    c_prime[0] = sup[0] / diag[0];
    d_prime[0] = rhs[0] / diag[0];

    for i in 1..n {
        let pivot = diag[i] - sub[i] * c_prime[i - 1];
        if pivot.abs() < SPLINE_PIVOT_EPSILON || !pivot.is_finite() {
            return Err(SplineError::Singular { row: i });
        }
        c_prime[i] = if i + 1 < n { sup[i] / pivot } else { 0.0 };
        d_prime[i] = (rhs[i] - sub[i] * d_prime[i - 1]) / pivot;
    }

    let mut solution = vec![0.0; n];
    solution[n - 1] = d_prime[n - 1];
    for i in (0..n - 1).rev() {
        solution[i] = d_prime[i] - c_prime[i] * solution[i + 1];
    }
    Ok(solution)
}

/// How a short gap ended up being filled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortGapFill {
    Spline,
    Linear,
    /// Fewer than two valid points in the whole series
    Unfilled,
}

/// Fills short gaps of one station/variable series
#[derive(Debug)]
pub struct ShortGapInterpolator {
    positions: Vec<usize>,
    values: Vec<f64>,
    spline: Option<CubicSpline>,
}

impl ShortGapInterpolator {
    /// Prepare an interpolator from the observed values of a series
    pub fn new(series: &[Option<f64>]) -> Self {
        let (positions, values): (Vec<usize>, Vec<f64>) = series
            .iter()
            .enumerate()
            .filter_map(|(pos, v)| v.map(|v| (pos, v)))
            .unzip();

        let spline = if positions.len() >= MIN_SPLINE_POINTS {
            let xs: Vec<f64> = positions.iter().map(|&p| p as f64).collect();
            match CubicSpline::fit(&xs, &values) {
                Ok(spline) => Some(spline),
                Err(e) => {
                    debug!("Cubic spline fit failed, using linear interpolation: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            positions,
            values,
            spline,
        }
    }

    /// Number of observed points available to the interpolator
    pub fn valid_points(&self) -> usize {
        self.positions.len()
    }

    /// Fill `gap` in `series` in place
    pub fn fill(&self, series: &mut [Option<f64>], gap: Gap) -> ShortGapFill {
        if self.positions.len() < MIN_INTERPOLATION_POINTS {
            return ShortGapFill::Unfilled;
        }

        let has_before = self.positions[0] < gap.start;
        let has_after = self.positions.last().is_some_and(|&p| p >= gap.end());

        if has_before && has_after {
            if let Some(spline) = &self.spline {
                let estimates: Vec<f64> = gap
                    .positions()
                    .map(|p| spline.evaluate(p as f64))
                    .collect();
                if estimates.iter().all(|v| v.is_finite()) {
                    for (p, estimate) in gap.positions().zip(estimates) {
                        series[p] = Some(estimate);
                    }
                    return ShortGapFill::Spline;
                }
                debug!(
                    "Spline produced non-finite values for gap at {}, using linear interpolation",
                    gap.start
                );
            }
        }

        for p in gap.positions() {
            series[p] = Some(self.linear_at(p));
        }
        ShortGapFill::Linear
    }

    /// Linear interpolation between the nearest observed neighbours,
    /// holding the edge value outside the observed range
    fn linear_at(&self, position: usize) -> f64 {
        let idx = self.positions.partition_point(|&p| p < position);
        if idx == 0 {
            return self.values[0];
        }
        if idx == self.positions.len() {
            return self.values[idx - 1];
        }

        let (x0, y0) = (self.positions[idx - 1] as f64, self.values[idx - 1]);
        let (x1, y1) = (self.positions[idx] as f64, self.values[idx]);
        y0 + (y1 - y0) * (position as f64 - x0) / (x1 - x0)
    }
}
