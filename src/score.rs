//! Timing aggregation and score interpolation.
//!
//! Timings are aggregated with a geometric mean and mapped to a score through
//! a monotone piecewise curve. Between two breakpoints `(L, s_L)` and
//! `(R, s_R)` the score is interpolated linearly in `1/T`:
//!
//! ```text
//! score(T) = s_R + (s_L - s_R) · (1/T - 1/R) / (1/L - 1/R)      for L < T <= R
//! ```
//!
//! which is continuous at every breakpoint. Anything at or below the first
//! breakpoint scores 100; anything above the last scores 0.

/// `(milliseconds, score)` breakpoints in increasing time order.
pub const BREAKPOINTS: [(f64, f64); 5] = [
    (1.19, 100.0),
    (4.68, 90.0),
    (5.71, 80.0),
    (8.66, 60.0),
    (281.56, 0.0),
];

/// Number of timed runs in a performance evaluation.
pub const DEFAULT_PERF_RUNS: usize = 10;

/// Geometric mean of the samples, or `None` for an empty slice.
///
/// A zero sample drives the mean to zero rather than failing.
pub fn geomean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let log_sum: f64 = samples.iter().map(|&t| libm::log(t)).sum();
    Some(libm::exp(log_sum / samples.len() as f64))
}

/// Linear interpolation in reciprocal time between `(left, hi)` and
/// `(right, lo)`.
#[inline]
fn rlerp(lo: f64, hi: f64, left: f64, right: f64, t: f64) -> f64 {
    lo + (hi - lo) * (1.0 / t - 1.0 / right) / (1.0 / left - 1.0 / right)
}

/// Score for a geometric-mean time in milliseconds.
pub fn score(geomean_ms: f64) -> f64 {
    let (first_ms, first_score) = BREAKPOINTS[0];
    if geomean_ms <= first_ms {
        return first_score;
    }
    for pair in BREAKPOINTS.windows(2) {
        let ((left, hi), (right, lo)) = (pair[0], pair[1]);
        if geomean_ms <= right {
            return rlerp(lo, hi, left, right, geomean_ms);
        }
    }
    BREAKPOINTS[BREAKPOINTS.len() - 1].1
}

/// Geometric mean and score of a set of timings.
pub fn evaluate(samples_ms: &[f64]) -> Option<(f64, f64)> {
    geomean(samples_ms).map(|g| (g, score(g)))
}
