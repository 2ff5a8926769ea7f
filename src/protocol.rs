//! The text protocol spoken by simulator programs.
//!
//! A simulator prints two lines of interest:
//!
//! ```text
//! Final state: alpha = 1.000000000000 + 0.000000000000i, beta = 0.000000000000 + 0.000000000000i
//! Time taken: 3.14 ms
//! ```
//!
//! Answers are compared as strings after [`normalize_output`], which folds
//! negative zero into zero. There is no numeric tolerance.

use alloc::string::String;
use num_complex::Complex64;

/// Prefix of the answer line.
pub const FINAL_STATE_PREFIX: &str = "Final state:";

/// Prefix of the timing line.
pub const TIMING_PREFIX: &str = "Time taken: ";

/// Placeholder answer for output with no Final-state line.
pub const INVALID_OUTPUT: &str = "<invalid output>";

/// Timing assumed when a run reports none, in milliseconds.
pub const MISSING_TIMING_MS: f64 = 1e9;

/// Canonicalize an answer line for comparison.
pub fn normalize_output(output: &str) -> String {
    output
        .replace("-0.0000000000", "0.0000000000")
        .trim()
        .into()
}

/// True if two answer lines are equal after normalization.
pub fn answers_match(expected: &str, actual: &str) -> bool {
    normalize_output(expected) == normalize_output(actual)
}

/// The first line starting with [`FINAL_STATE_PREFIX`], trimmed.
pub fn find_answer(output: &str) -> Option<&str> {
    output
        .lines()
        .find(|line| line.starts_with(FINAL_STATE_PREFIX))
        .map(str::trim)
}

/// The milliseconds reported by the first [`TIMING_PREFIX`] line.
///
/// Only the first whitespace-separated token after the prefix is parsed, so
/// `Time taken: 12.50 ms` yields `12.5`.
pub fn find_timing(output: &str) -> Option<f64> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix(TIMING_PREFIX))
        .next()
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|token| token.parse().ok())
}

/// Final amplitudes of a run, rendered as the answer line by `Display`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalState {
    pub alpha: Complex64,
    pub beta: Complex64,
}

impl FinalState {
    pub fn new(alpha: Complex64, beta: Complex64) -> Self {
        Self { alpha, beta }
    }
}

impl core::fmt::Display for FinalState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} alpha = {:.12} + {:.12}i, beta = {:.12} + {:.12}i",
            FINAL_STATE_PREFIX, self.alpha.re, self.alpha.im, self.beta.re, self.beta.im
        )
    }
}
