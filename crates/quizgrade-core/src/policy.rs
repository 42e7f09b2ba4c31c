//! Threshold policy turning a similarity score into a verdict.

use crate::model::Verdict;

/// Threshold applied when none is configured.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// `score > threshold` is correct. Equality and NaN are incorrect.
pub fn decide(score: f64, threshold: f64) -> Verdict {
    if score > threshold {
        Verdict::Correct
    } else {
        Verdict::Incorrect
    }
}
