//! Reduction of beat timestamps to a single BPM
//!
//! The estimate is the median of the instantaneous tempi between
//! consecutive beats. A median tolerates isolated octave errors and missed
//! beats that would drag a mean far off.

use crate::types::BpmEstimate;

/// Instantaneous BPM (`60 / interval`) for each pair of consecutive beats
///
/// Non-positive intervals (duplicate timestamps) carry no tempo and are
/// dropped.
pub fn instantaneous_bpms(beats: &[f64]) -> Vec<f64> {
    beats
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|&interval| interval > 0.0)
        .map(|interval| 60.0 / interval)
        .collect()
}

/// Median of `values`, averaging the two middle values for even counts
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) * 0.5)
    } else {
        Some(sorted[mid])
    }
}

/// Median instantaneous BPM, rounded to two decimals
///
/// Returns `None` when fewer than two beats (or no usable interval) exist.
pub fn median_bpm(beats: &[f64]) -> Option<BpmEstimate> {
    if beats.len() < 2 {
        return None;
    }
    median(&instantaneous_bpms(beats)).and_then(BpmEstimate::new)
}
