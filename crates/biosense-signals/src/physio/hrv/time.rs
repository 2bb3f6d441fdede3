//! Time-domain HRV statistics.

use super::HrvMetricSet;
use crate::dsp::stats::{finite, mean, std_dev};

/// Successive differences `rr[i+1] - rr[i]`.
pub(super) fn successive_differences(rr: &[f32]) -> Vec<f32> {
    rr.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Root mean square of successive differences.
pub(super) fn rmssd(diffs: &[f32]) -> Option<f32> {
    if diffs.is_empty() {
        return None;
    }
    finite((diffs.iter().map(|d| d * d).sum::<f32>() / diffs.len() as f32).sqrt())
}

/// Percentage of successive differences whose magnitude exceeds `threshold_ms`.
pub(super) fn pnn(diffs: &[f32], threshold_ms: f32) -> Option<f32> {
    if diffs.is_empty() {
        return None;
    }
    let count = diffs.iter().filter(|d| d.abs() > threshold_ms).count();
    Some(100.0 * count as f32 / diffs.len() as f32)
}

pub(super) fn fill(rr: &[f32], set: &mut HrvMetricSet) {
    let diffs = successive_differences(rr);

    set.mean_rr_ms = mean(rr).and_then(finite);
    set.mean_hr_bpm = set
        .mean_rr_ms
        .filter(|m| *m > 0.0)
        .and_then(|m| finite(60_000.0 / m));
    set.rmssd_ms = rmssd(&diffs);
    set.sdnn_ms = std_dev(rr).and_then(finite);
    set.pnn50 = pnn(&diffs, 50.0);
    set.pnn20 = pnn(&diffs, 20.0);
    set.sdsd_ms = std_dev(&diffs).and_then(finite);
}
