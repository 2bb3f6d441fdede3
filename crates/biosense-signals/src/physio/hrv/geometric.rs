//! Geometric HRV measures: histogram triangular index, TINN (approximated
//! by the interquartile range) and Poincare plot axes.

use std::collections::HashMap;

use super::time::successive_differences;
use super::{HrvConfig, HrvMetricSet};
use crate::dsp::stats::{finite, percentile, std_dev};

/// Total count divided by the modal histogram bin count.
pub(super) fn triangular_index(rr: &[f32], bin_ms: f32) -> Option<f32> {
    if rr.is_empty() || bin_ms <= 0.0 {
        return None;
    }
    let mut bins: HashMap<i64, usize> = HashMap::new();
    for v in rr {
        *bins.entry((v / bin_ms).floor() as i64).or_insert(0) += 1;
    }
    let mode = bins.values().copied().max()?;
    finite(rr.len() as f32 / mode as f32)
}

pub(super) fn tinn(rr: &[f32]) -> Option<f32> {
    let q1 = percentile(rr, 25.0)?;
    let q3 = percentile(rr, 75.0)?;
    finite(q3 - q1)
}

/// SD1 and SD2 of the Poincare plot.
///
/// `SD1^2 = SDSD^2 / 2`, `SD2^2 = 2 SDNN^2 - SDSD^2 / 2`.
pub(super) fn poincare(rr: &[f32]) -> Option<(f32, f32)> {
    let sdnn = std_dev(rr)?;
    let sdsd = std_dev(&successive_differences(rr))?;
    let sd1_sq = 0.5 * sdsd * sdsd;
    let sd2_sq = (2.0 * sdnn * sdnn - sd1_sq).max(0.0);
    Some((finite(sd1_sq.sqrt())?, finite(sd2_sq.sqrt())?))
}

pub(super) fn fill(rr: &[f32], config: &HrvConfig, set: &mut HrvMetricSet) {
    set.triangular_index = triangular_index(rr, config.histogram_bin_ms);
    set.tinn_ms = tinn(rr);
    if let Some((sd1, sd2)) = poincare(rr) {
        set.sd1_ms = Some(sd1);
        set.sd2_ms = Some(sd2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_triangular_index() {
        // 3 values share one 7.8125 ms bin, the other 3 are spread out
        let rr = [800.0, 801.0, 802.0, 850.0, 900.0, 950.0];
        assert_relative_eq!(triangular_index(&rr, 7.8125).unwrap(), 2.0);
    }

    #[test]
    fn test_tinn_is_iqr() {
        let rr: Vec<f32> = (0..=100).map(|i| 700.0 + i as f32).collect();
        assert_relative_eq!(tinn(&rr).unwrap(), 50.0, epsilon = 1e-3);
    }

    #[test]
    fn test_poincare_alternating_series() {
        // Pure beat-to-beat alternation: SD1 carries the variability
        let rr: Vec<f32> = (0..40).map(|i| if i % 2 == 0 { 780.0 } else { 820.0 }).collect();
        let (sd1, sd2) = poincare(&rr).unwrap();
        assert!(sd1 > sd2);
        assert_relative_eq!(sd1, 40.0 / 2f32.sqrt(), epsilon = 0.5);
    }
}
