//! Nonlinear HRV: sample entropy, approximate entropy and detrended
//! fluctuation analysis.

use super::{DfaScales, HrvConfig, HrvMetricSet};
use crate::dsp::stats::{finite, linear_fit, mean, std_dev};

/// Chebyshev distance between the length-`m` templates at `i` and `j`.
#[inline]
fn within(x: &[f32], i: usize, j: usize, m: usize, r: f32) -> bool {
    (0..m).all(|k| (x[i + k] - x[j + k]).abs() <= r)
}

/// Sample entropy `-ln(A / B)`, self-matches excluded.
///
/// `B` counts template pairs matching at length `m`, `A` at `m + 1`, both
/// over the same `N - m` templates.
pub(super) fn sample_entropy(x: &[f32], m: usize, r: f32) -> Option<f32> {
    let n = x.len();
    if m == 0 || n <= m + 1 {
        return None;
    }
    let templates = n - m;
    let mut b = 0u64;
    let mut a = 0u64;
    for i in 0..templates {
        for j in (i + 1)..templates {
            if within(x, i, j, m, r) {
                b += 1;
                if (x[i + m] - x[j + m]).abs() <= r {
                    a += 1;
                }
            }
        }
    }
    if a == 0 || b == 0 {
        return None;
    }
    finite(-((a as f64 / b as f64).ln()) as f32)
}

/// Approximate entropy `phi(m) - phi(m + 1)`, self-matches included.
pub(super) fn approximate_entropy(x: &[f32], m: usize, r: f32) -> Option<f32> {
    let n = x.len();
    if m == 0 || n <= m + 1 {
        return None;
    }
    let phi = |len: usize| -> f64 {
        let templates = n - len + 1;
        let mut total = 0.0f64;
        for i in 0..templates {
            let matches = (0..templates).filter(|&j| within(x, i, j, len, r)).count();
            total += (matches as f64 / templates as f64).ln();
        }
        total / templates as f64
    };
    finite((phi(m) - phi(m + 1)) as f32)
}

/// Root-mean-square fluctuation of the integrated series at one scale.
fn fluctuation(profile: &[f32], scale: usize) -> Option<f32> {
    let segments = profile.len() / scale;
    if segments == 0 || scale < 2 {
        return None;
    }
    let x: Vec<f32> = (0..scale).map(|i| i as f32).collect();
    let mut sum_sq = 0.0f64;
    for s in 0..segments {
        let seg = &profile[s * scale..(s + 1) * scale];
        let (slope, intercept) = linear_fit(&x, seg)?;
        for (i, y) in seg.iter().enumerate() {
            let resid = y - (slope * i as f32 + intercept);
            sum_sq += (resid as f64).powi(2);
        }
    }
    let f = (sum_sq / (segments * scale) as f64).sqrt() as f32;
    (f > 0.0 && f.is_finite()).then_some(f)
}

/// DFA scaling exponent over `scales` (inclusive, capped at `n / 2`).
pub(super) fn dfa_alpha(x: &[f32], scales: DfaScales) -> Option<f32> {
    let m = mean(x)?;
    let mut acc = 0.0f32;
    let profile: Vec<f32> = x
        .iter()
        .map(|v| {
            acc += v - m;
            acc
        })
        .collect();

    let max = scales.max.min(x.len() / 2);
    let min = scales.min.max(2);
    if max < min {
        return None;
    }
    let (log_n, log_f): (Vec<f32>, Vec<f32>) = (min..=max)
        .filter_map(|s| fluctuation(&profile, s).map(|f| ((s as f32).ln(), f.ln())))
        .unzip();
    if log_n.len() < 2 {
        return None;
    }
    linear_fit(&log_n, &log_f).and_then(|(slope, _)| finite(slope))
}

pub(super) fn fill(rr: &[f32], config: &HrvConfig, set: &mut HrvMetricSet) {
    let r = std_dev(rr).map(|sd| config.entropy_r * sd).unwrap_or(0.0);
    let m = config.entropy_m;

    set.sample_entropy = sample_entropy(rr, m, r);
    set.approximate_entropy = approximate_entropy(rr, m, r);
    set.dfa_alpha1 = dfa_alpha(rr, config.dfa_short);
    set.dfa_alpha2 = dfa_alpha(rr, config.dfa_long);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn white_noise(n: usize, seed: u64) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(800.0f32, 40.0).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    #[test]
    fn test_regular_series_has_low_entropy() {
        let periodic: Vec<f32> = (0..50).map(|i| [780.0, 800.0, 820.0][i % 3]).collect();
        let noise = white_noise(50, 7);

        let r_p = 0.2 * std_dev(&periodic).unwrap();
        let r_n = 0.2 * std_dev(&noise).unwrap();

        let ap_periodic = approximate_entropy(&periodic, 2, r_p).unwrap();
        let ap_noise = approximate_entropy(&noise, 2, r_n).unwrap();
        assert!(ap_periodic < ap_noise);

        let se_periodic = sample_entropy(&periodic, 2, r_p).unwrap();
        assert!(se_periodic.abs() < 1e-6);
    }

    #[test]
    fn test_sample_entropy_absent_without_matches() {
        // strictly increasing with r = 0: no template ever matches
        let x: Vec<f32> = (0..20).map(|i| i as f32).collect();
        assert!(sample_entropy(&x, 2, 0.0).is_none());
    }

    #[test]
    fn test_dfa_white_noise_near_half() {
        let noise = white_noise(400, 11);
        let alpha = dfa_alpha(&noise, DfaScales { min: 4, max: 16 }).unwrap();
        assert!(alpha > 0.3 && alpha < 0.75, "alpha {alpha}");
    }

    #[test]
    fn test_dfa_random_walk_steeper() {
        let steps = white_noise(400, 3);
        let mut acc = 0.0f32;
        let walk: Vec<f32> = steps
            .iter()
            .map(|s| {
                acc += s - 800.0;
                800.0 + acc
            })
            .collect();
        let alpha = dfa_alpha(&walk, DfaScales { min: 4, max: 16 }).unwrap();
        assert!(alpha > 1.2, "alpha {alpha}");
    }

    #[test]
    fn test_dfa_needs_two_scales() {
        let noise = white_noise(9, 1);
        // n / 2 = 4 leaves only scale 4
        assert!(dfa_alpha(&noise, DfaScales { min: 4, max: 11 }).is_none());
    }
}
