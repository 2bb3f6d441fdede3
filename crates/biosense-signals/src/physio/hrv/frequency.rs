//! Frequency-domain HRV
//!
//! The tachogram is linearly interpolated onto a uniform grid, mean-removed,
//! Hamming-windowed and transformed into a one-sided PSD (ms^2/Hz). Band
//! powers integrate that density.

use super::{HrvConfig, HrvMetricSet};
use crate::dsp::stats::{detrend_mean, finite};
use crate::dsp::{hamming_window, Spectrum};

/// Interpolate RR values (ms) at their beat times onto a `fs` Hz grid.
pub(super) fn resample(rr: &[f32], fs: f32) -> Vec<f32> {
    if rr.len() < 2 || fs <= 0.0 {
        return Vec::new();
    }
    let mut times = Vec::with_capacity(rr.len());
    let mut t = 0.0f32;
    for v in rr {
        t += v / 1000.0;
        times.push(t);
    }

    let start = times[0];
    let end = times[times.len() - 1];
    let step = 1.0 / fs;
    let count = ((end - start) / step).floor() as usize + 1;

    let mut out = Vec::with_capacity(count);
    let mut seg = 0;
    for i in 0..count {
        let ti = start + i as f32 * step;
        while seg + 2 < times.len() && times[seg + 1] < ti {
            seg += 1;
        }
        let (t0, t1) = (times[seg], times[seg + 1]);
        let frac = if t1 > t0 {
            ((ti - t0) / (t1 - t0)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        out.push(rr[seg] + frac * (rr[seg + 1] - rr[seg]));
    }
    out
}

pub(super) fn fill(rr: &[f32], config: &HrvConfig, set: &mut HrvMetricSet) {
    let fs = config.resample_hz;
    let mut samples = resample(rr, fs);
    if samples.len() < 4 {
        return;
    }
    detrend_mean(&mut samples);
    let window = hamming_window(samples.len());
    let energy: f32 = window.iter().map(|w| w * w).sum();
    for (s, w) in samples.iter_mut().zip(window.iter()) {
        *s *= w;
    }

    let Some(spectrum) = Spectrum::compute(&samples, fs, config.fft_size) else {
        return;
    };
    let psd = spectrum.into_density(fs, energy);

    let vlf = finite(psd.band_power(config.vlf_band.0, config.vlf_band.1));
    let lf = finite(psd.band_power(config.lf_band.0, config.lf_band.1));
    let hf = finite(psd.band_power(config.hf_band.0, config.hf_band.1));

    set.vlf_power = vlf;
    set.lf_power = lf;
    set.hf_power = hf;
    set.total_power = match (vlf, lf, hf) {
        (Some(v), Some(l), Some(h)) => finite(v + l + h),
        _ => None,
    };

    if let (Some(l), Some(h)) = (lf, hf) {
        if h > f32::EPSILON {
            set.lf_hf_ratio = finite(l / h);
        }
        let sum = l + h;
        if sum > f32::EPSILON {
            set.lf_nu = finite(100.0 * l / sum);
            set.hf_nu = finite(100.0 * h / sum);
        }
    }

    set.lf_peak_hz = psd
        .peak_in_band(config.lf_band.0, config.lf_band.1)
        .and_then(|p| finite(psd.frequency_of(p.refined_bin)));
    set.hf_peak_hz = psd
        .peak_in_band(config.hf_band.0, config.hf_band.1)
        .and_then(|p| finite(psd.frequency_of(p.refined_bin)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    #[test]
    fn test_resample_constant() {
        let rr = [1000.0; 10];
        let out = resample(&rr, 4.0);
        // beats at 1..10 s: 9 s span at 4 Hz
        assert_eq!(out.len(), 37);
        assert!(out.iter().all(|v| (*v - 1000.0).abs() < 1e-3));
    }

    #[test]
    fn test_resample_interpolates() {
        let out = resample(&[1000.0, 1000.0, 2000.0], 4.0);
        // halfway between beats 2 (t=2) and 3 (t=4) the value is 1500
        assert_relative_eq!(out[4], 1000.0, epsilon = 1e-3);
        assert_relative_eq!(out[8], 1500.0, epsilon = 1e-3);
    }

    /// RR series modulated at `freq_hz` (in beat time).
    fn modulated(freq_hz: f32, n: usize) -> Vec<f32> {
        let mut t = 0.0f32;
        (0..n)
            .map(|_| {
                let rr = 800.0 + 50.0 * (2.0 * PI * freq_hz * t).sin();
                t += rr / 1000.0;
                rr
            })
            .collect()
    }

    #[test]
    fn test_hf_modulation_dominates_hf_band() {
        let mut set = HrvMetricSet::default();
        fill(&modulated(0.25, 50), &HrvConfig::default(), &mut set);
        let (lf, hf) = (set.lf_power.unwrap(), set.hf_power.unwrap());
        assert!(hf > lf * 3.0, "lf {lf} hf {hf}");
        assert!(set.lf_hf_ratio.unwrap() < 0.5);
        assert_relative_eq!(set.lf_nu.unwrap() + set.hf_nu.unwrap(), 100.0, epsilon = 1e-3);
        assert!((set.hf_peak_hz.unwrap() - 0.25).abs() < 0.03);
    }

    #[test]
    fn test_lf_modulation_dominates_lf_band() {
        let mut set = HrvMetricSet::default();
        fill(&modulated(0.1, 50), &HrvConfig::default(), &mut set);
        assert!(set.lf_hf_ratio.unwrap() > 2.0);
    }

    #[test]
    fn test_constant_series_has_no_ratio() {
        let mut set = HrvMetricSet::default();
        fill(&[900.0; 20], &HrvConfig::default(), &mut set);
        assert!(set.lf_hf_ratio.is_none());
        assert!(set.lf_nu.is_none());
    }
}
