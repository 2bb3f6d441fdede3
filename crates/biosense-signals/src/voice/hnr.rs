//! Harmonic-to-noise ratio
//!
//! With a known F0 the frame is fitted by least squares with a harmonic
//! comb (sine and cosine at each multiple of F0 below Nyquist). HNR is the
//! power of that fit over the power of the residual. Without F0 a spectral
//! estimate is used instead: strongest voice-band bin over the median bin.

use nalgebra::{DMatrix, DVector};
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::dsp::{apply_hamming, stats, Spectrum};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnrConfig {
    pub max_harmonics: usize,
    /// Reported HNR is clamped to this range (dB)
    pub min_db: f32,
    pub max_db: f32,
    /// Band searched for the harmonic peak in the spectral fallback (Hz)
    pub fallback_band: (f32, f32),
}

impl Default for HnrConfig {
    fn default() -> Self {
        Self {
            max_harmonics: 10,
            min_db: -20.0,
            max_db: 60.0,
            fallback_band: (50.0, 1000.0),
        }
    }
}

fn to_db(ratio: f32) -> f32 {
    10.0 * ratio.max(f32::MIN_POSITIVE).log10()
}

/// Least-squares harmonic comb HNR in dB.
pub fn harmonic_comb_hnr(samples: &[f32], sample_rate: u32, f0: f32, config: &HnrConfig) -> Option<f32> {
    let sr = sample_rate as f32;
    if f0 <= 0.0 || !f0.is_finite() || sr <= 0.0 {
        return None;
    }
    let harmonics = ((0.95 * sr / 2.0 / f0).floor() as usize).min(config.max_harmonics);
    let n = samples.len();
    if harmonics == 0 || n < 4 * harmonics {
        return None;
    }

    let mut x = samples.to_vec();
    stats::detrend_mean(&mut x);

    let cols = 2 * harmonics;
    let basis = DMatrix::<f64>::from_fn(n, cols, |i, c| {
        let h = (c / 2 + 1) as f64;
        let phase = 2.0 * std::f64::consts::PI * h * f0 as f64 * i as f64 / sr as f64;
        if c % 2 == 0 {
            phase.sin()
        } else {
            phase.cos()
        }
    });
    let target = DVector::<f64>::from_iterator(n, x.iter().map(|v| *v as f64));

    let gram = basis.transpose() * &basis;
    let rhs = basis.transpose() * &target;
    let coefficients = gram.cholesky()?.solve(&rhs);
    let fitted = &basis * coefficients;
    let residual = &target - &fitted;

    let harmonic_power = fitted.norm_squared();
    let noise_power = residual.norm_squared();
    if harmonic_power <= 0.0 {
        return None;
    }
    let ratio = (harmonic_power / noise_power.max(harmonic_power * 1e-12)) as f32;
    let db = to_db(ratio);
    db.is_finite().then(|| db.clamp(config.min_db, config.max_db))
}

/// Spectral HNR estimate used when F0 is unavailable.
pub fn spectral_hnr(
    planner: &mut FftPlanner<f32>,
    samples: &[f32],
    sample_rate: u32,
    config: &HnrConfig,
) -> Option<f32> {
    let sr = sample_rate as f32;
    let mut x = samples.to_vec();
    stats::detrend_mean(&mut x);
    apply_hamming(&mut x);
    let spectrum = Spectrum::compute_with(planner, &x, sr, 0)?;
    let peak = spectrum.peak_in_band(config.fallback_band.0, config.fallback_band.1)?;
    let floor = stats::median(&spectrum.power)?;
    if floor <= 0.0 {
        return Some(config.max_db);
    }
    let db = to_db(peak.power / floor);
    db.is_finite().then(|| db.clamp(config.min_db, config.max_db))
}

/// Sine at `f0` with its first harmonics, for tests and synthetic sources.
pub fn synthetic_voice(f0: f32, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
    let sr = sample_rate as f32;
    (0..len)
        .map(|i| {
            let t = i as f32 / sr;
            amplitude
                * (0.6 * (2.0 * PI * f0 * t).sin()
                    + 0.3 * (2.0 * PI * 2.0 * f0 * t).sin()
                    + 0.1 * (2.0 * PI * 3.0 * f0 * t).sin())
        })
        .collect()
}
