//! Spectral shape features: centroid, rolloff, flux, high-band energy and a
//! simplified MFCC (triangular mel filterbank, log energies, DCT-II).

use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::dsp::{apply_hamming, stats, Spectrum};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    /// Energy fraction defining the rolloff frequency
    pub rolloff_fraction: f32,
    pub mel_bands: usize,
    pub mfcc_count: usize,
    /// Lower edge of the high band used by the stress heuristic (Hz)
    pub high_band_hz: f32,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            rolloff_fraction: 0.85,
            mel_bands: 26,
            mfcc_count: 13,
            high_band_hz: 2000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFeatures {
    pub centroid_hz: f32,
    pub rolloff_hz: f32,
    /// Distance to the previous frame's normalized spectrum; `None` on the first frame
    pub flux: Option<f32>,
    /// Share of power above `high_band_hz`
    pub high_band_ratio: f32,
    pub mfcc: Vec<f32>,
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Log mel-band energies followed by a DCT-II.
pub fn mfcc(power: &[f32], bin_hz: f32, sample_rate: f32, bands: usize, count: usize) -> Vec<f32> {
    if power.is_empty() || bands == 0 || bin_hz <= 0.0 {
        return Vec::new();
    }
    let mel_max = hz_to_mel(sample_rate / 2.0);
    let edges: Vec<f32> = (0..bands + 2)
        .map(|i| mel_to_hz(mel_max * i as f32 / (bands + 1) as f32))
        .collect();

    let log_energies: Vec<f32> = (0..bands)
        .map(|b| {
            let (lo, mid, hi) = (edges[b], edges[b + 1], edges[b + 2]);
            let energy: f32 = power
                .iter()
                .enumerate()
                .map(|(k, p)| {
                    let f = k as f32 * bin_hz;
                    let w = if f <= lo || f >= hi {
                        0.0
                    } else if f <= mid {
                        (f - lo) / (mid - lo)
                    } else {
                        (hi - f) / (hi - mid)
                    };
                    w * p
                })
                .sum();
            energy.max(1e-10).ln()
        })
        .collect();

    let m = bands as f32;
    (0..count.min(bands))
        .map(|k| {
            log_energies
                .iter()
                .enumerate()
                .map(|(i, e)| e * (PI * k as f32 * (i as f32 + 0.5) / m).cos())
                .sum()
        })
        .collect()
}

/// Computes [`SpectralFeatures`] and remembers the last spectrum for flux
#[derive(Debug, Clone, Default)]
pub struct SpectralTracker {
    previous: Option<Vec<f32>>,
}

impl SpectralTracker {
    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn analyze(
        &mut self,
        planner: &mut FftPlanner<f32>,
        samples: &[f32],
        sample_rate: u32,
        config: &SpectralConfig,
    ) -> Option<SpectralFeatures> {
        let sr = sample_rate as f32;
        let mut x = samples.to_vec();
        stats::detrend_mean(&mut x);
        apply_hamming(&mut x);
        let spectrum = Spectrum::compute_with(planner, &x, sr, 0)?;

        let total: f32 = spectrum.power.iter().sum();
        if total <= f32::EPSILON {
            return None;
        }
        let magnitude: Vec<f32> = spectrum.power.iter().map(|p| p.sqrt()).collect();
        let mag_sum: f32 = magnitude.iter().sum();

        let centroid_hz = magnitude
            .iter()
            .enumerate()
            .map(|(k, m)| spectrum.frequency_of(k as f32) * m)
            .sum::<f32>()
            / mag_sum;

        let mut cumulative = 0.0f32;
        let target = config.rolloff_fraction.clamp(0.0, 1.0) * total;
        let mut rolloff_hz = sr / 2.0;
        for (k, p) in spectrum.power.iter().enumerate() {
            cumulative += p;
            if cumulative >= target {
                rolloff_hz = spectrum.frequency_of(k as f32);
                break;
            }
        }

        let high: f32 = spectrum
            .power
            .iter()
            .enumerate()
            .filter(|(k, _)| spectrum.frequency_of(*k as f32) >= config.high_band_hz)
            .map(|(_, p)| p)
            .sum();

        let norm = magnitude.iter().map(|m| m * m).sum::<f32>().sqrt();
        let normalized: Vec<f32> = magnitude.iter().map(|m| m / norm).collect();
        let flux = self
            .previous
            .as_ref()
            .filter(|prev| prev.len() == normalized.len())
            .map(|prev| {
                prev.iter()
                    .zip(&normalized)
                    .map(|(a, b)| (b - a).powi(2))
                    .sum::<f32>()
                    .sqrt()
            });
        self.previous = Some(normalized);

        Some(SpectralFeatures {
            centroid_hz,
            rolloff_hz,
            flux,
            high_band_ratio: high / total,
            mfcc: mfcc(
                &spectrum.power,
                spectrum.bin_hz,
                sr,
                config.mel_bands,
                config.mfcc_count,
            ),
        })
    }
}
