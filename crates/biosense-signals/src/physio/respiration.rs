//! Respiration rate from baseline modulation of the channel window
//!
//! # Algorithm
//!
//! ```text
//! raw green window
//!     │
//!     ├──► linear detrend
//!     ├──► high-pass 0.1 Hz, low-pass 0.5 Hz (3 stages)
//!     ├──► peak pick: above mean + k·std, ≥ 1.5 s apart
//!     └──► mean peak interval → breaths/min
//! ```
//!
//! Confidence mixes interval regularity with the spectral SNR of the
//! breathing band.

use serde::{Deserialize, Serialize};

use crate::dsp::stats::{self, finite};
use crate::dsp::{apply_hamming, bandpass_filter, detect_peaks, peak_intervals, FilterConfig, Spectrum};
use crate::rejection::Rejection;

/// Respiration estimation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RespirationConfig {
    pub sample_rate: f32,
    /// Breathing band (Hz)
    pub min_freq: f32,
    pub max_freq: f32,
    /// Cascaded low-pass stages
    pub low_pass_order: usize,
    /// Minimum spacing between breath peaks (s)
    pub min_peak_spacing_s: f32,
    /// Peak threshold in standard deviations above the mean
    pub peak_threshold_std: f32,
    pub min_peaks: usize,
    /// Minimum window length (samples)
    pub min_samples: usize,
    /// Accepted rate (breaths/min)
    pub min_rate: f32,
    pub max_rate: f32,
}

impl Default for RespirationConfig {
    fn default() -> Self {
        Self {
            sample_rate: 30.0,
            min_freq: 0.1,
            max_freq: 0.5,
            low_pass_order: 3,
            min_peak_spacing_s: 1.5,
            peak_threshold_std: 0.5,
            min_peaks: 3,
            min_samples: 300,
            min_rate: 8.0,
            max_rate: 40.0,
        }
    }
}

/// Respiration estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RespirationEstimate {
    /// Breaths per minute
    pub rate: f32,
    /// Confidence score (0-1)
    pub confidence: f32,
    pub peak_count: usize,
    /// Peak-to-band-mean power ratio of the breathing band
    pub snr: f32,
}

#[derive(Debug, Clone, Default)]
pub struct RespirationEstimator {
    cfg: RespirationConfig,
}

impl RespirationEstimator {
    pub fn new(cfg: RespirationConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &RespirationConfig {
        &self.cfg
    }

    /// Estimate the breathing rate from a raw channel window.
    pub fn estimate(&self, raw: &[f32]) -> Result<RespirationEstimate, Rejection> {
        let n = raw.len();
        let need = self.cfg.min_samples.max(16);
        if n < need {
            return Err(Rejection::need(n, need));
        }
        if raw.iter().any(|v| !v.is_finite()) {
            return Err(Rejection::MalformedInput);
        }

        let filtered = self.breathing_signal(raw);
        // Skip the filter settling time
        let settle = (self.cfg.sample_rate as usize).min(filtered.len() / 4);
        let signal = &filtered[settle..];

        let min_gap = (self.cfg.min_peak_spacing_s * self.cfg.sample_rate).round() as usize;
        let peaks = detect_peaks(signal, self.cfg.peak_threshold_std, min_gap);
        let min_peaks = self.cfg.min_peaks.max(2);
        if peaks.len() < min_peaks {
            return Err(Rejection::need(peaks.len(), min_peaks));
        }

        let (mean_gap, cv) = peak_intervals(&peaks).ok_or(Rejection::QualityRejected)?;
        let rate = finite(60.0 * self.cfg.sample_rate / mean_gap).ok_or(Rejection::QualityRejected)?;
        if rate < self.cfg.min_rate || rate > self.cfg.max_rate {
            log::debug!("respiration {:.1} br/min outside range", rate);
            return Err(Rejection::OutOfPhysiologicalRange);
        }

        let regularity = (1.0 - cv).clamp(0.0, 1.0);
        let snr = self.band_snr(signal);
        let snr_score = ((snr - 1.0) / (snr + 1.0)).clamp(0.0, 1.0);
        let confidence = 0.5 * regularity + 0.5 * snr_score;

        Ok(RespirationEstimate {
            rate,
            confidence,
            peak_count: peaks.len(),
            snr,
        })
    }

    fn breathing_signal(&self, raw: &[f32]) -> Vec<f32> {
        let x: Vec<f32> = (0..raw.len()).map(|i| i as f32).collect();
        let detrended: Vec<f32> = match stats::linear_fit(&x, raw) {
            Some((slope, intercept)) => raw
                .iter()
                .enumerate()
                .map(|(i, v)| v - (slope * i as f32 + intercept))
                .collect(),
            None => raw.to_vec(),
        };
        let config = FilterConfig {
            sample_rate: self.cfg.sample_rate,
            min_freq: self.cfg.min_freq,
            max_freq: self.cfg.max_freq,
            high_pass_order: 1,
            low_pass_order: self.cfg.low_pass_order,
        };
        bandpass_filter(&detrended, &config)
    }

    fn band_snr(&self, signal: &[f32]) -> f32 {
        let mut windowed = signal.to_vec();
        apply_hamming(&mut windowed);
        let Some(spectrum) = Spectrum::compute(&windowed, self.cfg.sample_rate, 4096) else {
            return 0.0;
        };
        let Some(bins) = spectrum.band_bins(self.cfg.min_freq, self.cfg.max_freq) else {
            return 0.0;
        };
        let band: Vec<f32> = bins.map(|k| spectrum.power[k]).collect();
        let peak = band.iter().copied().fold(0.0f32, f32::max);
        match stats::mean(&band) {
            Some(m) if m > f32::EPSILON => peak / m,
            _ => 0.0,
        }
    }
}
