//! FFT heart-rate analysis
//!
//! The conditioned window is zero-padded to `fft_size`, the strongest bin
//! in the cardiac band is refined by parabolic interpolation and then has
//! to clear an SNR gate against the in-band noise floor. Power at twice the
//! candidate frequency is scored as harmonic evidence.

use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

use super::conditioner::ConditionedWindow;
use crate::dsp::Spectrum;
use crate::rejection::Rejection;

/// Quality weights: SNR, harmonic consistency, motion-free window
const SNR_WEIGHT: f32 = 0.6;
const HARMONIC_WEIGHT: f32 = 0.25;
const MOTION_WEIGHT: f32 = 0.15;

/// Frequency analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyConfig {
    /// Minimum transform length (zero-padded, power of two)
    pub fft_size: usize,
    /// Peak search band (Hz)
    pub min_hz: f32,
    pub max_hz: f32,
    /// Peak-to-noise-floor power ratio required to accept
    pub min_snr: f32,
    /// Expected second-harmonic power relative to the fundamental
    pub harmonic_min_ratio: f32,
    pub harmonic_max_ratio: f32,
    /// Accepted heart-rate range (BPM)
    pub min_bpm: u32,
    pub max_bpm: u32,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            min_hz: 0.75,
            max_hz: 3.5,
            min_snr: 2.0,
            harmonic_min_ratio: 0.1,
            harmonic_max_ratio: 0.5,
            min_bpm: 45,
            max_bpm: 200,
        }
    }
}

/// Candidate cardiac peak from one analysis cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrequencyPeak {
    pub frequency_hz: f32,
    pub power: f32,
    pub snr: f32,
    /// 1.0 when the second harmonic sits in the expected ratio band
    pub harmonic_confidence: f32,
}

/// Per-cycle heart-rate estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateEstimate {
    pub bpm: u32,
    pub quality: f32,
    pub ts_us: i64,
}

/// Spectral heart-rate estimator
pub struct FrequencyAnalyzer {
    config: FrequencyConfig,
    planner: FftPlanner<f32>,
}

impl Default for FrequencyAnalyzer {
    fn default() -> Self {
        Self::new(FrequencyConfig::default())
    }
}

impl std::fmt::Debug for FrequencyAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrequencyAnalyzer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FrequencyAnalyzer {
    pub fn new(config: FrequencyConfig) -> Self {
        Self {
            config,
            planner: FftPlanner::new(),
        }
    }

    pub fn config(&self) -> &FrequencyConfig {
        &self.config
    }

    /// Locate and score the dominant in-band peak.
    pub fn find_peak(&mut self, window: &ConditionedWindow) -> Result<FrequencyPeak, Rejection> {
        let n = window.samples.len();
        if n < 8 {
            return Err(Rejection::need(n, 8));
        }
        let signal = window.samples.as_slice().ok_or(Rejection::MalformedInput)?;
        if signal.iter().any(|s| !s.is_finite()) {
            return Err(Rejection::MalformedInput);
        }

        let spectrum = Spectrum::compute_with(
            &mut self.planner,
            signal,
            window.sample_rate,
            self.config.fft_size,
        )
        .ok_or(Rejection::MalformedInput)?;

        let peak = spectrum
            .peak_in_band(self.config.min_hz, self.config.max_hz)
            .ok_or(Rejection::QualityRejected)?;
        let frequency_hz = spectrum.frequency_of(peak.refined_bin);

        // Noise floor: in-band bins outside the Hamming main lobe around the peak
        let guard_hz = 2.0 * window.sample_rate / n as f32;
        let bins = spectrum
            .band_bins(self.config.min_hz, self.config.max_hz)
            .ok_or(Rejection::QualityRejected)?;
        let mut noise: Vec<f32> = bins
            .clone()
            .filter(|&k| (spectrum.frequency_of(k as f32) - frequency_hz).abs() > guard_hz)
            .map(|k| spectrum.power[k])
            .collect();
        if noise.is_empty() {
            noise = bins
                .filter(|&k| k != peak.bin)
                .map(|k| spectrum.power[k])
                .collect();
        }
        let noise_floor = if noise.is_empty() {
            0.0
        } else {
            noise.iter().sum::<f32>() / noise.len() as f32
        };
        let snr = peak.power / noise_floor.max(peak.power * 1e-6).max(f32::MIN_POSITIVE);

        let harmonic_ratio = spectrum.power_near(2.0 * frequency_hz) / peak.power;
        let harmonic_confidence = self.harmonic_confidence(harmonic_ratio);

        let candidate = FrequencyPeak {
            frequency_hz,
            power: peak.power,
            snr,
            harmonic_confidence,
        };
        log::trace!(
            "spectral peak {:.3} Hz snr {:.1} harmonic {:.2}",
            frequency_hz,
            snr,
            harmonic_ratio
        );

        if snr < self.config.min_snr {
            return Err(Rejection::QualityRejected);
        }
        Ok(candidate)
    }

    /// Estimate heart rate from a conditioned window.
    ///
    /// `extraction_quality` is the mean region-extraction quality of the
    /// samples in the window and scales the returned quality.
    pub fn estimate(
        &mut self,
        window: &ConditionedWindow,
        extraction_quality: f32,
        ts_us: i64,
    ) -> Result<HeartRateEstimate, Rejection> {
        let peak = self.find_peak(window)?;
        let bpm_f = peak.frequency_hz * 60.0;
        if !bpm_f.is_finite() {
            return Err(Rejection::OutOfPhysiologicalRange);
        }
        let bpm = bpm_f.round().max(0.0) as u32;
        if bpm < self.config.min_bpm || bpm > self.config.max_bpm {
            log::debug!("heart rate {} BPM outside range, discarded", bpm);
            return Err(Rejection::OutOfPhysiologicalRange);
        }

        let snr_score = (1.0 - self.config.min_snr / peak.snr).clamp(0.0, 1.0);
        let motion_score = if window.motion_artifact() { 0.0 } else { 1.0 };
        let spectral = SNR_WEIGHT * snr_score
            + HARMONIC_WEIGHT * peak.harmonic_confidence
            + MOTION_WEIGHT * motion_score;
        let quality = (extraction_quality.clamp(0.0, 1.0) * spectral).clamp(0.0, 1.0);

        Ok(HeartRateEstimate { bpm, quality, ts_us })
    }

    fn harmonic_confidence(&self, ratio: f32) -> f32 {
        let (lo, hi) = (self.config.harmonic_min_ratio, self.config.harmonic_max_ratio);
        if !ratio.is_finite() || ratio <= 0.0 {
            0.0
        } else if ratio < lo {
            ratio / lo
        } else if ratio > hi {
            (hi / ratio).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}
