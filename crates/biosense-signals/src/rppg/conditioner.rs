//! Signal conditioning
//!
//! The analysis window is cut from the tail of the channel window after
//! filtering a warm-up prefix of equal length, so the first-order IIR
//! start-up transient never reaches the spectrum. The Hamming window is
//! applied last, immediately before the FFT.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::dsp::{
    apply_hamming, bandpass_filter, stats, FilterConfig, SignalQuality, SignalQualityAnalyzer,
    SignalQualityConfig, SignalWindow,
};
use crate::rejection::Rejection;
use crate::vision::ChannelSample;

/// Signal conditioner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionerConfig {
    /// Camera frame rate (Hz)
    pub sample_rate: f32,
    /// Channel window capacity (900 = 30 s at 30 Hz)
    pub window_capacity: usize,
    /// Samples per analysis (60 = 2 s at 30 Hz)
    pub analysis_window: usize,
    /// High-pass cutoff (Hz)
    pub high_pass_hz: f32,
    /// Low-pass cutoff (Hz)
    pub low_pass_hz: f32,
    pub high_pass_order: usize,
    pub low_pass_order: usize,
    /// Samples below this extraction quality never reach the window
    pub min_quality: f32,
    pub motion: SignalQualityConfig,
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 30.0,
            window_capacity: 900,
            analysis_window: 60,
            high_pass_hz: 0.75,
            low_pass_hz: 3.5,
            high_pass_order: 1,
            low_pass_order: 1,
            min_quality: 0.3,
            motion: SignalQualityConfig::default(),
        }
    }
}

impl ConditionerConfig {
    /// Samples required before conditioning (analysis window plus warm-up).
    pub fn required_len(&self) -> usize {
        self.analysis_window * 2
    }

    fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            sample_rate: self.sample_rate,
            min_freq: self.high_pass_hz,
            max_freq: self.low_pass_hz,
            high_pass_order: self.high_pass_order,
            low_pass_order: self.low_pass_order,
        }
    }
}

/// Readiness of the channel window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionerStatus {
    Accumulating { have: usize, need: usize },
    Ready,
}

/// Filtered, windowed analysis segment
#[derive(Debug, Clone)]
pub struct ConditionedWindow {
    /// Band-passed, mean-removed, Hamming-windowed samples
    pub samples: Array1<f32>,
    /// Unfiltered samples of the same segment
    pub raw: Vec<f32>,
    /// Band-passed samples before windowing
    pub filtered: Vec<f32>,
    pub sample_rate: f32,
    pub quality: SignalQuality,
}

impl ConditionedWindow {
    #[inline]
    pub fn motion_artifact(&self) -> bool {
        self.quality.has_motion_artifact
    }
}

/// Stateless conditioning stage
#[derive(Debug, Clone, Default)]
pub struct SignalConditioner {
    config: ConditionerConfig,
    motion: SignalQualityAnalyzer,
}

impl SignalConditioner {
    pub fn new(config: ConditionerConfig) -> Self {
        let motion = SignalQualityAnalyzer::with_config(config.motion.clone());
        Self { config, motion }
    }

    pub fn config(&self) -> &ConditionerConfig {
        &self.config
    }

    /// Quality gate for an extracted sample; returns the green value to buffer.
    pub fn accept(&self, sample: &ChannelSample) -> Result<f32, Rejection> {
        if !sample.g.is_finite() || !sample.quality.is_finite() {
            return Err(Rejection::MalformedInput);
        }
        if sample.quality < self.config.min_quality {
            return Err(Rejection::QualityRejected);
        }
        Ok(sample.g)
    }

    pub fn status(&self, window: &SignalWindow) -> ConditionerStatus {
        let need = self.config.required_len();
        if window.len() >= need {
            ConditionerStatus::Ready
        } else {
            ConditionerStatus::Accumulating {
                have: window.len(),
                need,
            }
        }
    }

    /// Filter and window the most recent analysis segment.
    ///
    /// The window is only read; nothing here mutates it.
    pub fn condition(&self, window: &SignalWindow) -> Result<ConditionedWindow, Rejection> {
        let n = self.config.analysis_window.max(2);
        let need = n * 2;
        let recent = window
            .latest(need)
            .ok_or(Rejection::need(window.len(), need))?;

        // Filter first, window last: Hamming before the IIR stages would
        // taper the warm-up prefix and smear its start-up transient into the
        // analysis segment.
        let filtered_all = bandpass_filter(&recent, &self.config.filter_config());
        let raw = recent[need - n..].to_vec();
        let filtered = filtered_all[need - n..].to_vec();

        let mut samples = filtered.clone();
        stats::detrend_mean(&mut samples);
        apply_hamming(&mut samples);

        let quality = self.motion.analyze(&raw);
        if quality.has_motion_artifact {
            log::debug!(
                "motion artifact in analysis window ({:.0}% outliers)",
                quality.outlier_fraction * 100.0
            );
        }

        Ok(ConditionedWindow {
            samples: Array1::from(samples),
            raw,
            filtered,
            sample_rate: self.config.sample_rate,
            quality,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn filled_window(freq: f32, n: usize) -> SignalWindow {
        let mut window = SignalWindow::new(900);
        for i in 0..n {
            window.push(120.0 + 2.0 * (2.0 * PI * freq * i as f32 / 30.0).sin());
        }
        window
    }

    #[test]
    fn test_accumulating_until_twice_analysis_window() {
        let conditioner = SignalConditioner::default();
        let window = filled_window(1.2, 119);
        assert_eq!(
            conditioner.status(&window),
            ConditionerStatus::Accumulating { have: 119, need: 120 }
        );
        assert_eq!(
            conditioner.condition(&window).unwrap_err(),
            Rejection::InsufficientData { have: 119, need: 120 }
        );

        let window = filled_window(1.2, 120);
        assert_eq!(conditioner.status(&window), ConditionerStatus::Ready);
        assert!(conditioner.condition(&window).is_ok());
    }

    #[test]
    fn test_condition_removes_dc_and_tapers() {
        let conditioner = SignalConditioner::default();
        let window = filled_window(1.2, 300);
        let out = conditioner.condition(&window).unwrap();

        assert_eq!(out.samples.len(), 60);
        assert_eq!(out.raw.len(), 60);
        // DC (120) is gone after the high-pass
        let mean = stats::mean(&out.filtered).unwrap();
        assert!(mean.abs() < 1.0);
        // Hamming tapers both ends to 8% of their filtered value
        assert!(out.samples[0].abs() <= out.filtered[0].abs() * 0.1 + 0.5);
        assert!(!out.motion_artifact());
    }

    #[test]
    fn test_filtering_precedes_hamming() {
        let conditioner = SignalConditioner::default();
        let window = filled_window(1.2, 300);
        let out = conditioner.condition(&window).unwrap();

        let recent = window.latest(120).unwrap();
        let filtered = bandpass_filter(&recent, &conditioner.config().filter_config());
        assert_eq!(out.filtered, filtered[60..].to_vec());

        let mut expected = out.filtered.clone();
        stats::detrend_mean(&mut expected);
        apply_hamming(&mut expected);
        assert_eq!(out.samples.to_vec(), expected);
    }

    #[test]
    fn test_window_not_mutated() {
        let conditioner = SignalConditioner::default();
        let window = filled_window(1.0, 200);
        let before = window.snapshot();
        let _ = conditioner.condition(&window);
        assert_eq!(window.snapshot(), before);
    }

    #[test]
    fn test_quality_gate() {
        let conditioner = SignalConditioner::default();
        let mut sample = ChannelSample {
            r: 200.0,
            g: 140.0,
            b: 110.0,
            quality: 0.9,
            ts_us: 0,
        };
        assert_eq!(conditioner.accept(&sample), Ok(140.0));

        sample.quality = 0.1;
        assert_eq!(conditioner.accept(&sample), Err(Rejection::QualityRejected));

        sample.g = f32::NAN;
        assert_eq!(conditioner.accept(&sample), Err(Rejection::MalformedInput));
    }
}
