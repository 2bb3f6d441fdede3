//! Signal Quality Assessment module
//!
//! Motion-artifact detection and a coarse validity check for raw channel
//! windows, run before spectral analysis.

use super::stats;
use serde::{Deserialize, Serialize};

/// Signal quality assessment result
#[derive(Debug, Clone, PartialEq)]
pub struct SignalQuality {
    /// Whether motion artifacts were detected
    pub has_motion_artifact: bool,
    /// Fraction of sample-to-sample jumps flagged as outliers
    pub outlier_fraction: f32,
    /// Relative variability (std / mean) of the raw window
    pub relative_variability: f32,
}

/// Configuration for signal quality assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalQualityConfig {
    /// Outlier threshold in robust deviations (scaled MAD) of the first difference
    pub motion_threshold: f32,
    /// Fraction of outlier jumps that flags the window
    pub max_outlier_fraction: f32,
}

impl Default for SignalQualityConfig {
    fn default() -> Self {
        Self {
            motion_threshold: 5.0,
            max_outlier_fraction: 0.05,
        }
    }
}

/// Signal Quality Analyzer
#[derive(Debug, Clone, Default)]
pub struct SignalQualityAnalyzer {
    config: SignalQualityConfig,
}

impl SignalQualityAnalyzer {
    pub fn with_config(config: SignalQualityConfig) -> Self {
        Self { config }
    }

    /// Analyze a raw (unfiltered) channel window.
    pub fn analyze(&self, raw: &[f32]) -> SignalQuality {
        let n = raw.len();
        if n < 10 {
            return SignalQuality {
                has_motion_artifact: false,
                outlier_fraction: 0.0,
                relative_variability: 0.0,
            };
        }

        // Median + k * scaled MAD of the first difference.
        let diffs: Vec<f32> = raw.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
        let median_diff = stats::median(&diffs).unwrap_or(0.0);
        let deviations: Vec<f32> = diffs.iter().map(|d| (d - median_diff).abs()).collect();
        let mad = stats::median(&deviations).unwrap_or(0.0) * 1.4826;
        let threshold = median_diff + self.config.motion_threshold * mad;
        let outliers = diffs.iter().filter(|&&d| d > threshold).count();
        let outlier_fraction = outliers as f32 / diffs.len() as f32;

        let mean = raw.iter().sum::<f32>() / n as f32;
        let std = (raw.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n as f32).sqrt();
        let relative_variability = if mean.abs() > f32::EPSILON {
            std / mean.abs()
        } else {
            0.0
        };

        SignalQuality {
            has_motion_artifact: outlier_fraction > self.config.max_outlier_fraction,
            outlier_fraction,
            relative_variability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_clean_signal_no_artifact() {
        let analyzer = SignalQualityAnalyzer::default();
        let signal: Vec<f32> = (0..90)
            .map(|i| 120.0 + (2.0 * PI * i as f32 / 30.0).sin())
            .collect();
        let quality = analyzer.analyze(&signal);
        assert!(!quality.has_motion_artifact);
        assert!(quality.relative_variability < 0.02);
    }

    #[test]
    fn test_jumps_flag_motion() {
        let analyzer = SignalQualityAnalyzer::default();
        let mut signal: Vec<f32> = (0..300)
            .map(|i| 120.0 + 0.5 * (2.0 * PI * i as f32 / 30.0).sin())
            .collect();
        for i in (10..300).step_by(15) {
            signal[i] += 40.0;
        }
        assert!(analyzer.analyze(&signal).has_motion_artifact);
    }
}
