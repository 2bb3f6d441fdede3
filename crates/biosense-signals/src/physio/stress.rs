//! Composite stress score
//!
//! Weighted fusion of heart-rate elevation, low RMSSD, low SDNN, high LF/HF
//! and (when present) vocal stress. Weights of missing inputs are dropped
//! and the rest renormalized.

use serde::{Deserialize, Serialize};

/// Stress level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StressLevel {
    Relaxed,
    Low,
    Moderate,
    High,
    Acute,
}

/// Fusion weights and normalization anchors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub hr_weight: f32,
    pub rmssd_weight: f32,
    pub sdnn_weight: f32,
    pub lf_hf_weight: f32,
    pub vocal_weight: f32,
    /// Heart rate mapped to 0 and 1 (BPM)
    pub hr_rest: f32,
    pub hr_max: f32,
    /// RMSSD mapped to 1 (low) and 0 (high), ms
    pub rmssd_low: f32,
    pub rmssd_high: f32,
    pub sdnn_low: f32,
    pub sdnn_high: f32,
    /// LF/HF mapped to 0 and 1
    pub lf_hf_low: f32,
    pub lf_hf_high: f32,
    /// Score thresholds for Low, Moderate, High, Acute
    pub level_thresholds: [f32; 4],
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            hr_weight: 0.3,
            rmssd_weight: 0.25,
            sdnn_weight: 0.15,
            lf_hf_weight: 0.15,
            vocal_weight: 0.15,
            hr_rest: 60.0,
            hr_max: 120.0,
            rmssd_low: 15.0,
            rmssd_high: 60.0,
            sdnn_low: 20.0,
            sdnn_high: 80.0,
            lf_hf_low: 0.5,
            lf_hf_high: 4.0,
            level_thresholds: [20.0, 40.0, 60.0, 80.0],
        }
    }
}

/// Inputs available this cycle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StressInputs {
    pub heart_rate_bpm: Option<f32>,
    pub rmssd_ms: Option<f32>,
    pub sdnn_ms: Option<f32>,
    pub lf_hf_ratio: Option<f32>,
    /// Vocal stress score (0-100)
    pub vocal_stress: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StressAssessment {
    /// 0 (relaxed) to 100 (acute)
    pub score: f32,
    pub level: StressLevel,
    /// Fraction of the total weight that had inputs
    pub coverage: f32,
}

#[derive(Debug, Clone, Default)]
pub struct StressEstimator {
    config: StressConfig,
}

/// Linear map of `v` from `[lo, hi]` onto `[0, 1]`, clamped.
fn ramp(v: f32, lo: f32, hi: f32) -> f32 {
    if (hi - lo).abs() <= f32::EPSILON {
        return if v >= hi { 1.0 } else { 0.0 };
    }
    ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
}

impl StressEstimator {
    pub fn new(config: StressConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StressConfig {
        &self.config
    }

    /// Fuse the available inputs; `None` when none are present.
    pub fn assess(&self, inputs: &StressInputs) -> Option<StressAssessment> {
        let c = &self.config;
        let present = |v: Option<f32>| v.filter(|x| x.is_finite());

        let components = [
            (
                present(inputs.heart_rate_bpm).map(|hr| ramp(hr, c.hr_rest, c.hr_max)),
                c.hr_weight,
            ),
            (
                present(inputs.rmssd_ms).map(|r| 1.0 - ramp(r, c.rmssd_low, c.rmssd_high)),
                c.rmssd_weight,
            ),
            (
                present(inputs.sdnn_ms).map(|s| 1.0 - ramp(s, c.sdnn_low, c.sdnn_high)),
                c.sdnn_weight,
            ),
            (
                present(inputs.lf_hf_ratio).map(|r| ramp(r, c.lf_hf_low, c.lf_hf_high)),
                c.lf_hf_weight,
            ),
            (
                present(inputs.vocal_stress).map(|v| (v / 100.0).clamp(0.0, 1.0)),
                c.vocal_weight,
            ),
        ];

        let total_weight: f32 = components.iter().map(|(_, w)| w.max(0.0)).sum();
        let mut weight = 0.0f32;
        let mut sum = 0.0f32;
        for (value, w) in components {
            if let Some(v) = value {
                sum += v * w.max(0.0);
                weight += w.max(0.0);
            }
        }
        if weight <= f32::EPSILON {
            return None;
        }

        let score = (100.0 * sum / weight).clamp(0.0, 100.0);
        Some(StressAssessment {
            score,
            level: self.classify(score),
            coverage: if total_weight > 0.0 {
                weight / total_weight
            } else {
                0.0
            },
        })
    }

    pub fn classify(&self, score: f32) -> StressLevel {
        let [low, moderate, high, acute] = self.config.level_thresholds;
        if score < low {
            StressLevel::Relaxed
        } else if score < moderate {
            StressLevel::Low
        } else if score < high {
            StressLevel::Moderate
        } else if score < acute {
            StressLevel::High
        } else {
            StressLevel::Acute
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_no_inputs_no_score() {
        assert!(StressEstimator::default().assess(&StressInputs::default()).is_none());
    }

    #[test]
    fn test_relaxed_profile() {
        let inputs = StressInputs {
            heart_rate_bpm: Some(58.0),
            rmssd_ms: Some(70.0),
            sdnn_ms: Some(90.0),
            lf_hf_ratio: Some(0.4),
            vocal_stress: None,
        };
        let out = StressEstimator::default().assess(&inputs).unwrap();
        assert_relative_eq!(out.score, 0.0);
        assert_eq!(out.level, StressLevel::Relaxed);
        assert_relative_eq!(out.coverage, 0.85, epsilon = 1e-5);
    }

    #[test]
    fn test_acute_profile() {
        let inputs = StressInputs {
            heart_rate_bpm: Some(130.0),
            rmssd_ms: Some(10.0),
            sdnn_ms: Some(15.0),
            lf_hf_ratio: Some(5.0),
            vocal_stress: Some(100.0),
        };
        let out = StressEstimator::default().assess(&inputs).unwrap();
        assert_relative_eq!(out.score, 100.0);
        assert_eq!(out.level, StressLevel::Acute);
    }

    #[test]
    fn test_weights_renormalized() {
        // Heart rate alone, halfway up the ramp
        let inputs = StressInputs {
            heart_rate_bpm: Some(90.0),
            ..StressInputs::default()
        };
        let out = StressEstimator::default().assess(&inputs).unwrap();
        assert_relative_eq!(out.score, 50.0, epsilon = 1e-4);
        assert_eq!(out.level, StressLevel::Moderate);
    }

    #[test]
    fn test_level_thresholds() {
        let est = StressEstimator::default();
        assert_eq!(est.classify(19.9), StressLevel::Relaxed);
        assert_eq!(est.classify(20.0), StressLevel::Low);
        assert_eq!(est.classify(59.0), StressLevel::Moderate);
        assert_eq!(est.classify(79.0), StressLevel::High);
        assert_eq!(est.classify(80.0), StressLevel::Acute);
    }
}
