//! Temporal validation of per-cycle heart-rate estimates
//!
//! A short run of mutually consistent estimates is averaged (weighted by
//! quality); otherwise the new value is blended into the last accepted one
//! by exponential smoothing. Either way the accepted rate never moves more
//! than `max_change_bpm` per cycle.

use serde::{Deserialize, Serialize};

use super::frequency::HeartRateEstimate;
use crate::dsp::RingBuffer;

/// Validator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Raw estimates retained
    pub history_len: usize,
    /// Most recent estimates checked for consistency
    pub consistency_window: usize,
    /// History length before the consistency path is considered
    pub min_history: usize,
    /// Maximum relative deviation from the window mean
    pub max_deviation: f32,
    /// Exponential smoothing factor for inconsistent estimates
    pub ema_alpha: f32,
    /// Rate-of-change clamp (BPM per evaluation cycle)
    pub max_change_bpm: f32,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            history_len: 10,
            consistency_window: 5,
            min_history: 3,
            max_deviation: 0.2,
            ema_alpha: 0.3,
            max_change_bpm: 15.0,
        }
    }
}

/// Recent raw estimates plus the current accepted heart rate
#[derive(Debug, Clone)]
pub struct HeartRateHistory {
    raw: RingBuffer<HeartRateEstimate>,
    accepted: Option<HeartRateEstimate>,
}

impl Default for HeartRateHistory {
    fn default() -> Self {
        Self::new(ValidatorConfig::default().history_len)
    }
}

impl HeartRateHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            raw: RingBuffer::new(capacity),
            accepted: None,
        }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Raw estimates, oldest first.
    pub fn estimates(&self) -> impl Iterator<Item = &HeartRateEstimate> {
        self.raw.iter()
    }

    /// Current smoothed heart rate.
    pub fn current(&self) -> Option<&HeartRateEstimate> {
        self.accepted.as_ref()
    }

    pub fn clear(&mut self) {
        self.raw.clear();
        self.accepted = None;
    }
}

/// Which rule produced the accepted value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SmoothingPath {
    /// First estimate, accepted as-is
    Initial,
    /// Quality-weighted mean of a consistent window
    Consistent,
    /// Exponential smoothing against the previous value
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedHeartRate {
    pub estimate: HeartRateEstimate,
    pub raw_bpm: u32,
    pub path: SmoothingPath,
}

/// Heart-rate smoother; the only writer of the accepted heart rate
#[derive(Debug, Clone, Default)]
pub struct TemporalValidator {
    config: ValidatorConfig,
}

impl TemporalValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Fold a new raw estimate into `history` and return the accepted rate.
    pub fn update(
        &self,
        history: &mut HeartRateHistory,
        estimate: HeartRateEstimate,
    ) -> ValidatedHeartRate {
        history.raw.push(estimate);

        let Some(previous) = history.accepted else {
            history.accepted = Some(estimate);
            return ValidatedHeartRate {
                estimate,
                raw_bpm: estimate.bpm,
                path: SmoothingPath::Initial,
            };
        };

        let (target, quality, path) = match self.consistent_mean(history) {
            Some((mean, quality)) => (mean, quality, SmoothingPath::Consistent),
            None => {
                let alpha = self.config.ema_alpha.clamp(0.0, 1.0);
                let smoothed =
                    previous.bpm as f32 + alpha * (estimate.bpm as f32 - previous.bpm as f32);
                (smoothed, estimate.quality, SmoothingPath::Exponential)
            }
        };

        let max_change = self.config.max_change_bpm.max(0.0).floor() as u32;
        let lo = previous.bpm.saturating_sub(max_change);
        let hi = previous.bpm.saturating_add(max_change);
        let bpm = (target.round().max(0.0) as u32).clamp(lo, hi);

        if bpm.abs_diff(estimate.bpm) > max_change {
            log::debug!(
                "heart rate jump {} -> {} BPM limited to {}",
                previous.bpm,
                estimate.bpm,
                bpm
            );
        }

        let accepted = HeartRateEstimate {
            bpm,
            quality,
            ts_us: estimate.ts_us,
        };
        history.accepted = Some(accepted);

        ValidatedHeartRate {
            estimate: accepted,
            raw_bpm: estimate.bpm,
            path,
        }
    }

    /// Quality-weighted mean of the recent window when every entry lies
    /// within `max_deviation` of the window mean.
    fn consistent_mean(&self, history: &HeartRateHistory) -> Option<(f32, f32)> {
        if history.len() < self.config.min_history.max(1) {
            return None;
        }
        let window: Vec<&HeartRateEstimate> = history
            .raw
            .recent(self.config.consistency_window.max(1))
            .collect();
        let n = window.len() as f32;
        let mean = window.iter().map(|e| e.bpm as f32).sum::<f32>() / n;
        if mean <= 0.0 {
            return None;
        }
        let consistent = window
            .iter()
            .all(|e| (e.bpm as f32 - mean).abs() / mean <= self.config.max_deviation);
        if !consistent {
            return None;
        }

        let weight_sum: f32 = window.iter().map(|e| e.quality.max(0.0)).sum();
        let mean_quality = weight_sum / n;
        let weighted = if weight_sum > f32::EPSILON {
            window
                .iter()
                .map(|e| e.bpm as f32 * e.quality.max(0.0))
                .sum::<f32>()
                / weight_sum
        } else {
            mean
        };
        Some((weighted, mean_quality))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn est(bpm: u32, quality: f32) -> HeartRateEstimate {
        HeartRateEstimate {
            bpm,
            quality,
            ts_us: 0,
        }
    }

    #[test]
    fn test_first_estimate_accepted() {
        let validator = TemporalValidator::default();
        let mut history = HeartRateHistory::default();
        let out = validator.update(&mut history, est(72, 0.8));
        assert_eq!(out.path, SmoothingPath::Initial);
        assert_eq!(out.estimate.bpm, 72);
        assert_eq!(history.current().map(|e| e.bpm), Some(72));
    }

    #[test]
    fn test_consistent_window_weighted_mean() {
        let validator = TemporalValidator::default();
        let mut history = HeartRateHistory::default();
        validator.update(&mut history, est(70, 1.0));
        validator.update(&mut history, est(72, 1.0));
        let out = validator.update(&mut history, est(80, 0.5));
        assert_eq!(out.path, SmoothingPath::Consistent);
        // (70 + 72 + 40) / 2.5 = 72.8
        assert_eq!(out.estimate.bpm, 73);
        assert_eq!(out.raw_bpm, 80);
    }

    #[test]
    fn test_outlier_uses_exponential_smoothing() {
        let validator = TemporalValidator::default();
        let mut history = HeartRateHistory::default();
        validator.update(&mut history, est(70, 1.0));
        validator.update(&mut history, est(70, 1.0));
        let out = validator.update(&mut history, est(120, 1.0));
        assert_eq!(out.path, SmoothingPath::Exponential);
        // 70 + 0.3 * 50 = 85, exactly at the 15 BPM clamp
        assert_eq!(out.estimate.bpm, 85);
    }

    #[test]
    fn test_rate_clamp() {
        let config = ValidatorConfig {
            ema_alpha: 1.0,
            ..ValidatorConfig::default()
        };
        let validator = TemporalValidator::new(config);
        let mut history = HeartRateHistory::default();
        validator.update(&mut history, est(60, 1.0));
        let out = validator.update(&mut history, est(180, 1.0));
        assert_eq!(out.estimate.bpm, 75);
        let out = validator.update(&mut history, est(180, 1.0));
        assert_eq!(out.estimate.bpm, 90);
    }

    #[test]
    fn test_history_bounded() {
        let validator = TemporalValidator::default();
        let mut history = HeartRateHistory::default();
        for _ in 0..25 {
            validator.update(&mut history, est(72, 0.9));
        }
        assert_eq!(history.len(), 10);
        history.clear();
        assert!(history.current().is_none());
    }

    proptest! {
        #[test]
        fn prop_change_never_exceeds_clamp(
            rates in proptest::collection::vec((45u32..=200, 0.0f32..1.0), 1..60)
        ) {
            let validator = TemporalValidator::default();
            let mut history = HeartRateHistory::default();
            let mut previous: Option<u32> = None;
            for (bpm, quality) in rates {
                let out = validator.update(&mut history, est(bpm, quality));
                if let Some(prev) = previous {
                    prop_assert!(out.estimate.bpm.abs_diff(prev) <= 15);
                }
                prop_assert!((45..=200).contains(&out.estimate.bpm));
                previous = Some(out.estimate.bpm);
            }
        }
    }
}
