//! Prosodic heuristics: vocal stress, valence, arousal and breathing from
//! the energy envelope. All thresholds live in [`ProsodyConfig`] and
//! [`BreathingConfig`].

use serde::{Deserialize, Serialize};

use crate::dsp::{bandpass_filter, detect_peaks, peak_intervals, stats, FilterConfig};

/// Linear map of `v` from `[lo, hi]` onto `[0, 1]`, clamped.
fn ramp(v: f32, lo: f32, hi: f32) -> f32 {
    if hi <= lo {
        return if v >= hi { 1.0 } else { 0.0 };
    }
    ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProsodyConfig {
    /// F0 ramp for the stress score (Hz)
    pub stress_f0_low: f32,
    pub stress_f0_high: f32,
    /// Jitter ramp (%)
    pub stress_jitter_low: f32,
    pub stress_jitter_high: f32,
    /// Shimmer ramp (%)
    pub stress_shimmer_low: f32,
    pub stress_shimmer_high: f32,
    /// High-band energy share ramp
    pub stress_high_band_low: f32,
    pub stress_high_band_high: f32,
    pub stress_f0_weight: f32,
    pub stress_jitter_weight: f32,
    pub stress_shimmer_weight: f32,
    pub stress_high_band_weight: f32,
    /// Centroid ramp for valence (Hz)
    pub valence_centroid_low: f32,
    pub valence_centroid_high: f32,
    /// F0 spread treated as fully expressive (Hz)
    pub valence_f0_spread_high: f32,
    /// Loudness ramp for arousal (dBFS)
    pub arousal_db_low: f32,
    pub arousal_db_high: f32,
    pub arousal_f0_low: f32,
    pub arousal_f0_high: f32,
}

impl Default for ProsodyConfig {
    fn default() -> Self {
        Self {
            stress_f0_low: 150.0,
            stress_f0_high: 300.0,
            stress_jitter_low: 0.5,
            stress_jitter_high: 2.0,
            stress_shimmer_low: 2.0,
            stress_shimmer_high: 8.0,
            stress_high_band_low: 0.05,
            stress_high_band_high: 0.3,
            stress_f0_weight: 0.3,
            stress_jitter_weight: 0.25,
            stress_shimmer_weight: 0.25,
            stress_high_band_weight: 0.2,
            valence_centroid_low: 300.0,
            valence_centroid_high: 3000.0,
            valence_f0_spread_high: 40.0,
            arousal_db_low: -40.0,
            arousal_db_high: -10.0,
            arousal_f0_low: 100.0,
            arousal_f0_high: 300.0,
        }
    }
}

/// Per-frame features feeding the prosody heuristics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProsodyInputs {
    pub f0_hz: Option<f32>,
    pub f0_spread_hz: Option<f32>,
    pub jitter_percent: Option<f32>,
    pub shimmer_percent: Option<f32>,
    pub high_band_ratio: Option<f32>,
    pub centroid_hz: Option<f32>,
    pub rms: Option<f32>,
}

/// Weighted average over the components present.
fn fuse(components: &[(Option<f32>, f32)]) -> Option<f32> {
    let (sum, weight) = components
        .iter()
        .filter_map(|(v, w)| v.map(|v| (v * w, *w)))
        .fold((0.0, 0.0), |(s, t), (v, w)| (s + v, t + w));
    (weight > f32::EPSILON).then(|| sum / weight)
}

/// Vocal stress score 0-100.
pub fn vocal_stress(inputs: &ProsodyInputs, c: &ProsodyConfig) -> Option<f32> {
    fuse(&[
        (
            inputs.f0_hz.map(|f| ramp(f, c.stress_f0_low, c.stress_f0_high)),
            c.stress_f0_weight,
        ),
        (
            inputs
                .jitter_percent
                .map(|j| ramp(j, c.stress_jitter_low, c.stress_jitter_high)),
            c.stress_jitter_weight,
        ),
        (
            inputs
                .shimmer_percent
                .map(|s| ramp(s, c.stress_shimmer_low, c.stress_shimmer_high)),
            c.stress_shimmer_weight,
        ),
        (
            inputs
                .high_band_ratio
                .map(|h| ramp(h, c.stress_high_band_low, c.stress_high_band_high)),
            c.stress_high_band_weight,
        ),
    ])
    .map(|s| 100.0 * s)
}

/// Valence in [-1, 1]: brighter, more melodic speech reads as positive.
pub fn valence(inputs: &ProsodyInputs, c: &ProsodyConfig) -> Option<f32> {
    let brightness = inputs
        .centroid_hz
        .map(|f| ramp(f, c.valence_centroid_low, c.valence_centroid_high))?;
    let melody = inputs
        .f0_spread_hz
        .map(|s| ramp(s, 0.0, c.valence_f0_spread_high));
    fuse(&[(Some(brightness), 0.6), (melody, 0.4)]).map(|v| 2.0 * v - 1.0)
}

/// Arousal in [0, 1] from loudness, pitch height and brightness.
pub fn arousal(inputs: &ProsodyInputs, c: &ProsodyConfig) -> Option<f32> {
    let loudness = inputs
        .rms
        .filter(|r| *r > 0.0)
        .map(|r| ramp(20.0 * r.log10(), c.arousal_db_low, c.arousal_db_high))?;
    fuse(&[
        (Some(loudness), 0.5),
        (
            inputs.f0_hz.map(|f| ramp(f, c.arousal_f0_low, c.arousal_f0_high)),
            0.3,
        ),
        (
            inputs
                .centroid_hz
                .map(|f| ramp(f, c.valence_centroid_low, c.valence_centroid_high)),
            0.2,
        ),
    ])
}

/// Breathing pattern classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreathingPattern {
    Regular,
    Irregular,
    Shallow,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreathingConfig {
    /// Envelope hop (ms); one RMS value per hop
    pub envelope_hop_ms: f32,
    /// Envelope history length (s)
    pub envelope_seconds: f32,
    /// Minimum envelope history before estimating (s)
    pub min_seconds: f32,
    /// Breathing band on the envelope (Hz)
    pub min_freq: f32,
    pub max_freq: f32,
    pub min_peak_spacing_s: f32,
    /// Accepted rate (breaths/min)
    pub min_rate: f32,
    pub max_rate: f32,
    /// Interval CV below which breathing counts as regular
    pub regular_cv: f32,
    /// Envelope modulation depth (std / mean) below which breathing is shallow
    pub shallow_depth: f32,
    /// Mean envelope RMS required at all
    pub min_rms: f32,
}

impl Default for BreathingConfig {
    fn default() -> Self {
        Self {
            envelope_hop_ms: 50.0,
            envelope_seconds: 30.0,
            min_seconds: 10.0,
            min_freq: 0.1,
            max_freq: 0.7,
            min_peak_spacing_s: 1.5,
            min_rate: 6.0,
            max_rate: 40.0,
            regular_cv: 0.25,
            shallow_depth: 0.15,
            min_rms: 0.01,
        }
    }
}

impl BreathingConfig {
    /// Envelope sample rate (Hz).
    pub fn envelope_rate(&self) -> f32 {
        1000.0 / self.envelope_hop_ms.max(1.0)
    }

    pub fn envelope_capacity(&self) -> usize {
        (self.envelope_seconds * self.envelope_rate()).ceil().max(1.0) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreathingEstimate {
    pub rate: Option<f32>,
    pub pattern: BreathingPattern,
}

/// Breathing rate and pattern from an RMS envelope.
///
/// `None` while the envelope is too short or too quiet; `Unknown` pattern
/// when there is energy but no clear breathing rhythm.
pub fn estimate_breathing(envelope: &[f32], c: &BreathingConfig) -> Option<BreathingEstimate> {
    let fs = c.envelope_rate();
    let need = (c.min_seconds * fs).ceil() as usize;
    if envelope.len() < need.max(8) {
        return None;
    }
    let mean = stats::mean(envelope)?;
    if mean < c.min_rms {
        return None;
    }
    let unknown = BreathingEstimate {
        rate: None,
        pattern: BreathingPattern::Unknown,
    };

    let centered: Vec<f32> = envelope.iter().map(|v| v - mean).collect();
    let filtered = bandpass_filter(
        &centered,
        &FilterConfig {
            sample_rate: fs,
            min_freq: c.min_freq,
            max_freq: c.max_freq,
            high_pass_order: 1,
            low_pass_order: 2,
        },
    );
    let min_gap = (c.min_peak_spacing_s * fs).round() as usize;
    let peaks = detect_peaks(&filtered, 0.5, min_gap);
    if peaks.len() < 3 {
        return Some(unknown);
    }
    let Some((gap, cv)) = peak_intervals(&peaks) else {
        return Some(unknown);
    };
    let rate = 60.0 * fs / gap;
    if !rate.is_finite() || rate < c.min_rate || rate > c.max_rate {
        return Some(unknown);
    }

    let depth = stats::std_dev(envelope).unwrap_or(0.0) / mean;
    let pattern = if depth < c.shallow_depth {
        BreathingPattern::Shallow
    } else if cv < c.regular_cv {
        BreathingPattern::Regular
    } else {
        BreathingPattern::Irregular
    };
    Some(BreathingEstimate {
        rate: Some(rate),
        pattern,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    #[test]
    fn test_calm_and_strained_voice() {
        let c = ProsodyConfig::default();
        let calm = ProsodyInputs {
            f0_hz: Some(120.0),
            jitter_percent: Some(0.3),
            shimmer_percent: Some(1.5),
            high_band_ratio: Some(0.02),
            ..ProsodyInputs::default()
        };
        let strained = ProsodyInputs {
            f0_hz: Some(320.0),
            jitter_percent: Some(2.5),
            shimmer_percent: Some(9.0),
            high_band_ratio: Some(0.4),
            ..ProsodyInputs::default()
        };
        assert_relative_eq!(vocal_stress(&calm, &c).unwrap(), 0.0);
        assert_relative_eq!(vocal_stress(&strained, &c).unwrap(), 100.0);
        assert!(vocal_stress(&ProsodyInputs::default(), &c).is_none());
    }

    #[test]
    fn test_valence_and_arousal_ranges() {
        let c = ProsodyConfig::default();
        let inputs = ProsodyInputs {
            f0_hz: Some(200.0),
            f0_spread_hz: Some(20.0),
            centroid_hz: Some(1650.0),
            rms: Some(0.1),
            ..ProsodyInputs::default()
        };
        let v = valence(&inputs, &c).unwrap();
        assert!((-1.0..=1.0).contains(&v));
        assert_relative_eq!(v, 0.0, epsilon = 1e-4);
        let a = arousal(&inputs, &c).unwrap();
        assert!((0.0..=1.0).contains(&a));
        assert!(arousal(&ProsodyInputs::default(), &c).is_none());
    }

    fn envelope(rate_bpm: f32, seconds: f32, depth: f32) -> Vec<f32> {
        let fs = 20.0;
        let n = (seconds * fs) as usize;
        (0..n)
            .map(|i| 0.1 * (1.0 + depth * (2.0 * PI * rate_bpm / 60.0 * i as f32 / fs).sin()))
            .collect()
    }

    #[test]
    fn test_regular_breathing_from_envelope() {
        let est = estimate_breathing(&envelope(15.0, 30.0, 0.5), &BreathingConfig::default()).unwrap();
        let rate = est.rate.unwrap();
        assert!((rate - 15.0).abs() < 2.0, "rate {rate}");
        assert_eq!(est.pattern, BreathingPattern::Regular);
    }

    #[test]
    fn test_shallow_breathing() {
        let est = estimate_breathing(&envelope(15.0, 30.0, 0.1), &BreathingConfig::default()).unwrap();
        assert_eq!(est.pattern, BreathingPattern::Shallow);
    }

    #[test]
    fn test_quiet_or_short_envelope() {
        let c = BreathingConfig::default();
        assert!(estimate_breathing(&vec![0.0; 600], &c).is_none());
        assert!(estimate_breathing(&envelope(15.0, 5.0, 0.5), &c).is_none());
        let steady = vec![0.1; 600];
        assert_eq!(
            estimate_breathing(&steady, &c).map(|e| e.pattern),
            Some(BreathingPattern::Unknown)
        );
    }
}
