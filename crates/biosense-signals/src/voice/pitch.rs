//! Autocorrelation F0 estimation
//!
//! Biased autocorrelation of the mean-removed frame over lags covering
//! `min_f0..max_f0`. The strongest local maximum wins; its height relative
//! to the zero-lag energy is the confidence. The bias `(n - k) / n` makes
//! the first period beat its multiples, which keeps octave errors down.

use serde::{Deserialize, Serialize};

use crate::dsp::{stats, RingBuffer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    pub min_f0: f32,
    pub max_f0: f32,
    /// Normalized autocorrelation peak required to accept
    pub min_confidence: f32,
    /// Median filter length over accepted estimates
    pub history_len: usize,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            min_f0: 50.0,
            max_f0: 500.0,
            min_confidence: 0.3,
            history_len: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    pub f0_hz: f32,
    /// Autocorrelation peak over zero-lag energy
    pub confidence: f32,
    /// Period in samples (sub-sample refined)
    pub period: f32,
}

#[derive(Debug, Clone, Default)]
pub struct PitchEstimator {
    config: PitchConfig,
}

impl PitchEstimator {
    pub fn new(config: PitchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PitchConfig {
        &self.config
    }

    /// Estimate F0 of one frame; `None` when unvoiced or unreliable.
    pub fn estimate(&self, samples: &[f32], sample_rate: u32) -> Option<PitchEstimate> {
        let sr = sample_rate as f32;
        if sr <= 0.0 || self.config.max_f0 <= self.config.min_f0 || self.config.min_f0 <= 0.0 {
            return None;
        }
        let min_lag = ((sr / self.config.max_f0).floor() as usize).max(2);
        let max_lag = (sr / self.config.min_f0).ceil() as usize;
        let n = samples.len();
        if n < max_lag + 2 {
            return None;
        }

        let mut x = samples.to_vec();
        stats::detrend_mean(&mut x);

        let r0: f32 = x.iter().map(|v| v * v).sum();
        if r0 <= f32::EPSILON {
            return None;
        }
        let r: Vec<f32> = (min_lag - 1..=max_lag + 1)
            .map(|k| autocorrelation(&x, k))
            .collect();

        // r[j] holds lag min_lag - 1 + j
        let mut best: Option<(usize, f32)> = None;
        for j in 1..r.len() - 1 {
            if r[j] > r[j - 1] && r[j] >= r[j + 1] && best.map_or(true, |(_, b)| r[j] > b) {
                best = Some((j, r[j]));
            }
        }
        let (j, peak) = best?;
        let confidence = peak / r0;
        if confidence <= self.config.min_confidence {
            return None;
        }

        let denom = r[j - 1] - 2.0 * r[j] + r[j + 1];
        let delta = if denom.abs() > f32::EPSILON {
            (0.5 * (r[j - 1] - r[j + 1]) / denom).clamp(-0.5, 0.5)
        } else {
            0.0
        };
        let period = (min_lag - 1 + j) as f32 + delta;
        let f0_hz = sr / period;
        if f0_hz < self.config.min_f0 || f0_hz > self.config.max_f0 {
            return None;
        }

        Some(PitchEstimate {
            f0_hz,
            confidence,
            period,
        })
    }
}

/// Biased (unnormalized) autocorrelation at `lag`.
fn autocorrelation(x: &[f32], lag: usize) -> f32 {
    if lag >= x.len() {
        return 0.0;
    }
    x.iter().zip(&x[lag..]).map(|(a, b)| a * b).sum()
}

/// Median-smoothed F0 over the most recent accepted estimates
#[derive(Debug, Clone)]
pub struct PitchHistory {
    values: RingBuffer<f32>,
}

impl PitchHistory {
    pub fn new(len: usize) -> Self {
        Self {
            values: RingBuffer::new(len),
        }
    }

    pub fn push(&mut self, f0: f32) {
        self.values.push(f0);
    }

    pub fn median(&self) -> Option<f32> {
        stats::median(&self.values.snapshot())
    }

    /// Standard deviation of the retained values.
    pub fn spread(&self) -> Option<f32> {
        (self.values.len() >= 2)
            .then(|| stats::std_dev(&self.values.snapshot()))
            .flatten()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
