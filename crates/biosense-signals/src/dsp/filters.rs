//! First-order IIR filters
//!
//! High-pass and low-pass stages derived from RC cutoffs. Each stage can be
//! cascaded `order` times for a steeper roll-off (respiration needs the
//! cardiac band pushed well down before peak picking).

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Configuration for a high-pass then low-pass cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub sample_rate: f32,
    /// High-pass cutoff (Hz), e.g. 0.75 Hz = 45 BPM
    pub min_freq: f32,
    /// Low-pass cutoff (Hz), e.g. 3.5 Hz = 210 BPM
    pub max_freq: f32,
    /// Number of cascaded high-pass stages
    #[serde(default = "one")]
    pub high_pass_order: usize,
    /// Number of cascaded low-pass stages
    #[serde(default = "one")]
    pub low_pass_order: usize,
}

fn one() -> usize {
    1
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sample_rate: 30.0,
            min_freq: 0.75,
            max_freq: 3.5,
            high_pass_order: 1,
            low_pass_order: 1,
        }
    }
}

/// First-order high-pass: `y[n] = a * (y[n-1] + x[n] - x[n-1])`.
///
/// The first output sample is zero (no previous input).
pub fn high_pass(signal: &[f32], sample_rate: f32, cutoff_hz: f32) -> Vec<f32> {
    let n = signal.len();
    if n < 2 || sample_rate <= 0.0 {
        return signal.to_vec();
    }
    let rc = 1.0 / (2.0 * PI * cutoff_hz.max(0.001));
    let dt = 1.0 / sample_rate;
    let alpha = rc / (rc + dt);

    let mut out = vec![0.0f32; n];
    let mut prev_in = signal[0];
    let mut prev_out = 0.0;
    for i in 1..n {
        let y = alpha * (prev_out + signal[i] - prev_in);
        prev_in = signal[i];
        prev_out = y;
        out[i] = y;
    }
    out
}

/// First-order low-pass: `y[n] = a * x[n] + (1 - a) * y[n-1]`.
pub fn low_pass(signal: &[f32], sample_rate: f32, cutoff_hz: f32) -> Vec<f32> {
    let n = signal.len();
    if n < 2 || sample_rate <= 0.0 {
        return signal.to_vec();
    }
    let rc = 1.0 / (2.0 * PI * cutoff_hz.max(0.001));
    let dt = 1.0 / sample_rate;
    let alpha = dt / (rc + dt);

    let mut out = signal.to_vec();
    let mut prev = out[0];
    for i in 1..n {
        let y = alpha * out[i] + (1.0 - alpha) * prev;
        prev = y;
        out[i] = y;
    }
    out
}

/// Cascaded high-pass then low-pass.
pub fn bandpass_filter(signal: &[f32], config: &FilterConfig) -> Vec<f32> {
    let mut out = signal.to_vec();
    for _ in 0..config.high_pass_order.max(1) {
        out = high_pass(&out, config.sample_rate, config.min_freq);
    }
    for _ in 0..config.low_pass_order.max(1) {
        out = low_pass(&out, config.sample_rate, config.max_freq);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, fs: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / fs).sin())
            .collect()
    }

    fn rms(v: &[f32]) -> f32 {
        (v.iter().map(|x| x * x).sum::<f32>() / v.len() as f32).sqrt()
    }

    #[test]
    fn test_high_pass_removes_dc() {
        let signal = vec![100.0f32; 300];
        let filtered = high_pass(&signal, 30.0, 0.75);
        assert!(filtered.iter().all(|v| v.abs() < 1e-3));
    }

    #[test]
    fn test_bandpass_keeps_cardiac_band() {
        let fs = 30.0;
        let config = FilterConfig::default();

        let cardiac = bandpass_filter(&sine(1.2, fs, 600), &config);
        let noise = bandpass_filter(&sine(10.0, fs, 600), &config);

        // Skip the start-up transient
        let pass = rms(&cardiac[150..]);
        let stop = rms(&noise[150..]);
        assert!(pass > 0.5, "Passband attenuated too much: {}", pass);
        assert!(stop < 0.5 * pass, "Stopband leak: {} vs {}", stop, pass);
    }

    #[test]
    fn test_low_pass_order_steepens() {
        let fs = 30.0;
        let signal = sine(1.2, fs, 600);
        let first = low_pass(&signal, fs, 0.5);
        let mut third = signal.clone();
        for _ in 0..3 {
            third = low_pass(&third, fs, 0.5);
        }
        assert!(rms(&third[200..]) < 0.5 * rms(&first[200..]));
    }

    #[test]
    fn test_short_signal_passthrough() {
        assert_eq!(high_pass(&[1.0], 30.0, 0.75), vec![1.0]);
        assert_eq!(low_pass(&[], 30.0, 3.5), Vec::<f32>::new());
    }
}
