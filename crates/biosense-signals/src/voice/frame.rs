//! Audio block normalization.

use serde::{Deserialize, Serialize};

use crate::rejection::Rejection;

/// Raw audio block handed in by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioBlock {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub ts_us: i64,
}

impl AudioBlock {
    pub fn new(samples: Vec<f32>, sample_rate: u32, ts_us: i64) -> Self {
        Self {
            samples,
            sample_rate,
            ts_us,
        }
    }

    /// Block duration in microseconds.
    pub fn duration_us(&self) -> i64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as i64 * 1_000_000) / self.sample_rate as i64
    }
}

/// Normalized audio: every sample finite and within [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceFrame {
    samples: Vec<f32>,
    pub sample_rate: u32,
    pub ts_us: i64,
}

impl VoiceFrame {
    /// Clamp into [-1, 1]; non-finite samples become silence.
    pub fn from_block(block: &AudioBlock) -> Result<Self, Rejection> {
        if block.sample_rate == 0 || block.samples.is_empty() {
            return Err(Rejection::MalformedInput);
        }
        let samples = block
            .samples
            .iter()
            .map(|s| if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 })
            .collect();
        Ok(Self {
            samples,
            sample_rate: block.sample_rate,
            ts_us: block.ts_us,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn rms(&self) -> f32 {
        rms(&self.samples)
    }

    pub fn zero_crossing_rate(&self) -> f32 {
        zero_crossing_rate(&self.samples)
    }
}

/// Root mean square amplitude.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Fraction of adjacent sample pairs that change sign.
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f32 / (samples.len() - 1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalization_clamps() {
        let block = AudioBlock::new(vec![0.5, 2.0, -3.0, f32::NAN], 16_000, 0);
        let frame = VoiceFrame::from_block(&block).unwrap();
        assert_eq!(frame.samples().to_vec(), vec![0.5f32, 1.0, -1.0, 0.0]);
    }

    #[test]
    fn test_malformed_blocks() {
        assert_eq!(
            VoiceFrame::from_block(&AudioBlock::new(vec![], 16_000, 0)),
            Err(Rejection::MalformedInput)
        );
        assert_eq!(
            VoiceFrame::from_block(&AudioBlock::new(vec![0.1], 0, 0)),
            Err(Rejection::MalformedInput)
        );
    }

    #[test]
    fn test_rms_and_zcr() {
        let square = [1.0, -1.0, 1.0, -1.0, 1.0];
        assert_relative_eq!(rms(&square), 1.0);
        assert_relative_eq!(zero_crossing_rate(&square), 1.0);
        assert_relative_eq!(zero_crossing_rate(&[0.2, 0.3, 0.4]), 0.0);
    }

    #[test]
    fn test_duration() {
        let block = AudioBlock::new(vec![0.0; 1600], 16_000, 0);
        assert_eq!(block.duration_us(), 100_000);
    }
}
