//! Energy / zero-crossing voice activity gate.

use serde::{Deserialize, Serialize};

use super::frame::VoiceFrame;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    /// Minimum RMS amplitude for speech
    pub rms_threshold: f32,
    /// Maximum zero-crossing rate for voiced speech
    pub zcr_threshold: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            rms_threshold: 0.01,
            zcr_threshold: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadDecision {
    pub voiced: bool,
    pub rms: f32,
    pub zcr: f32,
}

#[derive(Debug, Clone, Default)]
pub struct VoiceActivityDetector {
    config: VadConfig,
}

impl VoiceActivityDetector {
    pub fn new(config: VadConfig) -> Self {
        Self { config }
    }

    /// Voiced when energetic enough and not noise-like.
    pub fn classify(&self, frame: &VoiceFrame) -> VadDecision {
        let rms = frame.rms();
        let zcr = frame.zero_crossing_rate();
        VadDecision {
            voiced: rms > self.config.rms_threshold && zcr < self.config.zcr_threshold,
            rms,
            zcr,
        }
    }
}
