//! Synthetic capture sources for tests and the CLI harness.
//!
//! `SyntheticFace` renders a skin-coloured face box on a dark background
//! whose colour pulses at a fixed heart rate and drifts with breathing.
//! `SyntheticVoice` produces a harmonic vowel with a breathing envelope.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

use biosense_signals::{AudioBlock, VideoFrame};

use crate::error::SourceError;
use crate::source::{AudioSource, FrameSource};

const BACKGROUND: [u8; 3] = [30, 40, 90];
const SKIN: [f32; 3] = [200.0, 140.0, 110.0];
/// Pulse depth per channel relative to green
const PULSE_MIX: [f32; 3] = [0.4, 1.0, 0.25];

#[derive(Debug, Clone, PartialEq)]
pub struct FaceParams {
    pub width: u32,
    pub height: u32,
    pub fps: f32,
    pub bpm: f32,
    /// Green pulse amplitude (intensity levels)
    pub pulse_amplitude: f32,
    /// Breaths per minute
    pub breathing_rate: f32,
    pub breathing_amplitude: f32,
    /// Per-pixel sensor noise sigma (intensity levels)
    pub noise: f32,
    /// Stop yielding frames after this long
    pub duration_s: Option<f32>,
    pub seed: u64,
}

impl Default for FaceParams {
    fn default() -> Self {
        Self {
            width: 64,
            height: 48,
            fps: 30.0,
            bpm: 72.0,
            pulse_amplitude: 3.0,
            breathing_rate: 15.0,
            breathing_amplitude: 1.0,
            noise: 2.0,
            duration_s: None,
            seed: 7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticFace {
    params: FaceParams,
    frame: u64,
    rng: StdRng,
    noise: Option<Normal<f32>>,
}

impl SyntheticFace {
    pub fn new(params: FaceParams) -> Self {
        let noise = (params.noise > 0.0)
            .then(|| Normal::new(0.0, params.noise).ok())
            .flatten();
        Self {
            rng: StdRng::seed_from_u64(params.seed),
            frame: 0,
            noise,
            params,
        }
    }

    pub fn params(&self) -> &FaceParams {
        &self.params
    }

    fn render(&mut self, ts_us: i64) -> VideoFrame {
        let p = &self.params;
        let t = ts_us as f64 / 1e6;
        let pulse = (2.0 * PI * p.bpm as f64 / 60.0 * t).sin() as f32 * p.pulse_amplitude;
        let breath = (2.0 * PI * p.breathing_rate as f64 / 60.0 * t).sin() as f32 * p.breathing_amplitude;
        let base: [f32; 3] = std::array::from_fn(|c| SKIN[c] + PULSE_MIX[c] * pulse + breath);

        let (w, h) = (p.width, p.height);
        let (x0, x1) = ((w as f32 * 0.15) as u32, (w as f32 * 0.85) as u32);
        let (y0, y1) = ((h as f32 * 0.05) as u32, (h as f32 * 0.85) as u32);

        let mut frame = VideoFrame::filled(w, h, BACKGROUND, ts_us);
        for y in y0..y1 {
            for x in x0..x1 {
                let rgb: [u8; 3] = std::array::from_fn(|c| {
                    let n = self
                        .noise
                        .as_ref()
                        .map(|d| d.sample(&mut self.rng))
                        .unwrap_or(0.0);
                    (base[c] + n).round().clamp(0.0, 255.0) as u8
                });
                frame.set_pixel(x, y, rgb);
            }
        }
        frame
    }
}

impl FrameSource for SyntheticFace {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, SourceError> {
        let fps = self.params.fps.max(1.0) as f64;
        let t = self.frame as f64 / fps;
        if self.params.duration_s.is_some_and(|d| t >= d as f64) {
            return Ok(None);
        }
        let ts_us = (t * 1e6).round() as i64;
        self.frame += 1;
        Ok(Some(self.render(ts_us)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceParams {
    pub sample_rate: u32,
    pub block_len: usize,
    pub f0: f32,
    pub amplitude: f32,
    /// Breaths per minute modulating loudness
    pub breathing_rate: f32,
    pub breathing_depth: f32,
    /// Additive Gaussian noise sigma
    pub noise: f32,
    /// Emit silence instead of voice
    pub silent: bool,
    pub duration_s: Option<f32>,
    pub seed: u64,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            block_len: 533,
            f0: 150.0,
            amplitude: 0.4,
            breathing_rate: 15.0,
            breathing_depth: 0.3,
            noise: 0.0,
            silent: false,
            duration_s: None,
            seed: 11,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticVoice {
    params: VoiceParams,
    sample: u64,
    rng: StdRng,
    noise: Option<Normal<f32>>,
}

impl SyntheticVoice {
    pub fn new(params: VoiceParams) -> Self {
        let noise = (params.noise > 0.0)
            .then(|| Normal::new(0.0, params.noise).ok())
            .flatten();
        Self {
            rng: StdRng::seed_from_u64(params.seed),
            sample: 0,
            noise,
            params,
        }
    }

    /// One block per video frame at `fps`.
    pub fn aligned_to(mut params: VoiceParams, fps: f32) -> Self {
        params.block_len = ((params.sample_rate as f32 / fps.max(1.0)).round() as usize).max(1);
        Self::new(params)
    }

    fn value(&mut self, n: u64) -> f32 {
        let p = &self.params;
        let noise = self
            .noise
            .as_ref()
            .map(|d| d.sample(&mut self.rng))
            .unwrap_or(0.0);
        if p.silent {
            return noise;
        }
        let t = n as f64 / p.sample_rate as f64;
        let phase = 2.0 * PI * p.f0 as f64 * t;
        let voice = 0.6 * phase.sin() + 0.3 * (2.0 * phase).sin() + 0.1 * (3.0 * phase).sin();
        let envelope = 1.0 + p.breathing_depth as f64 * (2.0 * PI * p.breathing_rate as f64 / 60.0 * t).sin();
        (p.amplitude as f64 * envelope * voice) as f32 + noise
    }
}

impl AudioSource for SyntheticVoice {
    fn next_audio_block(&mut self) -> Result<Option<AudioBlock>, SourceError> {
        let sr = self.params.sample_rate.max(1);
        let start = self.sample;
        if let Some(d) = self.params.duration_s {
            if start as f64 / sr as f64 >= d as f64 {
                return Ok(None);
            }
        }
        let len = self.params.block_len.max(1) as u64;
        let samples: Vec<f32> = (start..start + len).map(|n| self.value(n)).collect();
        self.sample += len;
        let ts_us = (start as f64 * 1e6 / sr as f64).round() as i64;
        Ok(Some(AudioBlock::new(samples, sr, ts_us)))
    }
}
