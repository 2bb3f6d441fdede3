//! Voice Biomarker Engine
//!
//! Per block: voice activity gate, then (once the rolling buffer holds one
//! analysis frame of voiced audio) F0, HNR and spectral shape over the
//! latest frame, jitter/shimmer over the whole voiced buffer, and prosody.
//! The buffer holds only contiguous voiced audio; an unvoiced block clears
//! it. The RMS envelope of every block, voiced or not, feeds the breathing
//! estimator. All mutable history lives in [`VoiceState`], which the caller
//! owns.

use log::{debug, trace};
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

use super::frame::{rms, VoiceFrame};
use super::hnr::{harmonic_comb_hnr, spectral_hnr, HnrConfig};
use super::perturbation::jitter_shimmer;
use super::pitch::{PitchConfig, PitchEstimator, PitchHistory};
use super::prosody::{
    arousal, estimate_breathing, valence, vocal_stress, BreathingConfig, BreathingPattern,
    ProsodyConfig, ProsodyInputs,
};
use super::spectral::{SpectralConfig, SpectralTracker};
use super::vad::{VadConfig, VoiceActivityDetector};
use crate::dsp::RingBuffer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub vad: VadConfig,
    pub pitch: PitchConfig,
    pub hnr: HnrConfig,
    pub spectral: SpectralConfig,
    pub prosody: ProsodyConfig,
    pub breathing: BreathingConfig,
    /// Analysis frame length (ms)
    pub analysis_frame_ms: f32,
    /// Rolling voiced-audio buffer used for jitter/shimmer (s)
    pub buffer_seconds: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            vad: VadConfig::default(),
            pitch: PitchConfig::default(),
            hnr: HnrConfig::default(),
            spectral: SpectralConfig::default(),
            prosody: ProsodyConfig::default(),
            breathing: BreathingConfig::default(),
            analysis_frame_ms: 80.0,
            buffer_seconds: 1.0,
        }
    }
}

impl VoiceConfig {
    pub fn frame_len(&self, sample_rate: u32) -> usize {
        (self.analysis_frame_ms / 1000.0 * sample_rate as f32).round().max(1.0) as usize
    }
}

/// Voice biomarkers for one block. Fields whose preconditions were not met
/// are `None` and skipped on serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceBiomarkerSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f0_hz: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jitter_percent: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shimmer_percent: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hnr_db: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectral_centroid_hz: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectral_rolloff_hz: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectral_flux: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mfcc: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voiced_ratio: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocal_stress: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arousal: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breathing_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breathing_pattern: Option<BreathingPattern>,
}

impl VoiceBiomarkerSet {
    /// Number of populated fields.
    pub fn count(&self) -> usize {
        [
            self.f0_hz.is_some(),
            self.jitter_percent.is_some(),
            self.shimmer_percent.is_some(),
            self.hnr_db.is_some(),
            self.spectral_centroid_hz.is_some(),
            self.spectral_rolloff_hz.is_some(),
            self.spectral_flux.is_some(),
            self.mfcc.is_some(),
            self.voiced_ratio.is_some(),
            self.vocal_stress.is_some(),
            self.valence.is_some(),
            self.arousal.is_some(),
            self.breathing_rate.is_some(),
            self.breathing_pattern.is_some(),
        ]
        .iter()
        .filter(|p| **p)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Session-owned voice history
#[derive(Debug, Clone)]
pub struct VoiceState {
    sample_rate: u32,
    buffer: RingBuffer<f32>,
    pitch_history: PitchHistory,
    spectral: SpectralTracker,
    envelope: RingBuffer<f32>,
    carry: Vec<f32>,
    voiced_frames: u64,
    total_frames: u64,
}

impl VoiceState {
    pub fn new(sample_rate: u32, config: &VoiceConfig) -> Self {
        let buffer_len = (config.buffer_seconds * sample_rate as f32).ceil().max(1.0) as usize;
        Self {
            sample_rate,
            buffer: RingBuffer::new(buffer_len.max(config.frame_len(sample_rate))),
            pitch_history: PitchHistory::new(config.pitch.history_len.max(1)),
            spectral: SpectralTracker::default(),
            envelope: RingBuffer::new(config.breathing.envelope_capacity()),
            carry: Vec::new(),
            voiced_frames: 0,
            total_frames: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Share of blocks classified voiced; `None` before any voiced block.
    pub fn voiced_ratio(&self) -> Option<f32> {
        (self.voiced_frames > 0).then(|| self.voiced_frames as f32 / self.total_frames as f32)
    }

    pub fn envelope_len(&self) -> usize {
        self.envelope.len()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.pitch_history.clear();
        self.spectral.reset();
        self.envelope.clear();
        self.carry.clear();
        self.voiced_frames = 0;
        self.total_frames = 0;
    }

    fn push_envelope(&mut self, samples: &[f32], hop: usize) {
        self.carry.extend_from_slice(samples);
        let mut consumed = 0;
        while self.carry.len() - consumed >= hop {
            self.envelope.push(rms(&self.carry[consumed..consumed + hop]));
            consumed += hop;
        }
        self.carry.drain(..consumed);
    }
}

pub struct VoiceEngine {
    config: VoiceConfig,
    vad: VoiceActivityDetector,
    pitch: PitchEstimator,
    planner: FftPlanner<f32>,
}

impl std::fmt::Debug for VoiceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for VoiceEngine {
    fn default() -> Self {
        Self::new(VoiceConfig::default())
    }
}

impl VoiceEngine {
    pub fn new(config: VoiceConfig) -> Self {
        Self {
            vad: VoiceActivityDetector::new(config.vad.clone()),
            pitch: PitchEstimator::new(config.pitch.clone()),
            planner: FftPlanner::new(),
            config,
        }
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    /// Fresh state for a stream at `sample_rate`.
    pub fn new_state(&self, sample_rate: u32) -> VoiceState {
        VoiceState::new(sample_rate, &self.config)
    }

    /// Process one normalized block.
    pub fn process(&mut self, state: &mut VoiceState, frame: &VoiceFrame) -> VoiceBiomarkerSet {
        if frame.sample_rate != state.sample_rate {
            debug!(
                "voice: sample rate {} -> {}, resetting state",
                state.sample_rate, frame.sample_rate
            );
            *state = VoiceState::new(frame.sample_rate, &self.config);
        }
        let sr = state.sample_rate;
        let hop = ((self.config.breathing.envelope_hop_ms / 1000.0 * sr as f32).round() as usize).max(1);
        state.push_envelope(frame.samples(), hop);

        let decision = self.vad.classify(frame);
        state.total_frames += 1;
        trace!(
            "voice: rms={:.4} zcr={:.3} voiced={}",
            decision.rms,
            decision.zcr,
            decision.voiced
        );

        let mut set = VoiceBiomarkerSet::default();
        if decision.voiced {
            state.voiced_frames += 1;
            for &s in frame.samples() {
                state.buffer.push(s);
            }
            let frame_len = self.config.frame_len(sr);
            if state.buffer.len() >= frame_len {
                let voiced = state.buffer.snapshot();
                let latest = &voiced[voiced.len() - frame_len..];
                self.analyze(state, latest, &voiced, decision.rms, &mut set);
            }
        } else {
            state.buffer.clear();
            state.spectral.reset();
        }

        set.voiced_ratio = state.voiced_ratio();
        if let Some(breathing) =
            estimate_breathing(&state.envelope.snapshot(), &self.config.breathing)
        {
            set.breathing_rate = breathing.rate;
            set.breathing_pattern = Some(breathing.pattern);
        }
        set
    }

    fn analyze(
        &mut self,
        state: &mut VoiceState,
        samples: &[f32],
        voiced: &[f32],
        level: f32,
        set: &mut VoiceBiomarkerSet,
    ) {
        let sr = state.sample_rate;
        let pitch = self.pitch.estimate(samples, sr);
        if let Some(p) = pitch {
            state.pitch_history.push(p.f0_hz);
            let (jitter, shimmer) = jitter_shimmer(voiced, p.period);
            set.jitter_percent = jitter;
            set.shimmer_percent = shimmer;
        }
        set.f0_hz = pitch.and(state.pitch_history.median());

        set.hnr_db = match pitch {
            Some(p) => harmonic_comb_hnr(samples, sr, p.f0_hz, &self.config.hnr),
            None => spectral_hnr(&mut self.planner, samples, sr, &self.config.hnr),
        };

        let spectral = state
            .spectral
            .analyze(&mut self.planner, samples, sr, &self.config.spectral);
        if let Some(features) = &spectral {
            set.spectral_centroid_hz = Some(features.centroid_hz);
            set.spectral_rolloff_hz = Some(features.rolloff_hz);
            set.spectral_flux = features.flux;
            set.mfcc = (!features.mfcc.is_empty()).then(|| features.mfcc.clone());
        }

        let inputs = ProsodyInputs {
            f0_hz: set.f0_hz,
            f0_spread_hz: state.pitch_history.spread(),
            jitter_percent: set.jitter_percent,
            shimmer_percent: set.shimmer_percent,
            high_band_ratio: spectral.as_ref().map(|f| f.high_band_ratio),
            centroid_hz: set.spectral_centroid_hz,
            rms: Some(level),
        };
        set.vocal_stress = vocal_stress(&inputs, &self.config.prosody);
        set.valence = valence(&inputs, &self.config.prosody);
        set.arousal = arousal(&inputs, &self.config.prosody);

        debug!(
            "voice: f0={:?} jitter={:?} shimmer={:?} hnr={:?}",
            set.f0_hz, set.jitter_percent, set.shimmer_percent, set.hnr_db
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::hnr::synthetic_voice;
    use crate::voice::perturbation::track_periods;
    use crate::voice::AudioBlock;

    const SR: u32 = 16_000;

    fn blocks(samples: &[f32], block: usize) -> Vec<VoiceFrame> {
        samples
            .chunks(block)
            .enumerate()
            .filter_map(|(i, chunk)| {
                let ts = i as i64 * 20_000;
                VoiceFrame::from_block(&AudioBlock::new(chunk.to_vec(), SR, ts)).ok()
            })
            .collect()
    }

    #[test]
    fn test_voiced_tone_populates_set() {
        let mut engine = VoiceEngine::default();
        let mut state = engine.new_state(SR);
        let audio = synthetic_voice(150.0, SR, SR as usize, 0.5);
        let mut last = VoiceBiomarkerSet::default();
        for frame in blocks(&audio, 320) {
            last = engine.process(&mut state, &frame);
        }
        let f0 = last.f0_hz.unwrap();
        assert!((f0 - 150.0).abs() < 5.0, "f0 {f0}");
        assert!(last.hnr_db.unwrap() > 10.0);
        assert!(last.spectral_centroid_hz.is_some());
        assert!(last.spectral_flux.is_some());
        assert_eq!(last.mfcc.as_ref().map(Vec::len), Some(13));
        assert_eq!(last.voiced_ratio, Some(1.0));
        let stress = last.vocal_stress.unwrap();
        assert!((0.0..=100.0).contains(&stress));
    }

    #[test]
    fn test_silence_populates_nothing() {
        let mut engine = VoiceEngine::default();
        let mut state = engine.new_state(SR);
        let silence = vec![0.0f32; 3 * SR as usize];
        for frame in blocks(&silence, 320) {
            let set = engine.process(&mut state, &frame);
            assert!(set.is_empty(), "{set:?}");
        }
        assert_eq!(state.voiced_ratio(), None);
    }

    #[test]
    fn test_short_voiced_burst_waits_for_frame() {
        let mut engine = VoiceEngine::default();
        let mut state = engine.new_state(SR);
        let audio = synthetic_voice(150.0, SR, 320, 0.5);
        let set = engine.process(&mut state, &blocks(&audio, 320)[0]);
        assert!(set.f0_hz.is_none());
        assert_eq!(set.voiced_ratio, Some(1.0));
    }

    #[test]
    fn test_sample_rate_change_resets_state() {
        let mut engine = VoiceEngine::default();
        let mut state = engine.new_state(8_000);
        let audio = synthetic_voice(150.0, SR, 320, 0.5);
        engine.process(&mut state, &blocks(&audio, 320)[0]);
        assert_eq!(state.sample_rate(), SR);
        assert_eq!(state.envelope_len(), 0);
    }

    #[test]
    fn test_perturbation_spans_voiced_buffer() {
        let mut engine = VoiceEngine::default();
        let mut state = engine.new_state(SR);
        let audio = synthetic_voice(150.0, SR, SR as usize, 0.5);
        let mut last = VoiceBiomarkerSet::default();
        for frame in blocks(&audio, 320) {
            last = engine.process(&mut state, &frame);
        }

        let voiced = state.buffer.snapshot();
        assert_eq!(voiced.len(), SR as usize);
        let frame_len = engine.config().frame_len(SR);
        let latest = &voiced[voiced.len() - frame_len..];
        let period = engine.pitch.estimate(latest, SR).unwrap().period;

        // one frame holds a handful of cycles, the buffer over a hundred
        assert!(track_periods(latest, period).periods.len() < 12);
        assert!(track_periods(&voiced, period).periods.len() > 100);

        let (jitter, shimmer) = jitter_shimmer(&voiced, period);
        assert_eq!(last.jitter_percent, jitter);
        assert_eq!(last.shimmer_percent, shimmer);
        assert!(last.jitter_percent.unwrap() < 0.5);
        assert!(last.shimmer_percent.unwrap() < 0.5);
    }

    #[test]
    fn test_unvoiced_block_restarts_buffer() {
        let mut engine = VoiceEngine::default();
        let mut state = engine.new_state(SR);
        let audio = synthetic_voice(150.0, SR, SR as usize / 2, 0.5);
        for frame in blocks(&audio, 320) {
            engine.process(&mut state, &frame);
        }
        assert_eq!(state.buffer.len(), SR as usize / 2);

        let silence = vec![0.0f32; 320];
        engine.process(&mut state, &blocks(&silence, 320)[0]);
        assert!(state.buffer.is_empty());
    }
}
