//! Voice Biomarker Engine
//!
//! Runs on audio blocks independently of the video path.
//!
//! - `VoiceActivityDetector` - RMS / zero-crossing gate
//! - `PitchEstimator` - autocorrelation F0 with a median history
//! - `jitter_shimmer` - cycle-to-cycle period and amplitude perturbation
//! - `harmonic_comb_hnr` / `spectral_hnr` - harmonic-to-noise ratio
//! - `SpectralTracker` - centroid, rolloff, flux, MFCC
//! - `prosody` - vocal stress, valence, arousal, breathing
//! - `VoiceEngine` - the per-block pipeline over a caller-owned `VoiceState`

mod engine;
mod frame;
mod hnr;
mod perturbation;
mod pitch;
pub mod prosody;
mod spectral;
mod vad;

pub use engine::{VoiceBiomarkerSet, VoiceConfig, VoiceEngine, VoiceState};
pub use frame::{rms, zero_crossing_rate, AudioBlock, VoiceFrame};
pub use hnr::{harmonic_comb_hnr, spectral_hnr, synthetic_voice, HnrConfig};
pub use perturbation::{jitter_shimmer, relative_average_perturbation, track_periods, PeriodTrack};
pub use pitch::{PitchConfig, PitchEstimate, PitchEstimator, PitchHistory};
pub use prosody::{BreathingConfig, BreathingEstimate, BreathingPattern, ProsodyConfig, ProsodyInputs};
pub use spectral::{mfcc, SpectralConfig, SpectralFeatures, SpectralTracker};
pub use vad::{VadConfig, VadDecision, VoiceActivityDetector};
