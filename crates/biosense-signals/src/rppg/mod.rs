//! Remote photoplethysmography heart-rate core
//!
//! Turns the green-channel `SignalWindow` into a validated heart rate:
//!
//! - **conditioner**: quality gate, band-pass filtering, Hamming window
//! - **frequency**: zero-padded FFT peak search with SNR and harmonic checks
//! - **validator**: consistency-window averaging or clamped exponential smoothing
//!
//! Stages hold configuration only. Buffers and histories are owned by the
//! caller and lent in per call.

mod conditioner;
mod frequency;
mod validator;

pub use conditioner::{ConditionedWindow, ConditionerConfig, ConditionerStatus, SignalConditioner};
pub use frequency::{FrequencyAnalyzer, FrequencyConfig, FrequencyPeak, HeartRateEstimate};
pub use validator::{
    HeartRateHistory, SmoothingPath, TemporalValidator, ValidatedHeartRate, ValidatorConfig,
};
