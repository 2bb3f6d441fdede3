//! # biosense-signals
//!
//! Biometric signal processing for biosense.
//!
//! This crate turns already-decoded camera frames and microphone blocks into
//! physiological and vocal biomarkers. It performs no I/O and owns no
//! session state; the session controller in `biosense-core` owns every
//! buffer and lends it to the stages below.
//!
//! - **vision**: skin-gated region extraction producing one [`ChannelSample`] per frame
//! - **rppg**: signal conditioning, FFT heart-rate analysis and temporal validation
//! - **physio**: synthetic RR intervals, HRV (time/frequency/geometric/nonlinear),
//!   respiration, SpO2, blood pressure, perfusion and stress
//! - **voice**: voice activity, F0, jitter, shimmer, HNR, spectral and prosodic features
//! - **dsp**: FFT, filters, ring buffers and small statistics helpers
//!
//! ## Example
//!
//! ```ignore
//! use biosense_signals::rppg::{FrequencyAnalyzer, SignalConditioner};
//! use biosense_signals::SignalWindow;
//!
//! let conditioner = SignalConditioner::default();
//! let mut analyzer = FrequencyAnalyzer::default();
//! let mut window = SignalWindow::new(900);
//!
//! for g in green_channel {
//!     window.push(g);
//! }
//!
//! if let Ok(conditioned) = conditioner.condition(&window) {
//!     if let Ok(estimate) = analyzer.estimate(&conditioned, 1.0, ts_us) {
//!         println!("Heart rate: {} BPM (quality {:.2})", estimate.bpm, estimate.quality);
//!     }
//! }
//! ```

#![allow(clippy::needless_range_loop)]
#![allow(clippy::manual_clamp)]

pub mod dsp;
pub mod physio;
mod rejection;
pub mod rppg;
pub mod vision;
pub mod voice;

pub use dsp::{RingBuffer, SignalWindow};
pub use physio::{HrvMetricSet, RrIntervalSeries, StressLevel};
pub use rejection::Rejection;
pub use rppg::{FrequencyPeak, HeartRateEstimate, HeartRateHistory};
pub use vision::{ChannelSample, VideoFrame};
pub use voice::{AudioBlock, VoiceBiomarkerSet, VoiceFrame};
