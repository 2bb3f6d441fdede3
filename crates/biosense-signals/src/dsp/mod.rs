//! DSP (Digital Signal Processing) module
//!
//! Provides the primitives shared by the video and voice pipelines.
//!
//! - `RingBuffer` / `SignalWindow` - bounded FIFO buffers
//! - `Spectrum` - zero-padded FFT power spectrum with band queries
//! - `FilterConfig` - first-order IIR high-pass / low-pass cascades
//! - `SignalQualityAnalyzer` - motion artifact detection
//! - `detect_peaks` - threshold peak picking with refractory spacing
//! - `stats` - mean / std / median / percentile helpers

mod filters;
mod peaks;
mod ring_buffer;
mod signal_quality;
mod spectrum;
pub mod stats;

pub use filters::{bandpass_filter, high_pass, low_pass, FilterConfig};
pub use peaks::{detect_peaks, peak_intervals};
pub use ring_buffer::{RingBuffer, SignalWindow};
pub use signal_quality::{SignalQuality, SignalQualityAnalyzer, SignalQualityConfig};
pub use spectrum::{apply_hamming, hamming_window, SpectralPeak, Spectrum};
