//! Heart-rate variability engine
//!
//! Four independent metric domains computed from an RR interval series:
//!
//! | Domain | Metrics | Minimum intervals |
//! |---|---|---|
//! | time | mean RR/HR, RMSSD, SDNN, pNN50, pNN20, SDSD | 10 |
//! | frequency | VLF/LF/HF/total power, LF/HF, normalized units, band peaks | 10 |
//! | geometric | triangular index, TINN, Poincare SD1/SD2 | 20 |
//! | nonlinear | sample entropy, approximate entropy, DFA a1/a2 | 10 |
//!
//! Each domain is gated separately and each metric is dropped on its own
//! when it comes out non-finite, so one failure never hides the others.

mod frequency;
mod geometric;
mod nonlinear;
mod time;

use serde::{Deserialize, Serialize};

/// Scale range (in beats) for one DFA exponent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DfaScales {
    pub min: usize,
    pub max: usize,
}

/// HRV engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HrvConfig {
    pub min_time_domain: usize,
    pub min_frequency_domain: usize,
    pub min_geometric: usize,
    pub min_nonlinear: usize,
    /// Uniform resampling rate for spectral analysis (Hz)
    pub resample_hz: f32,
    /// Minimum FFT length for the resampled tachogram
    pub fft_size: usize,
    pub vlf_band: (f32, f32),
    pub lf_band: (f32, f32),
    pub hf_band: (f32, f32),
    /// Histogram bin width for the triangular index (ms)
    pub histogram_bin_ms: f32,
    /// Entropy embedding dimension
    pub entropy_m: usize,
    /// Entropy tolerance as a fraction of SDNN
    pub entropy_r: f32,
    pub dfa_short: DfaScales,
    pub dfa_long: DfaScales,
}

impl Default for HrvConfig {
    fn default() -> Self {
        Self {
            min_time_domain: 10,
            min_frequency_domain: 10,
            min_geometric: 20,
            min_nonlinear: 10,
            resample_hz: 4.0,
            fft_size: 256,
            vlf_band: (0.003, 0.04),
            lf_band: (0.04, 0.15),
            hf_band: (0.15, 0.4),
            histogram_bin_ms: 7.8125,
            entropy_m: 2,
            entropy_r: 0.2,
            dfa_short: DfaScales { min: 4, max: 11 },
            dfa_long: DfaScales { min: 12, max: 25 },
        }
    }
}

/// HRV metrics; a `None` field was not computable this cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HrvMetricSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_rr_ms: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_hr_bpm: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rmssd_ms: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdnn_ms: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnn50: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnn20: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdsd_ms: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlf_power: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lf_power: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hf_power: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_power: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lf_hf_ratio: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lf_nu: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hf_nu: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lf_peak_hz: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hf_peak_hz: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub triangular_index: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tinn_ms: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sd1_ms: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sd2_ms: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_entropy: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approximate_entropy: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dfa_alpha1: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dfa_alpha2: Option<f32>,
}

impl HrvMetricSet {
    /// Number of metrics present.
    pub fn count(&self) -> usize {
        [
            self.mean_rr_ms,
            self.mean_hr_bpm,
            self.rmssd_ms,
            self.sdnn_ms,
            self.pnn50,
            self.pnn20,
            self.sdsd_ms,
            self.vlf_power,
            self.lf_power,
            self.hf_power,
            self.total_power,
            self.lf_hf_ratio,
            self.lf_nu,
            self.hf_nu,
            self.lf_peak_hz,
            self.hf_peak_hz,
            self.triangular_index,
            self.tinn_ms,
            self.sd1_ms,
            self.sd2_ms,
            self.sample_entropy,
            self.approximate_entropy,
            self.dfa_alpha1,
            self.dfa_alpha2,
        ]
        .iter()
        .filter(|m| m.is_some())
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Computes [`HrvMetricSet`]s from RR intervals
#[derive(Debug, Clone, Default)]
pub struct HrvEngine {
    config: HrvConfig,
}

impl HrvEngine {
    pub fn new(config: HrvConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HrvConfig {
        &self.config
    }

    /// Compute every metric whose sample-count precondition holds.
    pub fn compute(&self, rr_ms: &[f32]) -> HrvMetricSet {
        let rr: Vec<f32> = rr_ms
            .iter()
            .copied()
            .filter(|v| v.is_finite() && *v > 0.0)
            .collect();
        let n = rr.len();
        let mut set = HrvMetricSet::default();

        if n >= self.config.min_time_domain.max(2) {
            time::fill(&rr, &mut set);
        }
        if n >= self.config.min_frequency_domain.max(4) {
            frequency::fill(&rr, &self.config, &mut set);
        }
        if n >= self.config.min_geometric.max(3) {
            geometric::fill(&rr, &self.config, &mut set);
        }
        if n >= self.config.min_nonlinear.max(self.config.entropy_m + 2) {
            nonlinear::fill(&rr, &self.config, &mut set);
        }

        log::debug!("HRV: {} intervals, {} metrics", n, set.count());
        set
    }
}
