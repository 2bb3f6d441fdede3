//! The externally visible per-cycle artifact.

use serde::Serialize;

use biosense_signals::physio::StressLevel;
use biosense_signals::{HrvMetricSet, VoiceBiomarkerSet};

/// Video-derived biomarkers; `None` fields were not computable this cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RppgBiomarkers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate_bpm: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate_quality: Option<f32>,
    #[serde(flatten)]
    pub hrv: HrvMetricSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spo2_percent: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub systolic_mmhg: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diastolic_mmhg: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respiratory_confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perfusion_index: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stress_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stress_level: Option<StressLevel>,
    /// Motion flagged on the analysed window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion_artifact: Option<bool>,
}

impl RppgBiomarkers {
    /// Number of computed biomarkers, HRV metrics included.
    pub fn count(&self) -> usize {
        let own = [
            self.heart_rate_bpm.is_some(),
            self.spo2_percent.is_some(),
            self.systolic_mmhg.is_some(),
            self.diastolic_mmhg.is_some(),
            self.respiratory_rate.is_some(),
            self.perfusion_index.is_some(),
            self.stress_score.is_some(),
        ]
        .iter()
        .filter(|p| **p)
        .count();
        own + self.hrv.count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BiomarkerSnapshot {
    pub rppg: RppgBiomarkers,
    pub voice: VoiceBiomarkerSet,
    pub calculated_count: usize,
    /// Heart-rate estimate quality, or mean extraction quality without one
    pub quality_score: f32,
    pub ts_us: i64,
    pub frame_number: u64,
}
