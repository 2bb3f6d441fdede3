//! Derived vitals: SpO2, blood pressure and perfusion index
//!
//! Heuristic estimates from the camera channels, not clinical measurements.
//! Every coefficient lives in [`VitalsConfig`].

use serde::{Deserialize, Serialize};

use crate::dsp::stats::{self, finite};
use crate::dsp::{bandpass_filter, FilterConfig};
use crate::rejection::Rejection;

/// Coefficients and bounds for the derived vitals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalsConfig {
    pub sample_rate: f32,
    /// Cardiac band used to isolate the pulsatile component (Hz)
    pub pulse_band: (f32, f32),
    /// Minimum samples for SpO2 and perfusion
    pub min_samples: usize,

    /// `SpO2 = intercept - slope * R`
    pub spo2_intercept: f32,
    pub spo2_slope: f32,
    pub spo2_min: f32,
    pub spo2_max: f32,

    pub bp_baseline_systolic: f32,
    pub bp_baseline_diastolic: f32,
    /// Heart rate at which no adjustment applies (BPM)
    pub bp_reference_hr: f32,
    /// mmHg per BPM above the reference
    pub bp_systolic_hr_gain: f32,
    pub bp_diastolic_hr_gain: f32,
    /// RMSSD below this counts as low HRV (ms)
    pub bp_low_rmssd_ms: f32,
    /// mmHg per ms of RMSSD below the threshold
    pub bp_systolic_hrv_gain: f32,
    pub bp_diastolic_hrv_gain: f32,
    pub systolic_range: (f32, f32),
    pub diastolic_range: (f32, f32),
    pub min_pulse_pressure: f32,

    pub perfusion_min: f32,
    pub perfusion_max: f32,
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            sample_rate: 30.0,
            pulse_band: (0.75, 3.5),
            min_samples: 90,
            spo2_intercept: 110.0,
            spo2_slope: 25.0,
            spo2_min: 85.0,
            spo2_max: 100.0,
            bp_baseline_systolic: 120.0,
            bp_baseline_diastolic: 80.0,
            bp_reference_hr: 70.0,
            bp_systolic_hr_gain: 0.5,
            bp_diastolic_hr_gain: 0.3,
            bp_low_rmssd_ms: 40.0,
            bp_systolic_hrv_gain: 0.2,
            bp_diastolic_hrv_gain: 0.1,
            systolic_range: (90.0, 180.0),
            diastolic_range: (60.0, 120.0),
            min_pulse_pressure: 20.0,
            perfusion_min: 0.1,
            perfusion_max: 10.0,
        }
    }
}

/// Estimated arterial pressure (mmHg)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BloodPressure {
    pub systolic: f32,
    pub diastolic: f32,
}

/// Pulsatile (AC) and baseline (DC) components of one channel
struct Components {
    ac: f32,
    dc: f32,
    peak_to_peak: f32,
}

#[derive(Debug, Clone, Default)]
pub struct VitalsEstimator {
    config: VitalsConfig,
}

impl VitalsEstimator {
    pub fn new(config: VitalsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VitalsConfig {
        &self.config
    }

    fn components(&self, channel: &[f32]) -> Result<Components, Rejection> {
        let need = self.config.min_samples.max(8);
        if channel.len() < need {
            return Err(Rejection::need(channel.len(), need));
        }
        if channel.iter().any(|v| !v.is_finite()) {
            return Err(Rejection::MalformedInput);
        }
        let dc = stats::mean(channel).ok_or(Rejection::QualityRejected)?;
        if dc <= f32::EPSILON {
            return Err(Rejection::QualityRejected);
        }
        let config = FilterConfig {
            sample_rate: self.config.sample_rate,
            min_freq: self.config.pulse_band.0,
            max_freq: self.config.pulse_band.1,
            high_pass_order: 1,
            low_pass_order: 1,
        };
        let filtered = bandpass_filter(channel, &config);
        // Drop the first quarter while the filter settles
        let pulsatile = &filtered[filtered.len() / 4..];
        let ac = stats::std_dev(pulsatile).ok_or(Rejection::QualityRejected)?;
        let max = pulsatile.iter().copied().fold(f32::MIN, f32::max);
        let min = pulsatile.iter().copied().fold(f32::MAX, f32::min);
        Ok(Components {
            ac,
            dc,
            peak_to_peak: max - min,
        })
    }

    /// Ratio-of-ratios SpO2 with blue as the infrared proxy.
    pub fn spo2(&self, red: &[f32], blue: &[f32]) -> Result<f32, Rejection> {
        let red = self.components(red)?;
        let blue = self.components(blue)?;
        if red.ac <= f32::EPSILON || blue.ac <= f32::EPSILON {
            return Err(Rejection::QualityRejected);
        }
        let ratio = (red.ac / red.dc) / (blue.ac / blue.dc);
        let spo2 = finite(self.config.spo2_intercept - self.config.spo2_slope * ratio)
            .ok_or(Rejection::QualityRejected)?;
        Ok(spo2.clamp(self.config.spo2_min, self.config.spo2_max))
    }

    /// Baseline pressure shifted by heart rate and, when known, low HRV.
    pub fn blood_pressure(
        &self,
        heart_rate_bpm: f32,
        rmssd_ms: Option<f32>,
    ) -> Result<BloodPressure, Rejection> {
        if !heart_rate_bpm.is_finite() || heart_rate_bpm <= 0.0 {
            return Err(Rejection::MalformedInput);
        }
        let c = &self.config;
        let hr_delta = heart_rate_bpm - c.bp_reference_hr;
        let mut systolic = c.bp_baseline_systolic + c.bp_systolic_hr_gain * hr_delta;
        let mut diastolic = c.bp_baseline_diastolic + c.bp_diastolic_hr_gain * hr_delta;

        if let Some(rmssd) = rmssd_ms.filter(|r| r.is_finite()) {
            let deficit = (c.bp_low_rmssd_ms - rmssd).max(0.0);
            systolic += c.bp_systolic_hrv_gain * deficit;
            diastolic += c.bp_diastolic_hrv_gain * deficit;
        }

        let systolic_max = c.systolic_range.1;
        let diastolic_min = c.diastolic_range.0;
        systolic = systolic.clamp(c.systolic_range.0, systolic_max);
        diastolic = diastolic.clamp(diastolic_min, c.diastolic_range.1);
        if systolic - diastolic < c.min_pulse_pressure {
            systolic = (diastolic + c.min_pulse_pressure).min(systolic_max);
            diastolic = (systolic - c.min_pulse_pressure).max(diastolic_min);
        }
        Ok(BloodPressure {
            systolic,
            diastolic,
        })
    }

    /// Pulsatile amplitude over baseline, in percent, scaled by quality.
    pub fn perfusion_index(&self, green: &[f32], quality: f32) -> Result<f32, Rejection> {
        let parts = self.components(green)?;
        if parts.peak_to_peak <= f32::EPSILON {
            return Err(Rejection::QualityRejected);
        }
        let pi = finite(parts.peak_to_peak / parts.dc * 100.0 * quality.clamp(0.0, 1.0))
            .ok_or(Rejection::QualityRejected)?;
        Ok(pi.clamp(self.config.perfusion_min, self.config.perfusion_max))
    }
}
