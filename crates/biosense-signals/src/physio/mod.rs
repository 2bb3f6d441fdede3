//! Physiological estimators built on the validated heart rate and the
//! buffered channel window.
//!
//! Notes:
//! - RR intervals are synthesized from the smoothed heart rate, not detected
//!   beat-to-beat. HRV values therefore describe the model jitter as much as
//!   the subject; treat them as indicative.
//! - Every vital here is a heuristic estimate, never a clinical measurement.

mod hrv;
mod respiration;
mod rr;
mod stress;
mod vitals;

pub use hrv::{DfaScales, HrvConfig, HrvEngine, HrvMetricSet};
pub use respiration::{RespirationConfig, RespirationEstimate, RespirationEstimator};
pub use rr::{RrConfig, RrIntervalSeries, RrSynthesizer};
pub use stress::{StressAssessment, StressConfig, StressEstimator, StressInputs, StressLevel};
pub use vitals::{BloodPressure, VitalsConfig, VitalsEstimator};
