//! Reasons a stage produced no output.
//!
//! None of these are errors: every variant is an expected, recoverable
//! outcome that simply skips the dependent computation for this cycle.

use std::fmt;

/// Why a stage declined to produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Buffer or history too short for the computation.
    InsufficientData { have: usize, need: usize },
    /// Extraction quality or spectral SNR below threshold.
    QualityRejected,
    /// Computed value outside plausible physiological bounds.
    OutOfPhysiologicalRange,
    /// Input buffer inconsistent with its declared shape.
    MalformedInput,
}

impl Rejection {
    pub(crate) fn need(have: usize, need: usize) -> Self {
        Rejection::InsufficientData { have, need }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::InsufficientData { have, need } => {
                write!(f, "insufficient data ({have}/{need})")
            }
            Rejection::QualityRejected => write!(f, "quality below threshold"),
            Rejection::OutOfPhysiologicalRange => write!(f, "outside physiological range"),
            Rejection::MalformedInput => write!(f, "malformed input buffer"),
        }
    }
}
