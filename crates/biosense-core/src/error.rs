use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by the session controller.
///
/// Expected "not enough data yet" conditions never appear here; those are
/// absent fields in the snapshot.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("{device} unavailable: {reason}")]
    DeviceUnavailable { device: Device, reason: String },
    #[error("Timestamp regression on {stream}: {got_us}us < last {last_us}us")]
    NonMonotonicTimestamp {
        stream: &'static str,
        last_us: i64,
        got_us: i64,
    },
    #[error("Session stopped")]
    Stopped,
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Capture device behind a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Camera,
    Microphone,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Camera => write!(f, "camera"),
            Device::Microphone => write!(f, "microphone"),
        }
    }
}

/// Failure reported by a frame or audio source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SourceError(pub String);

impl SourceError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}
