//! Timestamp tracking and verification
//!
//! Frame, audio and evaluation timestamps must never flow backwards.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Seconds between two microsecond timestamps.
pub fn dt_sec(now_us: i64, last_us: i64) -> f32 {
    (now_us - last_us) as f32 / 1_000_000.0
}

/// Per-stream timestamp log with strict monotonicity enforcement.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TimestampLog {
    pub last_frame: Option<i64>,
    pub last_audio: Option<i64>,
    pub last_evaluation: Option<i64>,
    pub session_start: Option<i64>,
}

impl TimestampLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame timestamp; returns seconds since the previous frame (0.0 if first).
    pub fn update_frame(&mut self, ts_us: i64) -> Result<f32, SessionError> {
        let dt = Self::advance(&mut self.last_frame, ts_us, "frame")?;
        self.start_session(ts_us);
        Ok(dt)
    }

    /// Record an audio block timestamp.
    pub fn update_audio(&mut self, ts_us: i64) -> Result<f32, SessionError> {
        let dt = Self::advance(&mut self.last_audio, ts_us, "audio")?;
        self.start_session(ts_us);
        Ok(dt)
    }

    /// Record an evaluation cycle; returns seconds since the previous cycle.
    pub fn update_evaluation(&mut self, ts_us: i64) -> Result<f32, SessionError> {
        Self::advance(&mut self.last_evaluation, ts_us, "evaluation")
    }

    /// Latest data timestamp seen on any input stream.
    pub fn latest_input(&self) -> Option<i64> {
        match (self.last_frame, self.last_audio) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn start_session(&mut self, ts_us: i64) {
        if self.session_start.is_none() {
            self.session_start = Some(ts_us);
        }
    }

    pub fn session_duration(&self, now_us: i64) -> f32 {
        self.session_start
            .map(|start| dt_sec(now_us, start))
            .unwrap_or(0.0)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn advance(
        last: &mut Option<i64>,
        ts_us: i64,
        stream: &'static str,
    ) -> Result<f32, SessionError> {
        let dt = match *last {
            Some(prev) if ts_us < prev => {
                return Err(SessionError::NonMonotonicTimestamp {
                    stream,
                    last_us: prev,
                    got_us: ts_us,
                })
            }
            Some(prev) => dt_sec(ts_us, prev),
            None => 0.0,
        };
        *last = Some(ts_us);
        Ok(dt)
    }
}
