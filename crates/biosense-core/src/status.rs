use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Session lifecycle as reported to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    /// Signal window still filling
    Accumulating,
    /// Enough signal buffered; no evaluation cycle yet
    Ready,
    /// Evaluation cycles running
    Analyzing,
    Stopped,
    /// A capture device failed; terminal
    Failed(String),
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Stopped | SessionStatus::Failed(_))
    }
}

/// Notified on every status transition.
pub trait StatusObserver {
    fn on_status(&mut self, status: &SessionStatus);
}

impl<F: FnMut(&SessionStatus)> StatusObserver for F {
    fn on_status(&mut self, status: &SessionStatus) {
        self(status)
    }
}

/// Stop flag shared with other threads; observed at tick boundaries only.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_handle_shared() {
        let handle = StopHandle::new();
        let other = handle.clone();
        assert!(!handle.is_stopped());
        std::thread::spawn(move || other.stop()).join().unwrap();
        assert!(handle.is_stopped());
    }

    #[test]
    fn test_terminal_states() {
        assert!(SessionStatus::Stopped.is_terminal());
        assert!(SessionStatus::Failed("camera".into()).is_terminal());
        assert!(!SessionStatus::Analyzing.is_terminal());
    }
}
