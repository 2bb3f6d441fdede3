//! biosense core: session orchestration around `biosense-signals`.
//!
//! The [`SessionController`] owns all per-session state, pulls frames and
//! audio from injected sources (or accepts pushed data), runs one
//! evaluation cycle per configured interval of data time and hands each
//! non-empty [`BiomarkerSnapshot`] to a [`SnapshotSink`]. Slow consumers
//! lose snapshots; acquisition never waits for them.
//!
//! ```ignore
//! use biosense_core::{BiosenseConfig, ChannelSink, SessionController};
//! use biosense_core::synthetic::{FaceParams, SyntheticFace, SyntheticVoice, VoiceParams};
//!
//! let (sink, snapshots) = ChannelSink::new();
//! let mut session = SessionController::new(
//!     BiosenseConfig::default(),
//!     SyntheticFace::new(FaceParams::default()),
//!     SyntheticVoice::aligned_to(VoiceParams::default(), 30.0),
//!     sink,
//! )?;
//! while session.tick().is_ok() {
//!     if let Ok(snapshot) = snapshots.try_recv() {
//!         println!("{:?}", snapshot.rppg.heart_rate_bpm);
//!     }
//! }
//! ```

#![allow(clippy::manual_clamp)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod session;
pub mod sink;
pub mod snapshot;
pub mod source;
pub mod status;
pub mod synthetic;
pub mod timestamp;

pub use config::{BiosenseConfig, ConfigError, DiagnosticsConfig, SessionConfig};
pub use diagnostics::{TraceCategory, TraceEvent, TraceLog};
pub use error::{Device, SessionError, SourceError};
pub use session::{CycleOutcome, SessionController, SessionState, SessionStats};
pub use sink::{CallbackSink, ChannelSink, Delivery, NullSink, SnapshotSink};
pub use snapshot::{BiomarkerSnapshot, RppgBiomarkers};
pub use source::{AudioSource, FrameSource, NoSource};
pub use status::{SessionStatus, StatusObserver, StopHandle};
pub use timestamp::TimestampLog;
