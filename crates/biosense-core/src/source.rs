//! Input contracts: pull-style frame and audio sources.

use biosense_signals::{AudioBlock, VideoFrame};

use crate::error::SourceError;

/// Supplies decoded camera frames.
///
/// `Ok(None)` means no frame is ready this tick; `Err` means the device is
/// gone and the session stops.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, SourceError>;
}

/// Supplies microphone blocks with samples in [-1, 1].
pub trait AudioSource {
    fn next_audio_block(&mut self) -> Result<Option<AudioBlock>, SourceError>;
}

/// Source that never yields data, for push-driven sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSource;

impl FrameSource for NoSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, SourceError> {
        Ok(None)
    }
}

impl AudioSource for NoSource {
    fn next_audio_block(&mut self) -> Result<Option<AudioBlock>, SourceError> {
        Ok(None)
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, SourceError> {
        (**self).next_frame()
    }
}

impl<T: AudioSource + ?Sized> AudioSource for Box<T> {
    fn next_audio_block(&mut self) -> Result<Option<AudioBlock>, SourceError> {
        (**self).next_audio_block()
    }
}
