//! Vision module: frame buffers and skin-gated region extraction
//!
//! This module provides:
//! - `VideoFrame` - decoded RGBA/RGB frame handed in by the host
//! - `SkinClassifier` - combined RGB / HSV / YCbCr skin rule
//! - `RegionExtractor` - fractional ROIs (forehead, cheeks, nose) producing
//!   one quality-weighted `ChannelSample` per frame
//!
//! # Design
//!
//! No face detection happens here. Regions are fixed fractions of the
//! frame; frames without enough skin inside them are rejected, which
//! covers poor lighting, occlusion and an absent face alike.

mod frame;
mod region;
mod skin;

pub use frame::{PixelFormat, VideoFrame};
pub use region::{ChannelSample, RegionConfig, RegionExtractor, RegionSample, RegionSpec};
pub use skin::{rgb_to_hsv, rgb_to_ycbcr, SkinClassifier, SkinThresholds};
