//! Skin-gated region extraction
//!
//! Each frame is reduced to one RGB triple: the mean colour of the skin
//! pixels inside a set of fractional regions, combined across regions by
//! skin-fraction weighted average.

use serde::{Deserialize, Serialize};

use super::frame::VideoFrame;
use super::skin::{rgb_to_ycbcr, SkinClassifier, SkinThresholds};
use crate::rejection::Rejection;

/// Fractional sub-rectangle of the frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub name: String,
    /// Left edge as a fraction of the frame width
    pub x: f32,
    /// Top edge as a fraction of the frame height
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Relative weight when combining regions
    pub weight: f32,
}

impl RegionSpec {
    pub fn new(name: &str, x: f32, y: f32, width: f32, height: f32, weight: f32) -> Self {
        Self {
            name: name.to_string(),
            x,
            y,
            width,
            height,
            weight,
        }
    }

    /// Central 50% of the frame.
    pub fn center() -> Self {
        Self::new("center", 0.25, 0.25, 0.5, 0.5, 1.0)
    }

    /// Pixel bounds `(x0, y0, x1, y1)`, clipped to the frame; `None` if empty.
    fn pixel_bounds(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let (w, h) = (width as f32, height as f32);
        let x0 = (self.x.max(0.0) * w).floor() as u32;
        let y0 = (self.y.max(0.0) * h).floor() as u32;
        let x1 = (((self.x + self.width) * w).ceil().max(0.0) as u32).min(width);
        let y1 = (((self.y + self.height) * h).ceil().max(0.0) as u32).min(height);
        (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
    }
}

/// Region extractor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub regions: Vec<RegionSpec>,
    /// Sample every `stride`-th pixel in both directions
    pub stride: u32,
    /// Minimum skin pixels (after striding) for a region to count
    pub min_skin_pixels: usize,
    /// Minimum skin fraction per region and over the whole ROI
    pub min_skin_fraction: f32,
    /// Accepted mean luma of skin pixels
    pub min_luma: f32,
    pub max_luma: f32,
    pub skin: SkinThresholds,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            regions: vec![
                RegionSpec::new("forehead", 0.35, 0.12, 0.30, 0.14, 1.0),
                RegionSpec::new("left_cheek", 0.22, 0.45, 0.16, 0.16, 0.8),
                RegionSpec::new("right_cheek", 0.62, 0.45, 0.16, 0.16, 0.8),
                RegionSpec::new("nose", 0.45, 0.38, 0.10, 0.16, 0.5),
            ],
            stride: 2,
            min_skin_pixels: 16,
            min_skin_fraction: 0.3,
            min_luma: 40.0,
            max_luma: 240.0,
            skin: SkinThresholds::default(),
        }
    }
}

impl RegionConfig {
    /// Single region covering the central 50% of the frame.
    pub fn center() -> Self {
        Self {
            regions: vec![RegionSpec::center()],
            ..Self::default()
        }
    }
}

/// Per-region measurement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSample {
    pub name: String,
    /// Mean R, G, B of skin pixels (0 when none)
    pub rgb: [f32; 3],
    pub skin_fraction: f32,
    pub skin_pixels: usize,
    pub sampled_pixels: usize,
    pub mean_luma: f32,
    /// Whether the region passed every gate
    pub accepted: bool,
}

/// One quality-scored colour sample per accepted frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSample {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    /// Skin-fraction quality in [0, 1]
    pub quality: f32,
    pub ts_us: i64,
}

/// Reduces frames to skin-only mean colour
#[derive(Debug, Clone)]
pub struct RegionExtractor {
    config: RegionConfig,
    classifier: SkinClassifier,
}

impl Default for RegionExtractor {
    fn default() -> Self {
        Self::new(RegionConfig::default())
    }
}

impl RegionExtractor {
    pub fn new(config: RegionConfig) -> Self {
        let classifier = SkinClassifier::new(config.skin.clone());
        Self { config, classifier }
    }

    pub fn config(&self) -> &RegionConfig {
        &self.config
    }

    /// Measure every configured region without combining them.
    pub fn measure_regions(&self, frame: &VideoFrame) -> Result<Vec<RegionSample>, Rejection> {
        if !frame.is_consistent() {
            return Err(Rejection::MalformedInput);
        }
        let stride = self.config.stride.max(1) as usize;

        let samples = self
            .config
            .regions
            .iter()
            .map(|spec| {
                let mut sampled = 0usize;
                let mut skin = 0usize;
                let mut sums = [0.0f64; 3];
                let mut luma = 0.0f64;

                if let Some((x0, y0, x1, y1)) = spec.pixel_bounds(frame.width, frame.height) {
                    for y in (y0..y1).step_by(stride) {
                        for x in (x0..x1).step_by(stride) {
                            let Some([r, g, b]) = frame.pixel(x, y) else {
                                continue;
                            };
                            sampled += 1;
                            if self.classifier.is_skin(r, g, b) {
                                skin += 1;
                                sums[0] += r as f64;
                                sums[1] += g as f64;
                                sums[2] += b as f64;
                                luma += rgb_to_ycbcr(r, g, b).0 as f64;
                            }
                        }
                    }
                }

                let fraction = if sampled > 0 {
                    skin as f32 / sampled as f32
                } else {
                    0.0
                };
                let (rgb, mean_luma) = if skin > 0 {
                    let n = skin as f64;
                    (
                        [(sums[0] / n) as f32, (sums[1] / n) as f32, (sums[2] / n) as f32],
                        (luma / n) as f32,
                    )
                } else {
                    ([0.0; 3], 0.0)
                };
                let accepted = skin >= self.config.min_skin_pixels
                    && fraction >= self.config.min_skin_fraction
                    && mean_luma >= self.config.min_luma
                    && mean_luma <= self.config.max_luma;

                RegionSample {
                    name: spec.name.clone(),
                    rgb,
                    skin_fraction: fraction,
                    skin_pixels: skin,
                    sampled_pixels: sampled,
                    mean_luma,
                    accepted,
                }
            })
            .collect();

        Ok(samples)
    }

    /// Extract the combined channel sample for a frame.
    ///
    /// Rejected when the frame is malformed, when the ROI as a whole holds
    /// less than the minimum skin fraction, or when no region passes.
    pub fn extract(&self, frame: &VideoFrame) -> Result<ChannelSample, Rejection> {
        let regions = self.measure_regions(frame)?;

        let sampled: usize = regions.iter().map(|r| r.sampled_pixels).sum();
        let skin: usize = regions.iter().map(|r| r.skin_pixels).sum();
        if sampled == 0 || (skin as f32 / sampled as f32) < self.config.min_skin_fraction {
            log::trace!("frame {}: ROI skin {}/{} below gate", frame.ts_us, skin, sampled);
            return Err(Rejection::QualityRejected);
        }

        let total_weight: f32 = self
            .config
            .regions
            .iter()
            .map(|spec| spec.weight.max(0.0))
            .sum();

        let mut weight_sum = 0.0f32;
        let mut rgb = [0.0f32; 3];
        for (spec, region) in self.config.regions.iter().zip(&regions) {
            if !region.accepted {
                continue;
            }
            let w = spec.weight.max(0.0) * region.skin_fraction;
            weight_sum += w;
            for c in 0..3 {
                rgb[c] += w * region.rgb[c];
            }
        }

        if weight_sum <= f32::EPSILON || total_weight <= f32::EPSILON {
            log::trace!("frame {}: no region passed skin gates", frame.ts_us);
            return Err(Rejection::QualityRejected);
        }

        Ok(ChannelSample {
            r: rgb[0] / weight_sum,
            g: rgb[1] / weight_sum,
            b: rgb[2] / weight_sum,
            quality: (weight_sum / total_weight).clamp(0.0, 1.0),
            ts_us: frame.ts_us,
        })
    }
}
