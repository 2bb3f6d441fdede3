//! Skin pixel classification
//!
//! A pixel counts as skin only when it passes the RGB ordering rule, the
//! HSV hue/saturation window and the YCbCr chroma box together.

use serde::{Deserialize, Serialize};

/// Thresholds for the combined skin rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinThresholds {
    /// Per-channel brightness floors
    pub min_red: u8,
    pub min_green: u8,
    pub min_blue: u8,
    /// Minimum max-min channel spread
    pub min_spread: u8,
    /// Hue window in degrees
    pub hue_min_deg: f32,
    pub hue_max_deg: f32,
    /// HSV saturation window
    pub saturation_min: f32,
    pub saturation_max: f32,
    /// YCbCr chroma box
    pub cb_min: f32,
    pub cb_max: f32,
    pub cr_min: f32,
    pub cr_max: f32,
}

impl Default for SkinThresholds {
    fn default() -> Self {
        Self {
            min_red: 95,
            min_green: 40,
            min_blue: 20,
            min_spread: 15,
            hue_min_deg: 0.0,
            hue_max_deg: 50.0,
            saturation_min: 0.23,
            saturation_max: 0.68,
            cb_min: 77.0,
            cb_max: 127.0,
            cr_min: 133.0,
            cr_max: 173.0,
        }
    }
}

/// Convert RGB (0-255) to HSV: hue in degrees [0, 360), saturation and value in [0, 1].
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let saturation = if max <= f32::EPSILON { 0.0 } else { delta / max };

    (hue, saturation, max)
}

/// Convert RGB (0-255) to full-range YCbCr (ITU-R BT.601).
pub fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
    let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
    (y, cb, cr)
}

/// Combined RGB / HSV / YCbCr skin classifier
#[derive(Debug, Clone, Default)]
pub struct SkinClassifier {
    thresholds: SkinThresholds,
}

impl SkinClassifier {
    pub fn new(thresholds: SkinThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SkinThresholds {
        &self.thresholds
    }

    /// Classify one pixel.
    pub fn is_skin(&self, r: u8, g: u8, b: u8) -> bool {
        let t = &self.thresholds;

        // RGB: r > g > b with enough brightness and spread
        if !(r > g && g > b) || r - b < t.min_spread {
            return false;
        }
        if r < t.min_red || g < t.min_green || b < t.min_blue {
            return false;
        }

        let (hue, sat, _) = rgb_to_hsv(r, g, b);
        if hue < t.hue_min_deg || hue > t.hue_max_deg {
            return false;
        }
        if sat < t.saturation_min || sat > t.saturation_max {
            return false;
        }

        let (_, cb, cr) = rgb_to_ycbcr(r, g, b);
        (t.cb_min..=t.cb_max).contains(&cb) && (t.cr_min..=t.cr_max).contains(&cr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hsv_primaries() {
        let (h, s, v) = rgb_to_hsv(255, 0, 0);
        assert_relative_eq!(h, 0.0);
        assert_relative_eq!(s, 1.0);
        assert_relative_eq!(v, 1.0);

        let (h, _, _) = rgb_to_hsv(0, 255, 0);
        assert_relative_eq!(h, 120.0);
        let (h, _, _) = rgb_to_hsv(0, 0, 255);
        assert_relative_eq!(h, 240.0);
    }

    #[test]
    fn test_ycbcr_gray_is_neutral() {
        let (y, cb, cr) = rgb_to_ycbcr(128, 128, 128);
        assert_relative_eq!(y, 128.0, epsilon = 0.01);
        assert_relative_eq!(cb, 128.0, epsilon = 0.01);
        assert_relative_eq!(cr, 128.0, epsilon = 0.01);
    }

    #[test]
    fn test_typical_skin_tones_accepted() {
        let classifier = SkinClassifier::default();
        assert!(classifier.is_skin(200, 140, 110));
        assert!(classifier.is_skin(180, 120, 90));
        assert!(classifier.is_skin(120, 80, 60));
    }

    #[test]
    fn test_non_skin_rejected() {
        let classifier = SkinClassifier::default();
        // gray, blue, green, saturated red, dark
        assert!(!classifier.is_skin(128, 128, 128));
        assert!(!classifier.is_skin(40, 90, 200));
        assert!(!classifier.is_skin(60, 180, 60));
        assert!(!classifier.is_skin(250, 10, 5));
        assert!(!classifier.is_skin(30, 20, 10));
    }
}
