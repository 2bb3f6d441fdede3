//! Decoded frame buffer.

use serde::{Deserialize, Serialize};

/// Pixel layout of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 4 bytes per pixel, alpha ignored
    #[default]
    Rgba8,
    /// 3 bytes per pixel
    Rgb8,
}

impl PixelFormat {
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// Decoded camera frame (row-major, no padding)
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Capture timestamp in microseconds
    pub ts_us: i64,
}

impl VideoFrame {
    /// Create an RGBA frame.
    pub fn rgba(pixels: Vec<u8>, width: u32, height: u32, ts_us: i64) -> Self {
        Self {
            pixels,
            width,
            height,
            format: PixelFormat::Rgba8,
            ts_us,
        }
    }

    /// Create an RGB frame.
    pub fn rgb(pixels: Vec<u8>, width: u32, height: u32, ts_us: i64) -> Self {
        Self {
            pixels,
            width,
            height,
            format: PixelFormat::Rgb8,
            ts_us,
        }
    }

    /// Uniformly coloured RGBA frame.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], ts_us: i64) -> Self {
        let count = (width as usize) * (height as usize);
        let mut pixels = Vec::with_capacity(count * 4);
        for _ in 0..count {
            pixels.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        Self::rgba(pixels, width, height, ts_us)
    }

    /// Whether the buffer length matches `width * height * channels`.
    pub fn is_consistent(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.pixels.len()
                == (self.width as usize) * (self.height as usize) * self.format.channels()
    }

    /// Get pixel at (x, y) as [R, G, B]. Out-of-bounds reads return `None`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let ch = self.format.channels();
        let idx = ((y as usize) * (self.width as usize) + x as usize) * ch;
        let px = self.pixels.get(idx..idx + 3)?;
        Some([px[0], px[1], px[2]])
    }

    /// Set pixel at (x, y); alpha is left untouched.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let ch = self.format.channels();
        let idx = ((y as usize) * (self.width as usize) + x as usize) * ch;
        if let Some(px) = self.pixels.get_mut(idx..idx + 3) {
            px.copy_from_slice(&rgb);
        }
    }

    /// Fill a rectangle (clipped to the frame).
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, rgb: [u8; 3]) {
        for yy in y..y.saturating_add(h).min(self.height) {
            for xx in x..x.saturating_add(w).min(self.width) {
                self.set_pixel(xx, yy, rgb);
            }
        }
    }
}
