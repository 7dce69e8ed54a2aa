//! Decoded frames and source metadata.
//!
//! - `Frame`: one decoded RGB image plus its position in the stream.
//! - `SourceInfo`: dimensions and rate a source reports when it is opened.
//!
//! A `Frame` lives for one pump iteration. It is moved through the transform
//! and handed to the sink by reference, then dropped. `Frame` is not `Clone`.

use anyhow::{anyhow, Result};
use image::RgbImage;
use std::time::{Duration, Instant};

// ----------------------------------------------------------------------------
// SourceInfo
// ----------------------------------------------------------------------------

/// Stream properties captured at open time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    /// Frames per second as reported by the source (0.0 when unknown).
    pub fps: f64,
}

impl SourceInfo {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self { width, height, fps }
    }
}

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// One decoded RGB8 frame.
pub struct Frame {
    image: RgbImage,
    /// Zero-based position in the source stream.
    index: u64,
    captured_at: Instant,
}

impl Frame {
    pub fn new(image: RgbImage, index: u64) -> Self {
        Self {
            image,
            index,
            captured_at: Instant::now(),
        }
    }

    /// Build a frame from tightly packed RGB24 bytes.
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>, index: u64) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("RGB buffer does not fit {}x{}", width, height))?;
        Ok(Self::new(image, index))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Packed RGB24 bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Replace the pixel content, keeping index and capture time.
    pub fn with_image(self, image: RgbImage) -> Self {
        Self {
            image,
            index: self.index,
            captured_at: self.captured_at,
        }
    }

    /// Time since the frame was decoded.
    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("index", &self.index)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}
