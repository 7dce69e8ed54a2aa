//! Per-frame transforms.
//!
//! A transform takes ownership of a frame and returns the frame to forward
//! to the sink, plus a detection result when the transform is a detector.

mod detection;
mod edges;

use anyhow::Result;

use crate::detect::DetectionResult;
use crate::frame::Frame;

pub use detection::DetectTransform;
pub use edges::{gaussian_kernel, gaussian_sigma, CannyParams, EdgeMask};

/// Output of one transform step.
#[derive(Debug)]
pub struct Transformed {
    pub frame: Frame,
    /// `Some` for detector transforms, even when nothing was found.
    pub detection: Option<DetectionResult>,
}

impl Transformed {
    pub fn frame(frame: Frame) -> Self {
        Self {
            frame,
            detection: None,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.detection
            .as_ref()
            .is_some_and(DetectionResult::is_positive)
    }
}

pub trait Transform {
    fn name(&self) -> &'static str;

    fn apply(&mut self, frame: Frame) -> Result<Transformed>;

    /// Noun for the positive-detection counter, or `None` when the
    /// transform never detects anything.
    fn subject(&self) -> Option<&'static str> {
        None
    }
}

/// Pass-through.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl Transform for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn apply(&mut self, frame: Frame) -> Result<Transformed> {
        Ok(Transformed::frame(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn identity_passes_frame_through() {
        let frame = Frame::new(RgbImage::new(3, 2), 4);
        let out = Identity.apply(frame).unwrap();
        assert_eq!(out.frame.index(), 4);
        assert!(out.detection.is_none());
        assert!(!out.is_positive());
        assert_eq!(Identity.subject(), None);
    }
}
