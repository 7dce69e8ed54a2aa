use anyhow::Result;

use crate::detect::backend::{DetectionCapability, DetectorBackend};
use crate::detect::result::{Detection, DetectionResult};
use crate::frame::Frame;

/// Default mean-luma threshold for a positive stub detection.
pub const DEFAULT_STUB_THRESHOLD: f64 = 128.0;

/// Stub backend for testing. Reports one full-frame detection whenever the
/// frame's mean luma reaches the threshold.
pub struct StubBackend {
    threshold: f64,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_STUB_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(
            capability,
            DetectionCapability::Pedestrian | DetectionCapability::Motion
        )
    }

    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult> {
        let luma = mean_luma(frame);
        if luma >= self.threshold {
            Ok(DetectionResult::from_detections(vec![Detection::new(
                0,
                0,
                frame.width(),
                frame.height(),
                luma / 255.0,
            )]))
        } else {
            Ok(DetectionResult::default())
        }
    }
}

fn mean_luma(frame: &Frame) -> f64 {
    let pixels = frame.width() as usize * frame.height() as usize;
    if pixels == 0 {
        return 0.0;
    }
    let total: f64 = frame
        .image()
        .pixels()
        .map(|p| 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64)
        .sum();
    total / pixels as f64
}
