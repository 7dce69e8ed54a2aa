use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use super::{Transform, Transformed};
use crate::detect::{DetectionCapability, DetectionResult, SharedBackend};
use crate::frame::Frame;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: i32 = 2;

/// Runs a detector backend on every frame and optionally draws its boxes.
pub struct DetectTransform {
    backend: SharedBackend,
    capability: DetectionCapability,
    annotate: bool,
}

impl DetectTransform {
    pub fn new(backend: SharedBackend, capability: DetectionCapability) -> Self {
        Self {
            backend,
            capability,
            annotate: true,
        }
    }

    pub fn with_annotation(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }
}

impl Transform for DetectTransform {
    fn name(&self) -> &'static str {
        "detect"
    }

    fn apply(&mut self, mut frame: Frame) -> Result<Transformed> {
        let result = {
            let mut backend = self
                .backend
                .lock()
                .map_err(|_| anyhow!("backend lock poisoned"))?;
            backend.detect(&frame)?
        };
        if self.annotate {
            draw_detections(frame.image_mut(), &result);
        }
        Ok(Transformed {
            frame,
            detection: Some(result),
        })
    }

    fn subject(&self) -> Option<&'static str> {
        Some(self.capability.subject())
    }
}

/// Draw a rectangle around every detection, clipped to the image.
pub(crate) fn draw_detections(image: &mut RgbImage, result: &DetectionResult) {
    for detection in &result.detections {
        for inset in 0..BOX_THICKNESS {
            let width = detection.width as i32 - 2 * inset;
            let height = detection.height as i32 - 2 * inset;
            if width <= 0 || height <= 0 {
                break;
            }
            let rect = Rect::at(detection.x + inset, detection.y + inset)
                .of_size(width as u32, height as u32);
            draw_hollow_rect_mut(image, rect, BOX_COLOR);
        }
    }
}
