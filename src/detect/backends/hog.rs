use anyhow::{bail, Context, Result};
use opencv::{
    core::{Rect, Size, Vector},
    objdetect::HOGDescriptor,
    prelude::*,
};

use crate::cv::frame_to_mat;
use crate::detect::backend::{DetectionCapability, DetectorBackend};
use crate::detect::result::{Detection, DetectionResult};
use crate::frame::Frame;

/// Multi-scale sliding-window parameters for the people detector.
#[derive(Clone, Debug, PartialEq)]
pub struct HogParams {
    pub win_stride: (u32, u32),
    pub padding: (u32, u32),
    /// Pyramid scale step between detection passes.
    pub scale: f64,
    pub hit_threshold: f64,
    pub group_threshold: f64,
}

impl Default for HogParams {
    fn default() -> Self {
        Self {
            win_stride: (8, 8),
            padding: (32, 32),
            scale: 1.05,
            hit_threshold: 0.0,
            group_threshold: 2.0,
        }
    }
}

impl HogParams {
    pub fn validate(&self) -> Result<()> {
        if self.win_stride.0 == 0 || self.win_stride.1 == 0 {
            bail!("HOG window stride must be non-zero");
        }
        if self.scale.is_nan() || self.scale <= 1.0 {
            bail!("HOG scale must be greater than 1.0, got {}", self.scale);
        }
        Ok(())
    }
}

/// OpenCV HOG descriptor with the default people SVM.
pub struct HogBackend {
    params: HogParams,
    hog: HOGDescriptor,
}

impl HogBackend {
    pub fn new(params: HogParams) -> Result<Self> {
        params.validate()?;
        let mut hog = HOGDescriptor::default().context("create HOG descriptor")?;
        let people = HOGDescriptor::get_default_people_detector()
            .context("load default people detector")?;
        hog.set_svm_detector(&people)
            .context("install people SVM")?;
        Ok(Self { params, hog })
    }
}

impl DetectorBackend for HogBackend {
    fn name(&self) -> &'static str {
        "hog"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(capability, DetectionCapability::Pedestrian)
    }

    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult> {
        let mat = frame_to_mat(frame)?;
        let mut found = Vector::<Rect>::new();
        let mut weights = Vector::<f64>::new();
        let p = &self.params;
        self.hog
            .detect_multi_scale_weights(
                &mat,
                &mut found,
                &mut weights,
                p.hit_threshold,
                Size::new(p.win_stride.0 as i32, p.win_stride.1 as i32),
                Size::new(p.padding.0 as i32, p.padding.1 as i32),
                p.scale,
                p.group_threshold,
                false,
            )
            .context("HOG detectMultiScale")?;

        let detections = found
            .iter()
            .enumerate()
            .map(|(i, rect)| {
                let weight = weights.get(i).unwrap_or(0.0);
                Detection::new(
                    rect.x,
                    rect.y,
                    rect.width.max(0) as u32,
                    rect.height.max(0) as u32,
                    weight,
                )
            })
            .collect();
        Ok(DetectionResult::from_detections(detections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registrable<B: DetectorBackend + 'static>() {}

    #[test]
    fn backend_is_registrable_without_extra_bounds() {
        registrable::<HogBackend>();
    }

    #[test]
    fn rejects_degenerate_parameters() {
        assert!(HogParams::default().validate().is_ok());
        let flat = HogParams {
            scale: 1.0,
            ..HogParams::default()
        };
        assert!(flat.validate().is_err());
        let still = HogParams {
            win_stride: (0, 8),
            ..HogParams::default()
        };
        assert!(still.validate().is_err());
    }
}
