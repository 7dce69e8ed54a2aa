use anyhow::{bail, Result};
use image::{imageops, GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::filter::box_filter;
use imageproc::morphology::{dilate, erode};

use crate::detect::backend::{DetectionCapability, DetectorBackend};
use crate::detect::result::{Detection, DetectionResult};
use crate::frame::Frame;

/// Tuning for the moving-average motion detector.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionParams {
    /// Box blur radius applied before differencing (4 = 9x9 window).
    pub blur_radius: u32,
    /// Weight of the newest frame in the running average.
    pub alpha: f32,
    /// Per-pixel difference above which a pixel counts as changed.
    pub threshold: u8,
    /// Percent of changed pixels that marks a frame as containing motion.
    pub trigger_percent: f64,
    /// Percent of changed pixels above which the background is rebuilt
    /// (camera adjusting exposure or moving).
    pub reset_percent: f64,
    /// Dilate radius used to merge nearby changed pixels into regions.
    pub dilate: u8,
    /// Erode radius applied after dilation.
    pub erode: u8,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            blur_radius: 4,
            alpha: 0.03,
            threshold: 25,
            trigger_percent: 0.75,
            reset_percent: 25.0,
            dilate: 15,
            erode: 10,
        }
    }
}

impl MotionParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            bail!("motion alpha must be in (0, 1], got {}", self.alpha);
        }
        if !(0.0..=100.0).contains(&self.trigger_percent)
            || !(0.0..=100.0).contains(&self.reset_percent)
        {
            bail!("motion percentages must be within 0..=100");
        }
        if self.trigger_percent >= self.reset_percent {
            bail!(
                "motion trigger ({}) must be below reset ({})",
                self.trigger_percent,
                self.reset_percent
            );
        }
        Ok(())
    }
}

/// Motion detector over a running background average.
pub struct MotionBackend {
    params: MotionParams,
    average: Option<Vec<f32>>,
    size: (u32, u32),
}

impl MotionBackend {
    pub fn new(params: MotionParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            average: None,
            size: (0, 0),
        })
    }

    fn reset_average(&mut self, work: &GrayImage) {
        self.average = Some(work.as_raw().iter().map(|&v| v as f32).collect());
        self.size = work.dimensions();
    }

    fn regions(&self, mask: &GrayImage) -> Vec<Detection> {
        let grown = dilate(mask, Norm::LInf, self.params.dilate);
        let merged = erode(&grown, Norm::LInf, self.params.erode);
        let regions: Vec<Detection> = find_contours::<u32>(&merged)
            .into_iter()
            .filter(|contour| matches!(contour.border_type, BorderType::Outer))
            .filter_map(|contour| {
                let min_x = contour.points.iter().map(|p| p.x).min()?;
                let max_x = contour.points.iter().map(|p| p.x).max()?;
                let min_y = contour.points.iter().map(|p| p.y).min()?;
                let max_y = contour.points.iter().map(|p| p.y).max()?;
                Some(Detection::new(
                    min_x as i32,
                    min_y as i32,
                    max_x - min_x + 1,
                    max_y - min_y + 1,
                    1.0,
                ))
            })
            .collect();
        if regions.is_empty() {
            // A mask that fills the whole frame has no traceable border.
            return changed_bounds(mask).into_iter().collect();
        }
        regions
    }
}

fn changed_bounds(mask: &GrayImage) -> Option<Detection> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel[0] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds.map(|(x0, y0, x1, y1)| {
        Detection::new(x0 as i32, y0 as i32, x1 - x0 + 1, y1 - y0 + 1, 1.0)
    })
}

impl DetectorBackend for MotionBackend {
    fn name(&self) -> &'static str {
        "motion"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(capability, DetectionCapability::Motion)
    }

    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult> {
        let gray = imageops::grayscale(frame.image());
        let radius = self.params.blur_radius;
        let work = box_filter(&gray, radius, radius);

        if self.average.is_none() || self.size != work.dimensions() {
            self.reset_average(&work);
        }

        let alpha = self.params.alpha;
        let threshold = self.params.threshold as f32;
        let (width, height) = work.dimensions();
        let mut mask = GrayImage::new(width, height);
        let mut changed: u64 = 0;
        if let Some(average) = self.average.as_mut() {
            for ((avg, &value), out) in average
                .iter_mut()
                .zip(work.as_raw().iter())
                .zip(mask.pixels_mut())
            {
                *avg = (1.0 - alpha) * *avg + alpha * value as f32;
                if (value as f32 - avg.round()).abs() > threshold {
                    *out = Luma([255]);
                    changed += 1;
                }
            }
        }

        let total = width as u64 * height as u64;
        let percent = if total == 0 {
            0.0
        } else {
            100.0 * changed as f64 / total as f64
        };
        if percent > self.params.reset_percent {
            log::debug!("motion: {:.2}% changed, rebuilding background", percent);
            self.reset_average(&work);
        }

        let detections = if percent > self.params.trigger_percent {
            self.regions(&mask)
        } else {
            Vec::new()
        };
        Ok(DetectionResult {
            detections,
            motion_percent: Some(percent),
        })
    }
}
