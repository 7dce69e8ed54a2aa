use anyhow::{bail, Result};
use image::{imageops, Rgb};
use imageproc::edges::canny;
use imageproc::filter::separable_filter_equal;

use super::{Transform, Transformed};
use crate::frame::Frame;

/// Parameters of the grayscale → blur → Canny → mask pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct CannyParams {
    /// Gaussian kernel size (odd).
    pub blur_kernel: u32,
    pub low_threshold: f32,
    pub high_threshold: f32,
    /// Sobel aperture. The built-in Canny uses a 3x3 operator.
    pub aperture: u32,
}

impl Default for CannyParams {
    fn default() -> Self {
        Self {
            blur_kernel: 3,
            low_threshold: 100.0,
            high_threshold: 200.0,
            aperture: 3,
        }
    }
}

impl CannyParams {
    pub fn validate(&self) -> Result<()> {
        if self.blur_kernel == 0 || self.blur_kernel % 2 == 0 {
            bail!("blur kernel must be odd, got {}", self.blur_kernel);
        }
        if self.aperture != 3 {
            bail!(
                "Canny aperture {} is not supported; only 3 is available",
                self.aperture
            );
        }
        if !(self.low_threshold >= 0.0 && self.low_threshold <= self.high_threshold) {
            bail!(
                "Canny thresholds must satisfy 0 <= low <= high, got {} / {}",
                self.low_threshold,
                self.high_threshold
            );
        }
        Ok(())
    }
}

/// Sigma OpenCV derives for a Gaussian kernel of `ksize` when none is given.
pub fn gaussian_sigma(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// One-dimensional Gaussian kernel with exactly `ksize` taps, summing to 1.
///
/// Sizes up to 7 use OpenCV's fixed binomial tables; larger sizes sample a
/// Gaussian with [`gaussian_sigma`].
pub fn gaussian_kernel(ksize: u32) -> Vec<f32> {
    match ksize {
        1 => vec![1.0],
        3 => vec![0.25, 0.5, 0.25],
        5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => vec![
            0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125,
        ],
        _ => {
            let sigma = gaussian_sigma(ksize);
            let center = (ksize as f32 - 1.0) * 0.5;
            let weights: Vec<f32> = (0..ksize)
                .map(|i| {
                    let d = i as f32 - center;
                    (-(d * d) / (2.0 * sigma * sigma)).exp()
                })
                .collect();
            let sum: f32 = weights.iter().sum();
            weights.into_iter().map(|w| w / sum).collect()
        }
    }
}

/// Keeps the original color only where Canny finds an edge.
pub struct EdgeMask {
    params: CannyParams,
    kernel: Vec<f32>,
}

impl EdgeMask {
    pub fn new(params: CannyParams) -> Result<Self> {
        params.validate()?;
        let kernel = gaussian_kernel(params.blur_kernel);
        Ok(Self { params, kernel })
    }
}

impl Transform for EdgeMask {
    fn name(&self) -> &'static str {
        "edges"
    }

    fn apply(&mut self, frame: Frame) -> Result<Transformed> {
        let gray = imageops::grayscale(frame.image());
        let blurred = if self.kernel.len() > 1 {
            separable_filter_equal(&gray, &self.kernel)
        } else {
            gray
        };
        let edges = canny(
            &blurred,
            self.params.low_threshold,
            self.params.high_threshold,
        );

        let mut masked = frame.image().clone();
        for (pixel, edge) in masked.pixels_mut().zip(edges.pixels()) {
            if edge[0] == 0 {
                *pixel = Rgb([0, 0, 0]);
            }
        }
        Ok(Transformed::frame(frame.with_image(masked)))
    }
}
