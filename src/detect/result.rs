/// Result of running detection on a frame.
#[derive(Clone, Debug, Default)]
pub struct DetectionResult {
    /// Regions found in this frame, in pixel coordinates.
    pub detections: Vec<Detection>,
    /// Share of changed pixels, for motion backends (0..=100).
    pub motion_percent: Option<f64>,
}

impl DetectionResult {
    pub fn from_detections(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            motion_percent: None,
        }
    }

    /// At least one detection was returned.
    pub fn is_positive(&self) -> bool {
        !self.detections.is_empty()
    }
}

/// Axis-aligned detection box.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Detector score (SVM margin for HOG, 1.0 for motion regions).
    pub weight: f64,
}

impl Detection {
    pub fn new(x: i32, y: i32, width: u32, height: u32, weight: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            weight,
        }
    }
}
