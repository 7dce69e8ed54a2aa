use anyhow::Result;

use crate::detect::result::DetectionResult;
use crate::frame::Frame;

/// Detection capabilities supported by backends.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionCapability {
    /// Upright people (HOG + linear SVM style detectors).
    Pedestrian,
    /// Changed regions against a running background.
    Motion,
}

impl DetectionCapability {
    /// Plural noun used in run summaries ("frames with people").
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Pedestrian => "people",
            Self::Motion => "motion",
        }
    }
}

/// Detector backend trait.
///
/// Backends see each frame exactly once, in stream order, and may keep
/// state between calls (a background model, for instance). They must not
/// hold on to the frame itself.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Returns true when the backend supports a capability.
    fn supports(&self, capability: DetectionCapability) -> bool;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
