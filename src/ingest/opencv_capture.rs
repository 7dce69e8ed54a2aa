//! OpenCV `VideoCapture` frame source (files, URLs, capture devices).

use anyhow::{anyhow, Context, Result};
use opencv::{core::Mat, prelude::*, videoio};

use super::{FrameSource, SourceStats};
use crate::cv::mat_to_frame;
use crate::frame::{Frame, SourceInfo};

pub(crate) struct OpencvSource {
    location: String,
    capture: videoio::VideoCapture,
    info: SourceInfo,
    frame_count: u64,
    released: bool,
}

impl OpencvSource {
    pub(crate) fn open_device(index: i32) -> Result<Self> {
        let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)
            .with_context(|| format!("failed to open capture device {}", index))?;
        Self::from_capture(format!("device {}", index), capture)
    }

    pub(crate) fn open_media(location: &str) -> Result<Self> {
        let capture = videoio::VideoCapture::from_file(location, videoio::CAP_ANY)
            .with_context(|| format!("failed to open '{}' with opencv", location))?;
        Self::from_capture(location.to_string(), capture)
    }

    fn from_capture(location: String, capture: videoio::VideoCapture) -> Result<Self> {
        if !capture.is_opened()? {
            return Err(anyhow!("opencv could not open {}", location));
        }
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)?;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)?;
        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let info = SourceInfo::new(width as u32, height as u32, fps.max(0.0));
        log::info!("OpencvSource: opened {}", location);
        Ok(Self {
            location,
            capture,
            info,
            frame_count: 0,
            released: false,
        })
    }
}

impl FrameSource for OpencvSource {
    fn describe(&self) -> String {
        self.location.clone()
    }

    fn info(&self) -> SourceInfo {
        self.info
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        if self.released {
            anyhow::bail!("opencv source {} already released", self.location);
        }
        let mut mat = Mat::default();
        // OpenCV reports end of stream and device errors the same way.
        if !self.capture.read(&mut mat)? || mat.empty() {
            return Ok(None);
        }
        let frame = mat_to_frame(&mat, self.frame_count)?;
        self.frame_count += 1;
        Ok(Some(frame))
    }

    fn release(&mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            self.capture
                .release()
                .with_context(|| format!("release capture {}", self.location))?;
        }
        Ok(())
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frame_count,
            source: self.location.clone(),
        }
    }
}
