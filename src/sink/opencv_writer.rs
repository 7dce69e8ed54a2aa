//! OpenCV `VideoWriter` sink.

use anyhow::{anyhow, Context, Result};
use opencv::{core::Size, prelude::*, videoio};
use std::path::Path;

use super::{FrameSink, SinkFlow, SinkInfo};
use crate::cv::frame_to_mat;
use crate::frame::Frame;

pub(crate) struct OpencvWriter {
    path: String,
    writer: videoio::VideoWriter,
    info: SinkInfo,
    frames_written: u64,
    released: bool,
}

impl OpencvWriter {
    pub(crate) fn open(path: &Path, info: SinkInfo) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let location = path.to_string_lossy().to_string();
        let writer = videoio::VideoWriter::new(
            &location,
            info.fourcc.to_i32(),
            info.fps,
            Size::new(info.width as i32, info.height as i32),
            true,
        )
        .with_context(|| format!("failed to create video writer {}", location))?;
        if !writer.is_opened()? {
            return Err(anyhow!(
                "opencv could not open {} with codec {}",
                location,
                info.fourcc
            ));
        }
        log::info!(
            "OpencvWriter: writing {}x{} @ {:.2} fps ({}) to {}",
            info.width,
            info.height,
            info.fps,
            info.fourcc,
            location
        );
        Ok(Self {
            path: location,
            writer,
            info,
            frames_written: 0,
            released: false,
        })
    }
}

impl FrameSink for OpencvWriter {
    fn describe(&self) -> String {
        self.path.clone()
    }

    fn write(&mut self, frame: &Frame) -> Result<SinkFlow> {
        if self.released {
            return Err(anyhow!("video writer {} already released", self.path));
        }
        if frame.width() != self.info.width || frame.height() != self.info.height {
            return Err(anyhow!(
                "frame {} is {}x{}, writer expects {}x{}",
                frame.index(),
                frame.width(),
                frame.height(),
                self.info.width,
                self.info.height
            ));
        }
        let mat = frame_to_mat(frame)?;
        self.writer
            .write(&mat)
            .with_context(|| format!("write frame {} to {}", frame.index(), self.path))?;
        self.frames_written += 1;
        Ok(SinkFlow::Continue)
    }

    fn release(&mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            self.writer
                .release()
                .with_context(|| format!("release video writer {}", self.path))?;
        }
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }
}
