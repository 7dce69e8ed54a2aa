//! On-screen display sink (OpenCV highgui).

use anyhow::{anyhow, Context, Result};
use opencv::highgui;

use super::{FrameSink, SinkFlow};
use crate::cv::frame_to_mat;
use crate::frame::Frame;

pub(crate) struct OpencvDisplay {
    title: String,
    exit_key: i32,
    frames_written: u64,
    released: bool,
}

impl OpencvDisplay {
    pub(crate) fn open(title: &str, exit_key: i32) -> Result<Self> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)
            .with_context(|| format!("failed to create window '{}'", title))?;
        log::info!("OpencvDisplay: window '{}' (exit key {})", title, exit_key);
        Ok(Self {
            title: title.to_string(),
            exit_key,
            frames_written: 0,
            released: false,
        })
    }
}

impl FrameSink for OpencvDisplay {
    fn describe(&self) -> String {
        format!("window '{}'", self.title)
    }

    fn write(&mut self, frame: &Frame) -> Result<SinkFlow> {
        if self.released {
            return Err(anyhow!("window '{}' already closed", self.title));
        }
        let mat = frame_to_mat(frame)?;
        highgui::imshow(&self.title, &mat).context("show frame")?;
        self.frames_written += 1;

        // One poll per frame; -1 means no key.
        let key = highgui::wait_key(1).context("poll keyboard")?;
        if key >= 0 && (key & 0xff) == self.exit_key {
            log::debug!("OpencvDisplay: exit key pressed");
            return Ok(SinkFlow::Stop);
        }
        Ok(SinkFlow::Continue)
    }

    fn release(&mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            highgui::destroy_window(&self.title)
                .with_context(|| format!("close window '{}'", self.title))?;
        }
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }
}
