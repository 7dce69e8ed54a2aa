//! Image-sequence directory sink.
//!
//! Each frame becomes `frame_NNNNNN.png`. On release a `sequence.json`
//! manifest records the geometry and rate copied from the source, which the
//! image-sequence source reads back. Frames and a manifest left by an earlier
//! run in the same directory are removed when the sink is created.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{FrameSink, SinkFlow, SinkInfo};
use crate::frame::Frame;

pub const MANIFEST_FILE: &str = "sequence.json";
const FRAME_PREFIX: &str = "frame_";
const FRAME_EXTENSION: &str = ".png";

/// Written next to the frames on release.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceManifest {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub fourcc: String,
    pub frames: u64,
}

pub struct ImageSequenceSink {
    dir: PathBuf,
    info: SinkInfo,
    frames_written: u64,
    released: bool,
}

impl ImageSequenceSink {
    pub fn create(dir: &Path, info: SinkInfo) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        let stale = remove_previous_output(dir)?;
        if stale > 0 {
            log::warn!(
                "ImageSequenceSink: removed {} files of an earlier sequence in {}",
                stale,
                dir.display()
            );
        }
        log::info!(
            "ImageSequenceSink: writing {}x{} @ {:.2} fps to {}",
            info.width,
            info.height,
            info.fps,
            dir.display()
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            info,
            frames_written: 0,
            released: false,
        })
    }

    pub fn frame_path(&self, n: u64) -> PathBuf {
        self.dir
            .join(format!("{}{:06}{}", FRAME_PREFIX, n, FRAME_EXTENSION))
    }

    fn write_manifest(&self) -> Result<()> {
        let manifest = SequenceManifest {
            width: self.info.width,
            height: self.info.height,
            fps: self.info.fps,
            fourcc: self.info.fourcc.to_string(),
            frames: self.frames_written,
        };
        let path = self.dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(&path, json)
            .with_context(|| format!("writing manifest to {}", path.display()))
    }
}

impl FrameSink for ImageSequenceSink {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn write(&mut self, frame: &Frame) -> Result<SinkFlow> {
        if self.released {
            return Err(anyhow!("image sequence {} already released", self.dir.display()));
        }
        if frame.width() != self.info.width || frame.height() != self.info.height {
            return Err(anyhow!(
                "frame {} is {}x{}, sink expects {}x{}",
                frame.index(),
                frame.width(),
                frame.height(),
                self.info.width,
                self.info.height
            ));
        }
        let path = self.frame_path(self.frames_written);
        frame
            .image()
            .save(&path)
            .with_context(|| format!("writing frame to {}", path.display()))?;
        self.frames_written += 1;
        Ok(SinkFlow::Continue)
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.write_manifest()
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

fn is_sequence_file(name: &str) -> bool {
    name == MANIFEST_FILE
        || (name.starts_with(FRAME_PREFIX) && name.ends_with(FRAME_EXTENSION))
}

/// Delete frames and the manifest a previous sink left in `dir`. Other files
/// are kept.
fn remove_previous_output(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to list output directory {}", dir.display()))?
    {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if path.is_file() && is_sequence_file(name) {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::FourCC;
    use image::RgbImage;

    fn info(width: u32, height: u32) -> SinkInfo {
        SinkInfo {
            width,
            height,
            fps: 15.0,
            fourcc: FourCC::DIVX,
        }
    }

    #[test]
    fn writes_frames_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("frames");
        let mut sink = ImageSequenceSink::create(&out, info(4, 3)).unwrap();
        for i in 0..3 {
            let flow = sink.write(&Frame::new(RgbImage::new(4, 3), i)).unwrap();
            assert_eq!(flow, SinkFlow::Continue);
        }
        sink.release().unwrap();
        sink.release().unwrap();

        assert!(out.join("frame_000002.png").exists());
        let raw = std::fs::read_to_string(out.join(MANIFEST_FILE)).unwrap();
        let manifest: SequenceManifest = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            manifest,
            SequenceManifest {
                width: 4,
                height: 3,
                fps: 15.0,
                fourcc: "DIVX".to_string(),
                frames: 3,
            }
        );
    }

    #[test]
    fn create_clears_an_earlier_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = ImageSequenceSink::create(dir.path(), info(4, 3)).unwrap();
        for i in 0..5 {
            first.write(&Frame::new(RgbImage::new(4, 3), i)).unwrap();
        }
        first.release().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "kept").unwrap();

        let mut second = ImageSequenceSink::create(dir.path(), info(4, 3)).unwrap();
        assert!(!dir.path().join(MANIFEST_FILE).exists());
        for i in 0..2 {
            second.write(&Frame::new(RgbImage::new(4, 3), i)).unwrap();
        }
        second.release().unwrap();

        assert!(dir.path().join("frame_000001.png").exists());
        assert!(!dir.path().join("frame_000002.png").exists());
        assert!(!dir.path().join("frame_000004.png").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn rejects_frames_of_the_wrong_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageSequenceSink::create(dir.path(), info(4, 3)).unwrap();
        assert!(sink.write(&Frame::new(RgbImage::new(3, 4), 0)).is_err());
        assert_eq!(sink.frames_written(), 0);
    }
}
