//! Image-sequence directory source.
//!
//! Reads every `png`, `jpg`, `jpeg` or `bmp` file in a directory in file-name
//! order. Frame size is fixed by the first image. When a `sequence.json`
//! manifest written by the image-sequence sink is present, it supplies the
//! rate and caps the frame count; otherwise the configured fallback rate is
//! used.

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};

use super::{FrameSource, SourceStats};
use crate::frame::{Frame, SourceInfo};
use crate::sink::image_sequence::{SequenceManifest, MANIFEST_FILE};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

pub struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    info: SourceInfo,
    next: usize,
    released: bool,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path, fallback_fps: f64) -> Result<Self> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("failed to list image sequence {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && is_image_file(&path) {
                files.push(path);
            }
        }
        files.sort();

        let fps = match read_manifest(dir)? {
            Some(manifest) => {
                if manifest.fps.is_nan() || manifest.fps <= 0.0 {
                    bail!(
                        "manifest in {} has invalid fps {}",
                        dir.display(),
                        manifest.fps
                    );
                }
                let frames = usize::try_from(manifest.frames).unwrap_or(usize::MAX);
                if files.len() > frames {
                    log::debug!(
                        "ImageSequenceSource: {} images, manifest lists {}",
                        files.len(),
                        frames
                    );
                    files.truncate(frames);
                }
                manifest.fps
            }
            None => fallback_fps,
        };
        let (width, height) = match files.first() {
            Some(first) => image::image_dimensions(first)
                .with_context(|| format!("failed to read {}", first.display()))?,
            None => (0, 0),
        };

        log::info!(
            "ImageSequenceSource: opened {} ({} images)",
            dir.display(),
            files.len()
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            info: SourceInfo::new(width, height, fps),
            next: 0,
            released: false,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn info(&self) -> SourceInfo {
        self.info
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        if self.released {
            bail!("image sequence {} already released", self.dir.display());
        }
        let Some(path) = self.files.get(self.next) else {
            return Ok(None);
        };
        let image = image::open(path)
            .with_context(|| format!("failed to decode {}", path.display()))?
            .to_rgb8();
        if image.width() != self.info.width || image.height() != self.info.height {
            return Err(anyhow!(
                "{} is {}x{}, sequence is {}x{}",
                path.display(),
                image.width(),
                image.height(),
                self.info.width,
                self.info.height
            ));
        }
        let frame = Frame::new(image, self.next as u64);
        self.next += 1;
        Ok(Some(frame))
    }

    fn release(&mut self) -> Result<()> {
        self.released = true;
        Ok(())
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.next as u64,
            source: self.describe(),
        }
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn read_manifest(dir: &Path) -> Result<Option<SequenceManifest>> {
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)
        .map_err(|e| anyhow!("failed to read manifest {}: {}", path.display(), e))?;
    let manifest = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid manifest {}: {}", path.display(), e))?;
    Ok(Some(manifest))
}
