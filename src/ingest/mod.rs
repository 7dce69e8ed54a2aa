//! Frame sources.
//!
//! This module provides the sources a pump can read from:
//! - Synthetic `stub://` streams (testing, dry runs)
//! - Image-sequence directories (pure Rust decode)
//! - Local files and network URLs (feature: backend-opencv or ingest-ffmpeg)
//! - Capture devices by index (feature: backend-opencv)
//!
//! Every source reports its `SourceInfo` once, at open time, and yields frames
//! until `read` returns `Ok(None)`. Sources are released exactly once, either
//! explicitly through `release` or when dropped.

#[cfg(feature = "ingest-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub mod image_sequence;
#[cfg(feature = "backend-opencv")]
pub(crate) mod opencv_capture;
pub mod synthetic;

use anyhow::{anyhow, bail, Result};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::frame::{Frame, SourceInfo};

pub use image_sequence::ImageSequenceSource;
pub use synthetic::{SyntheticConfig, SyntheticPattern, SyntheticSource};

/// Fallback rate for image sequences without a manifest.
pub const DEFAULT_SEQUENCE_FPS: f64 = 25.0;

/// A readable stream of sequential frames.
pub trait FrameSource {
    /// Human-readable identifier (path, URL, device).
    fn describe(&self) -> String;

    /// Dimensions and rate captured when the source was opened.
    fn info(&self) -> SourceInfo;

    /// Read the next frame.
    ///
    /// `Ok(None)` means the stream is exhausted. `Err` means the read failed;
    /// callers decide whether that differs from exhaustion.
    fn read(&mut self) -> Result<Option<Frame>>;

    /// Release the underlying handle. Must be safe to call more than once.
    fn release(&mut self) -> Result<()> {
        Ok(())
    }

    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_read: u64,
    pub source: String,
}

// ----------------------------------------------------------------------------
// Source identifiers
// ----------------------------------------------------------------------------

/// Parsed form of the positional `SOURCE` argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceSpec {
    /// Capture device index, e.g. `0`.
    Device(i32),
    /// `stub://` synthetic stream.
    Synthetic(String),
    /// Directory of numbered image files.
    ImageSequence(PathBuf),
    /// Network stream (`rtsp://`, `http://`, ...).
    Url(String),
    /// Local video file.
    File(PathBuf),
}

impl SourceSpec {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            bail!("source must not be empty");
        }
        if device_index_re().is_match(raw) {
            let index: i32 = raw
                .parse()
                .map_err(|e| anyhow!("invalid device index {}: {}", raw, e))?;
            return Ok(Self::Device(index));
        }
        if raw.starts_with("stub://") {
            return Ok(Self::Synthetic(raw.to_string()));
        }
        if Path::new(raw).is_dir() {
            return Ok(Self::ImageSequence(PathBuf::from(raw)));
        }
        if raw.contains("://") {
            return Ok(Self::Url(raw.to_string()));
        }
        Ok(Self::File(PathBuf::from(raw)))
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(index) => write!(f, "device {}", index),
            Self::Synthetic(url) | Self::Url(url) => f.write_str(url),
            Self::ImageSequence(path) | Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

fn device_index_re() -> &'static Regex {
    static DEVICE_INDEX_RE: OnceLock<Regex> = OnceLock::new();
    DEVICE_INDEX_RE.get_or_init(|| Regex::new(r"^[-+]?\d+$").unwrap())
}

// ----------------------------------------------------------------------------
// Factory
// ----------------------------------------------------------------------------

/// Options that apply when opening a source.
#[derive(Clone, Debug)]
pub struct IngestOptions {
    /// Rate assumed for image sequences that carry no manifest.
    pub sequence_fps: f64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            sequence_fps: DEFAULT_SEQUENCE_FPS,
        }
    }
}

/// Open the source named by `spec`. Failure to open is an error.
pub fn open_source(spec: &SourceSpec, options: &IngestOptions) -> Result<Box<dyn FrameSource>> {
    match spec {
        SourceSpec::Synthetic(url) => Ok(Box::new(SyntheticSource::new(
            SyntheticConfig::from_url(url)?,
        ))),
        SourceSpec::ImageSequence(dir) => Ok(Box::new(ImageSequenceSource::open(
            dir,
            options.sequence_fps,
        )?)),
        SourceSpec::Device(index) => open_device(*index),
        SourceSpec::Url(url) => open_media(url),
        SourceSpec::File(path) => {
            if !path.exists() {
                bail!("input file {} does not exist", path.display());
            }
            open_media(&path.to_string_lossy())
        }
    }
}

#[cfg(feature = "backend-opencv")]
fn open_device(index: i32) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(opencv_capture::OpencvSource::open_device(index)?))
}

#[cfg(not(feature = "backend-opencv"))]
fn open_device(index: i32) -> Result<Box<dyn FrameSource>> {
    bail!(
        "capture device {} requires the backend-opencv feature",
        index
    )
}

#[allow(unreachable_code)]
fn open_media(location: &str) -> Result<Box<dyn FrameSource>> {
    #[cfg(feature = "backend-opencv")]
    {
        return Ok(Box::new(opencv_capture::OpencvSource::open_media(location)?));
    }
    #[cfg(feature = "ingest-ffmpeg")]
    {
        return Ok(Box::new(file_ffmpeg::FfmpegFileSource::open(location)?));
    }
    Err(anyhow!(
        "decoding {} requires the backend-opencv or ingest-ffmpeg feature",
        location
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_indices() {
        assert_eq!(SourceSpec::parse("0").unwrap(), SourceSpec::Device(0));
        assert_eq!(SourceSpec::parse("-1").unwrap(), SourceSpec::Device(-1));
        assert_eq!(SourceSpec::parse("+2").unwrap(), SourceSpec::Device(2));
    }

    #[test]
    fn parses_urls_files_and_stubs() {
        assert_eq!(
            SourceSpec::parse("rtsp://camera/stream").unwrap(),
            SourceSpec::Url("rtsp://camera/stream".to_string())
        );
        assert_eq!(
            SourceSpec::parse("stub://uniform?frames=3").unwrap(),
            SourceSpec::Synthetic("stub://uniform?frames=3".to_string())
        );
        assert_eq!(
            SourceSpec::parse("resources/traffic.mp4").unwrap(),
            SourceSpec::File(PathBuf::from("resources/traffic.mp4"))
        );
        assert!(SourceSpec::parse("   ").is_err());
    }

    #[test]
    fn parses_existing_directory_as_image_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().to_string_lossy().to_string();
        assert_eq!(
            SourceSpec::parse(&raw).unwrap(),
            SourceSpec::ImageSequence(dir.path().to_path_buf())
        );
    }

    #[test]
    fn missing_file_fails_to_open() {
        let spec = SourceSpec::File(PathBuf::from("does/not/exist.mp4"));
        assert!(open_source(&spec, &IngestOptions::default()).is_err());
    }

    #[test]
    fn opens_synthetic_source() {
        let spec = SourceSpec::parse("stub://uniform?frames=2&width=8&height=4").unwrap();
        let mut source = open_source(&spec, &IngestOptions::default()).unwrap();
        assert_eq!(source.info().width, 8);
        assert!(source.read().unwrap().is_some());
        assert!(source.read().unwrap().is_some());
        assert!(source.read().unwrap().is_none());
    }
}
