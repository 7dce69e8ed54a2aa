//! Frame sinks.
//!
//! A sink receives every frame the pump produces, in order:
//! - Image-sequence directories (pure Rust encode)
//! - Video containers through OpenCV `VideoWriter` (feature: backend-opencv)
//! - An on-screen window with exit-key polling (feature: backend-opencv)
//!
//! Writers are opened with a `SinkInfo` copied from the source, so output
//! dimensions and frame rate always match the input.

pub mod image_sequence;
#[cfg(feature = "backend-opencv")]
pub(crate) mod opencv_display;
#[cfg(feature = "backend-opencv")]
pub(crate) mod opencv_writer;

use anyhow::{anyhow, bail, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::frame::{Frame, SourceInfo};

pub use image_sequence::{ImageSequenceSink, SequenceManifest};

/// Container extensions handled by the video writer.
pub const VIDEO_EXTENSIONS: &[&str] = &["avi", "mp4", "mkv", "mov"];

/// Key code for Esc, the default exit key of the display sink.
pub const ESC_KEY: i32 = 27;

/// What the pump should do after a write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkFlow {
    Continue,
    /// The sink asked the loop to stop (e.g. the exit key was pressed).
    Stop,
}

/// A writable destination for a frame stream.
pub trait FrameSink {
    fn describe(&self) -> String;

    fn write(&mut self, frame: &Frame) -> Result<SinkFlow>;

    /// Flush and close. Must be safe to call more than once.
    fn release(&mut self) -> Result<()> {
        Ok(())
    }

    fn frames_written(&self) -> u64;
}

// ----------------------------------------------------------------------------
// FourCC
// ----------------------------------------------------------------------------

/// Four-character codec tag, e.g. `DIVX`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC([u8; 4]);

impl FourCC {
    pub const DIVX: FourCC = FourCC(*b"DIVX");

    /// Validate a codec tag: exactly four printable ASCII characters.
    pub fn new(code: &str) -> Result<Self> {
        let bytes = code.as_bytes();
        if bytes.len() != 4 {
            bail!("FourCC must be four characters long, got '{}'", code);
        }
        if bytes.iter().any(|b| !(32..=126).contains(b)) {
            bail!("FourCC must be ASCII printable, got '{}'", code.escape_default());
        }
        Ok(Self([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Packed value in the order OpenCV expects (first character lowest).
    pub fn to_i32(self) -> i32 {
        i32::from_le_bytes(self.0)
    }

    pub fn as_str(&self) -> &str {
        // Constructed from printable ASCII only.
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl Default for FourCC {
    fn default() -> Self {
        Self::DIVX
    }
}

impl FromStr for FourCC {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({})", self.as_str())
    }
}

// ----------------------------------------------------------------------------
// Factory
// ----------------------------------------------------------------------------

/// Output parameters copied from the source at open time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SinkInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub fourcc: FourCC,
}

impl SinkInfo {
    pub fn from_source(info: &SourceInfo, fourcc: FourCC) -> Self {
        Self {
            width: info.width,
            height: info.height,
            fps: info.fps,
            fourcc,
        }
    }
}

/// True when `path` names a video container the writer handles.
pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Open an output sink. Video container paths go to the OpenCV writer, any
/// other path is treated as an image-sequence directory.
pub fn open_sink(path: &Path, info: SinkInfo) -> Result<Box<dyn FrameSink>> {
    if is_video_path(path) {
        open_video_writer(path, info)
    } else {
        Ok(Box::new(ImageSequenceSink::create(path, info)?))
    }
}

#[cfg(feature = "backend-opencv")]
fn open_video_writer(path: &Path, info: SinkInfo) -> Result<Box<dyn FrameSink>> {
    Ok(Box::new(opencv_writer::OpencvWriter::open(path, info)?))
}

#[cfg(not(feature = "backend-opencv"))]
fn open_video_writer(path: &Path, _info: SinkInfo) -> Result<Box<dyn FrameSink>> {
    Err(anyhow!(
        "writing {} requires the backend-opencv feature; use a directory path for an image sequence",
        path.display()
    ))
}

/// Open a named display window that stops the loop on `exit_key`.
#[cfg(feature = "backend-opencv")]
pub fn open_display(title: &str, exit_key: i32) -> Result<Box<dyn FrameSink>> {
    Ok(Box::new(opencv_display::OpencvDisplay::open(
        title, exit_key,
    )?))
}

#[cfg(not(feature = "backend-opencv"))]
pub fn open_display(title: &str, _exit_key: i32) -> Result<Box<dyn FrameSink>> {
    Err(anyhow!(
        "display window '{}' requires the backend-opencv feature",
        title
    ))
}
