//! videoloop
//!
//! Frame pump for simple video-processing programs: open a source, read
//! frames until the stream ends, apply one per-frame transform, optionally
//! write every frame to a sink, and report what happened.
//!
//! # Module Structure
//!
//! - `frame`: decoded frames and source metadata
//! - `ingest`: frame sources (synthetic, image sequences, OpenCV, FFmpeg)
//! - `sink`: frame sinks (image sequences, video writer, display window)
//! - `transform`: identity, edge mask, detector transforms
//! - `detect`: detector backends and the backend registry
//! - `pump`: the read/transform/write loop and its summary
//! - `config`: file and environment configuration
//! - `cli`, `ui`: shared pieces of the binaries

pub mod cli;
pub mod config;
#[cfg(feature = "backend-opencv")]
mod cv;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod pump;
pub mod sink;
pub mod transform;
pub mod ui;

pub use config::VideoLoopConfig;
pub use detect::{
    BackendRegistry, Detection, DetectionCapability, DetectionResult, DetectorBackend,
};
pub use frame::{Frame, SourceInfo};
pub use ingest::{open_source, FrameSource, IngestOptions, SourceSpec};
pub use pump::{EndReason, FramePump, RunSummary};
pub use sink::{open_display, open_sink, FourCC, FrameSink, SinkFlow, SinkInfo};
pub use transform::{CannyParams, DetectTransform, EdgeMask, Identity, Transform, Transformed};
