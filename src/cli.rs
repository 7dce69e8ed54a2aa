//! Pieces shared by the binaries: common flags, config resolution, Ctrl-C
//! wiring, and the standard open/run/report sequence.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::VideoLoopConfig;
use crate::detect::{BackendRegistry, DetectionCapability};
use crate::ingest::{open_source, FrameSource, IngestOptions, SourceSpec};
use crate::pump::{FramePump, RunSummary};
use crate::sink::{open_sink, FourCC, FrameSink, SinkInfo};
use crate::transform::DetectTransform;
use crate::ui::{Ui, UiMode};

/// Flags every binary accepts.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Video file, URL, device index, image directory or stub:// stream
    #[arg(value_name = "SOURCE")]
    pub source: Option<String>,

    /// Output video file, or a directory for an image sequence
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Four-character codec tag for the output container
    #[arg(long, value_name = "CODE")]
    pub fourcc: Option<String>,

    /// Stop after this many frames
    #[arg(long, value_name = "N")]
    pub max_frames: Option<u64>,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    pub ui: String,
}

/// Everything a binary needs after flags, file and environment are merged.
#[derive(Debug)]
pub struct Session {
    pub config: VideoLoopConfig,
    pub source: SourceSpec,
    pub output: Option<PathBuf>,
    pub ui: Ui,
}

impl CommonArgs {
    /// Merge flags over the loaded config. Flags win, then config, then
    /// the binary's defaults.
    pub fn resolve(&self, default_source: &str, default_output: Option<&str>) -> Result<Session> {
        let config = VideoLoopConfig::load()?;
        self.resolve_with(config, default_source, default_output)
    }

    pub fn resolve_with(
        &self,
        mut config: VideoLoopConfig,
        default_source: &str,
        default_output: Option<&str>,
    ) -> Result<Session> {
        if let Some(code) = &self.fourcc {
            config.fourcc = FourCC::new(code)?;
        }
        if self.max_frames.is_some() {
            config.max_frames = self.max_frames;
        }
        config.validate()?;

        let raw_source = self
            .source
            .clone()
            .or_else(|| config.source.clone())
            .unwrap_or_else(|| default_source.to_string());
        let source = SourceSpec::parse(&raw_source)?;
        let output = self
            .output
            .clone()
            .or_else(|| config.output.clone())
            .or_else(|| default_output.map(PathBuf::from));
        let ui = Ui::for_stderr(self.ui.parse::<UiMode>()?);

        Ok(Session {
            config,
            source,
            output,
            ui,
        })
    }
}

impl Session {
    pub fn open_source(&self) -> Result<Box<dyn FrameSource>> {
        let _stage = self.ui.stage("Open source");
        let options = IngestOptions {
            sequence_fps: self.config.sequence_fps,
        };
        let source = open_source(&self.source, &options)
            .with_context(|| format!("failed to open {}", self.source))?;
        let info = source.info();
        log::info!("Input: {}", source.describe());
        log::info!(
            "Resolution: {}x{}, {:.2} fps",
            info.width,
            info.height,
            info.fps
        );
        Ok(source)
    }

    /// Open the configured output, sized and timed after `source`.
    pub fn open_output(&self, source: &dyn FrameSource) -> Result<Option<Box<dyn FrameSink>>> {
        let Some(path) = &self.output else {
            return Ok(None);
        };
        let _stage = self.ui.stage("Open output");
        let info = SinkInfo::from_source(&source.info(), self.config.fourcc);
        let sink = open_sink(path, info)
            .with_context(|| format!("failed to open output {}", path.display()))?;
        log::info!("Output: {} ({})", sink.describe(), self.config.fourcc);
        Ok(Some(sink))
    }

    /// Build a detector transform from the built-in backends.
    ///
    /// `name` picks a backend explicitly. Without it, `preferred` is tried
    /// first and any other backend supporting `capability` is the fallback.
    pub fn detector(
        &self,
        name: Option<&str>,
        preferred: &str,
        capability: DetectionCapability,
        annotate: bool,
    ) -> Result<DetectTransform> {
        let _stage = self.ui.stage("Load detector");
        let mut registry = BackendRegistry::from_config(&self.config)?;
        if registry.get(preferred).is_some() {
            registry.set_default(preferred)?;
        } else if name.is_none() {
            log::warn!(
                "backend '{}' is not built in (registered: {}), choosing by capability",
                preferred,
                registry.list().join(", ")
            );
        }
        let backend = registry.resolve(name, capability)?;
        {
            let mut guard = backend
                .lock()
                .map_err(|_| anyhow!("backend lock poisoned"))?;
            guard.warm_up()?;
            log::info!("Detector: {} ({:?})", guard.name(), capability);
        }
        Ok(DetectTransform::new(backend, capability).with_annotation(annotate))
    }

    /// Run with a frame spinner and log the summary.
    pub fn run(&self, pump: FramePump) -> Result<RunSummary> {
        let progress = self.ui.frames("Processing");
        let summary = pump
            .with_max_frames(self.config.max_frames)
            .run_observed(|frames| progress.set(frames))?;
        drop(progress);
        summary.log();
        Ok(summary)
    }
}

/// `env_logger` at `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Flag raised by Ctrl-C; the pump checks it once per frame.
pub fn install_stop_flag() -> Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .context("error setting Ctrl-C handler")?;
    Ok(stop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::transform::Transform;
    use clap::Parser;
    use image::{Rgb, RgbImage};

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        common: CommonArgs,
    }

    fn parse(args: &[&str]) -> CommonArgs {
        TestCli::parse_from(std::iter::once("test").chain(args.iter().copied())).common
    }

    #[test]
    fn flags_override_config_and_defaults() {
        let config = VideoLoopConfig {
            source: Some("stub://blink".to_string()),
            output: Some(PathBuf::from("from-config")),
            ..VideoLoopConfig::default()
        };
        let args = parse(&["stub://gradient", "--fourcc", "MJPG", "--max-frames", "5"]);
        let session = args
            .resolve_with(config, "resources/traffic.mp4", Some("output/writer.avi"))
            .unwrap();
        assert_eq!(
            session.source,
            SourceSpec::Synthetic("stub://gradient".to_string())
        );
        assert_eq!(session.output, Some(PathBuf::from("from-config")));
        assert_eq!(session.config.fourcc.to_string(), "MJPG");
        assert_eq!(session.config.max_frames, Some(5));
    }

    #[test]
    fn binary_defaults_fill_the_gaps() {
        let args = parse(&[]);
        let session = args
            .resolve_with(VideoLoopConfig::default(), "0", None)
            .unwrap();
        assert_eq!(session.source, SourceSpec::Device(0));
        assert_eq!(session.output, None);
    }

    #[test]
    fn invalid_flags_are_rejected() {
        let args = parse(&["--fourcc", "TOOLONG"]);
        assert!(args
            .resolve_with(VideoLoopConfig::default(), "0", None)
            .is_err());
        let args = parse(&["--ui", "fancy"]);
        assert!(args
            .resolve_with(VideoLoopConfig::default(), "0", None)
            .is_err());
    }

    #[test]
    fn detector_prefers_the_binary_backend() {
        let session = parse(&["--ui", "plain"])
            .resolve_with(VideoLoopConfig::default(), "stub://uniform", None)
            .unwrap();
        let mut motion = session
            .detector(None, "motion", DetectionCapability::Motion, false)
            .unwrap();
        let white = Frame::new(RgbImage::from_pixel(16, 16, Rgb([255, 255, 255])), 0);
        let out = motion.apply(white).unwrap();
        // Only the motion backend reports a changed-pixel percentage.
        assert!(out.detection.unwrap().motion_percent.is_some());

        let fallback = session
            .detector(None, "missing", DetectionCapability::Pedestrian, false)
            .unwrap();
        assert_eq!(fallback.subject(), Some("people"));
    }

    #[test]
    fn detector_resolves_named_backend() {
        let session = parse(&["--ui", "plain"])
            .resolve_with(VideoLoopConfig::default(), "stub://uniform", None)
            .unwrap();
        let detector = session
            .detector(Some("stub"), "hog", DetectionCapability::Pedestrian, true)
            .unwrap();
        assert_eq!(detector.subject(), Some("people"));
        assert!(session
            .detector(Some("motion"), "hog", DetectionCapability::Pedestrian, true)
            .is_err());
    }
}
