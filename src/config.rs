use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[cfg(feature = "backend-opencv")]
use crate::detect::HogParams;
use crate::detect::MotionParams;
use crate::ingest::DEFAULT_SEQUENCE_FPS;
use crate::sink::{FourCC, ESC_KEY};
use crate::transform::CannyParams;

pub const CONFIG_ENV: &str = "VIDEOLOOP_CONFIG";
const DEFAULT_WINDOW_TITLE: &str = "videoloop";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct VideoLoopConfigFile {
    source: Option<String>,
    output: Option<PathBuf>,
    fourcc: Option<String>,
    window_title: Option<String>,
    exit_key: Option<i32>,
    max_frames: Option<u64>,
    sequence_fps: Option<f64>,
    canny: Option<CannyConfigFile>,
    motion: Option<MotionConfigFile>,
    hog: Option<HogConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CannyConfigFile {
    blur_kernel: Option<u32>,
    low_threshold: Option<f32>,
    high_threshold: Option<f32>,
    aperture: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct MotionConfigFile {
    blur_radius: Option<u32>,
    alpha: Option<f32>,
    threshold: Option<u8>,
    trigger_percent: Option<f64>,
    reset_percent: Option<f64>,
    dilate: Option<u8>,
    erode: Option<u8>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
#[cfg_attr(not(feature = "backend-opencv"), allow(dead_code))]
struct HogConfigFile {
    win_stride: Option<[u32; 2]>,
    padding: Option<[u32; 2]>,
    scale: Option<f64>,
    hit_threshold: Option<f64>,
    group_threshold: Option<f64>,
}

/// Settings shared by every binary. Values not set anywhere fall back to
/// the binary's own defaults (source, output) or the documented constants.
#[derive(Debug, Clone)]
pub struct VideoLoopConfig {
    pub source: Option<String>,
    pub output: Option<PathBuf>,
    pub fourcc: FourCC,
    pub window_title: String,
    pub exit_key: i32,
    pub max_frames: Option<u64>,
    pub sequence_fps: f64,
    pub canny: CannyParams,
    pub motion: MotionParams,
    #[cfg(feature = "backend-opencv")]
    pub hog: HogParams,
}

impl Default for VideoLoopConfig {
    fn default() -> Self {
        Self {
            source: None,
            output: None,
            fourcc: FourCC::DIVX,
            window_title: DEFAULT_WINDOW_TITLE.to_string(),
            exit_key: ESC_KEY,
            max_frames: None,
            sequence_fps: DEFAULT_SEQUENCE_FPS,
            canny: CannyParams::default(),
            motion: MotionParams::default(),
            #[cfg(feature = "backend-opencv")]
            hog: HogParams::default(),
        }
    }
}

impl VideoLoopConfig {
    /// File named by `VIDEOLOOP_CONFIG` (if any), then environment, then checks.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var(CONFIG_ENV).ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: VideoLoopConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let fourcc = match file.fourcc.as_deref() {
            Some(code) => FourCC::new(code)?,
            None => defaults.fourcc,
        };

        let canny = {
            let base = CannyParams::default();
            let file = file.canny.unwrap_or_default();
            CannyParams {
                blur_kernel: file.blur_kernel.unwrap_or(base.blur_kernel),
                low_threshold: file.low_threshold.unwrap_or(base.low_threshold),
                high_threshold: file.high_threshold.unwrap_or(base.high_threshold),
                aperture: file.aperture.unwrap_or(base.aperture),
            }
        };

        let motion = {
            let base = MotionParams::default();
            let file = file.motion.unwrap_or_default();
            MotionParams {
                blur_radius: file.blur_radius.unwrap_or(base.blur_radius),
                alpha: file.alpha.unwrap_or(base.alpha),
                threshold: file.threshold.unwrap_or(base.threshold),
                trigger_percent: file.trigger_percent.unwrap_or(base.trigger_percent),
                reset_percent: file.reset_percent.unwrap_or(base.reset_percent),
                dilate: file.dilate.unwrap_or(base.dilate),
                erode: file.erode.unwrap_or(base.erode),
            }
        };

        #[cfg(feature = "backend-opencv")]
        let hog = {
            let base = HogParams::default();
            let file = file.hog.unwrap_or_default();
            HogParams {
                win_stride: file
                    .win_stride
                    .map(|[x, y]| (x, y))
                    .unwrap_or(base.win_stride),
                padding: file.padding.map(|[x, y]| (x, y)).unwrap_or(base.padding),
                scale: file.scale.unwrap_or(base.scale),
                hit_threshold: file.hit_threshold.unwrap_or(base.hit_threshold),
                group_threshold: file.group_threshold.unwrap_or(base.group_threshold),
            }
        };
        #[cfg(not(feature = "backend-opencv"))]
        if file.hog.is_some() {
            log::warn!("hog settings ignored: built without backend-opencv");
        }

        Ok(Self {
            source: file.source,
            output: file.output,
            fourcc,
            window_title: file.window_title.unwrap_or(defaults.window_title),
            exit_key: file.exit_key.unwrap_or(defaults.exit_key),
            max_frames: file.max_frames,
            sequence_fps: file.sequence_fps.unwrap_or(defaults.sequence_fps),
            canny,
            motion,
            #[cfg(feature = "backend-opencv")]
            hog,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("VIDEOLOOP_SOURCE") {
            if !source.trim().is_empty() {
                self.source = Some(source);
            }
        }
        if let Ok(output) = std::env::var("VIDEOLOOP_OUTPUT") {
            if !output.trim().is_empty() {
                self.output = Some(PathBuf::from(output));
            }
        }
        if let Ok(code) = std::env::var("VIDEOLOOP_FOURCC") {
            self.fourcc = FourCC::new(&code)
                .map_err(|e| anyhow!("VIDEOLOOP_FOURCC is invalid: {}", e))?;
        }
        if let Ok(limit) = std::env::var("VIDEOLOOP_MAX_FRAMES") {
            let limit: u64 = limit
                .trim()
                .parse()
                .map_err(|_| anyhow!("VIDEOLOOP_MAX_FRAMES must be an integer frame count"))?;
            self.max_frames = Some(limit);
        }
        if let Ok(key) = std::env::var("VIDEOLOOP_EXIT_KEY") {
            self.exit_key = key
                .trim()
                .parse()
                .map_err(|_| anyhow!("VIDEOLOOP_EXIT_KEY must be an integer key code"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(0..=255).contains(&self.exit_key) {
            return Err(anyhow!(
                "exit key must be a key code in 0..=255, got {}",
                self.exit_key
            ));
        }
        if self.max_frames == Some(0) {
            return Err(anyhow!("max_frames must be greater than zero"));
        }
        if self.sequence_fps.is_nan() || self.sequence_fps <= 0.0 {
            return Err(anyhow!(
                "sequence_fps must be positive, got {}",
                self.sequence_fps
            ));
        }
        if self.window_title.trim().is_empty() {
            return Err(anyhow!("window_title must not be empty"));
        }
        self.canny.validate()?;
        self.motion.validate()?;
        #[cfg(feature = "backend-opencv")]
        self.hog.validate()?;
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<VideoLoopConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
