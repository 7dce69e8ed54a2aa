//! Synthetic `stub://` frame source.
//!
//! URL form: `stub://<pattern>?frames=N&width=W&height=H&fps=F&color=RRGGBB`.
//!
//! - `uniform`: every frame is a single color (default gray `808080`)
//! - `gradient`: a ramp that shifts by one step per frame
//! - `blink`: even frames black, odd frames white
//!
//! Without `frames` the stream never ends, like a live camera.

use anyhow::{anyhow, bail, Context, Result};
use image::{Rgb, RgbImage};
use url::Url;

use super::{FrameSource, SourceStats};
use crate::frame::{Frame, SourceInfo};

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_FPS: f64 = 30.0;
const DEFAULT_COLOR: [u8; 3] = [0x80, 0x80, 0x80];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyntheticPattern {
    Uniform([u8; 3]),
    Gradient,
    Blink,
}

/// Configuration for a synthetic source.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub url: String,
    pub pattern: SyntheticPattern,
    /// Number of frames before exhaustion; `None` is endless.
    pub frames: Option<u64>,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            url: "stub://uniform".to_string(),
            pattern: SyntheticPattern::Uniform(DEFAULT_COLOR),
            frames: None,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: DEFAULT_FPS,
        }
    }
}

impl SyntheticConfig {
    pub fn from_url(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).with_context(|| format!("invalid synthetic url '{}'", raw))?;
        if url.scheme() != "stub" {
            bail!("synthetic sources use the stub:// scheme, got '{}'", raw);
        }

        let mut cfg = Self {
            url: raw.to_string(),
            ..Self::default()
        };
        let mut color = DEFAULT_COLOR;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "frames" => cfg.frames = Some(parse_value(&key, &value)?),
                "width" => cfg.width = parse_value(&key, &value)?,
                "height" => cfg.height = parse_value(&key, &value)?,
                "fps" => cfg.fps = parse_value(&key, &value)?,
                "color" => color = parse_color(&value)?,
                other => bail!("unknown synthetic parameter '{}'", other),
            }
        }
        cfg.pattern = match url.host_str().unwrap_or("uniform") {
            "uniform" => SyntheticPattern::Uniform(color),
            "gradient" => SyntheticPattern::Gradient,
            "blink" => SyntheticPattern::Blink,
            other => bail!("unknown synthetic pattern '{}'", other),
        };

        if cfg.width == 0 || cfg.height == 0 {
            bail!("synthetic frame size must be non-zero");
        }
        if cfg.fps.is_nan() || cfg.fps <= 0.0 {
            bail!("synthetic fps must be positive");
        }
        Ok(cfg)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("invalid value '{}' for synthetic parameter '{}'", value, key))
}

fn parse_color(value: &str) -> Result<[u8; 3]> {
    let hex = value.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        bail!("color must be six hex digits, got '{}'", value);
    }
    let mut rgb = [0u8; 3];
    for (i, channel) in rgb.iter_mut().enumerate() {
        *channel = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|_| anyhow!("color must be six hex digits, got '{}'", value))?;
    }
    Ok(rgb)
}

// ----------------------------------------------------------------------------
// Source
// ----------------------------------------------------------------------------

pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_count: u64,
    scene_state: u8,
    released: bool,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        log::info!("SyntheticSource: opened {}", config.url);
        Self {
            config,
            frame_count: 0,
            scene_state: 0,
            released: false,
        }
    }

    fn generate(&mut self) -> RgbImage {
        let (width, height) = (self.config.width, self.config.height);
        match self.config.pattern {
            SyntheticPattern::Uniform(color) => RgbImage::from_pixel(width, height, Rgb(color)),
            SyntheticPattern::Blink => {
                let level = if self.frame_count % 2 == 0 { 0 } else { 255 };
                RgbImage::from_pixel(width, height, Rgb([level; 3]))
            }
            SyntheticPattern::Gradient => {
                if self.frame_count % 50 == 0 {
                    self.scene_state = self.scene_state.wrapping_add(1);
                }
                let shift = self.frame_count + self.scene_state as u64;
                RgbImage::from_fn(width, height, |x, y| {
                    let v = ((x as u64 + y as u64 + shift) % 256) as u8;
                    Rgb([v, v, v])
                })
            }
        }
    }
}

impl FrameSource for SyntheticSource {
    fn describe(&self) -> String {
        self.config.url.clone()
    }

    fn info(&self) -> SourceInfo {
        SourceInfo::new(self.config.width, self.config.height, self.config.fps)
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        if self.released {
            bail!("synthetic source {} already released", self.config.url);
        }
        if self
            .config
            .frames
            .is_some_and(|limit| self.frame_count >= limit)
        {
            return Ok(None);
        }
        let image = self.generate();
        let frame = Frame::new(image, self.frame_count);
        self.frame_count += 1;
        Ok(Some(frame))
    }

    fn release(&mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            log::debug!(
                "SyntheticSource: released {} after {} frames",
                self.config.url,
                self.frame_count
            );
        }
        Ok(())
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frame_count,
            source: self.config.url.clone(),
        }
    }
}
