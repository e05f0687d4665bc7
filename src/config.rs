use std::path::Path;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    audio::AnalysisConfig,
    error::{ConfigError, Result},
    pipeline::{GenerationOptions, Resolution},
    styles::{StyleConfig, StyleKind},
    video::FfmpegOptions,
};

/// Main configuration for the beat visualizer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Audio analysis settings
    #[serde(default)]
    pub audio: AnalysisConfig,

    /// Output video settings
    #[serde(default)]
    pub video: VideoConfig,

    /// Frame rendering settings
    #[serde(default)]
    pub render: RenderConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.audio.validate().map_err(|details| ConfigError::InvalidValue {
            key: "audio".to_string(),
            value: details,
        })?;
        self.video.validate()?;
        self.render.validate()?;
        Ok(())
    }

    /// Generation options for `style` using the configured output settings
    pub fn generation_options(&self, style: StyleKind) -> GenerationOptions {
        GenerationOptions {
            style,
            resolution: Resolution::new(self.video.width, self.video.height),
            frame_rate: self.video.frame_rate,
            bitrate_kbps: self.video.bitrate_kbps,
            duration: None,
        }
    }
}

/// Output video configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Default frame width in pixels
    pub width: u32,

    /// Default frame height in pixels
    pub height: u32,

    /// Default frames per second
    pub frame_rate: u32,

    /// Default video bitrate in kbps
    pub bitrate_kbps: u32,

    /// ffmpeg encoder settings
    pub ffmpeg: FfmpegOptions,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frame_rate: 30,
            bitrate_kbps: 2500,
            ffmpeg: FfmpegOptions::default(),
        }
    }
}

impl VideoConfig {
    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidValue {
                key: "video.resolution".to_string(),
                value: format!("{}x{}", self.width, self.height)
            }.into());
        }

        if self.frame_rate == 0 {
            return Err(ConfigError::InvalidValue {
                key: "video.frame_rate".to_string(),
                value: self.frame_rate.to_string()
            }.into());
        }

        if self.bitrate_kbps == 0 {
            return Err(ConfigError::InvalidValue {
                key: "video.bitrate_kbps".to_string(),
                value: self.bitrate_kbps.to_string()
            }.into());
        }

        if self.ffmpeg.binary.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "video.ffmpeg.binary".to_string(),
                value: self.ffmpeg.binary.clone()
            }.into());
        }

        Ok(())
    }
}

/// Frame rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Frames rendered between cooperative yields to the runtime
    pub yield_every: usize,

    /// Frames rendered concurrently for frame-local styles (1 = sequential)
    pub parallel_frames: usize,

    /// Style settings
    pub style: StyleConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            yield_every: 30,
            parallel_frames: 1,
            style: StyleConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Upper bound for `parallel_frames` on this machine
    pub fn max_parallel_frames() -> usize {
        num_cpus::get().max(1) * 4
    }

    /// `parallel_frames` clamped to what this machine can use
    pub fn effective_parallel_frames(&self) -> usize {
        let max = Self::max_parallel_frames();
        if self.parallel_frames > max {
            warn!(
                "render.parallel_frames = {} exceeds {} on this machine, clamping",
                self.parallel_frames, max
            );
            return max;
        }
        self.parallel_frames.max(1)
    }

    fn validate(&self) -> Result<()> {
        if self.yield_every == 0 {
            return Err(ConfigError::InvalidValue {
                key: "render.yield_every".to_string(),
                value: self.yield_every.to_string()
            }.into());
        }

        if self.parallel_frames == 0 {
            return Err(ConfigError::InvalidValue {
                key: "render.parallel_frames".to_string(),
                value: self.parallel_frames.to_string()
            }.into());
        }

        self.style.validate().map_err(|e| ConfigError::InvalidValue {
            key: "render.style".to_string(),
            value: e.to_string()
        })?;

        Ok(())
    }
}
