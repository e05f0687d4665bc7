use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, VideoError},
    styles::StyleKind,
};

/// Output frame size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const HD: Resolution = Resolution { width: 1280, height: 720 };

    /// Largest frame accepted, in pixels (8K UHD)
    pub const MAX_PIXELS: u64 = 7680 * 4320;

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::HD
    }
}

/// Parameters of one generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub style: StyleKind,
    pub resolution: Resolution,
    pub frame_rate: u32,
    pub bitrate_kbps: u32,

    /// Seconds of audio to render; `None` renders the whole track
    pub duration: Option<f64>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            style: StyleKind::Auto,
            resolution: Resolution::HD,
            frame_rate: 30,
            bitrate_kbps: 2500,
            duration: None,
        }
    }
}

impl GenerationOptions {
    pub fn validate(&self) -> Result<()> {
        let Resolution { width, height } = self.resolution;
        if width == 0 || height == 0 {
            return Err(VideoError::InvalidParameters {
                details: format!("Invalid resolution {}x{}", width, height),
            }
            .into());
        }

        if self.resolution.pixel_count() > Resolution::MAX_PIXELS {
            return Err(VideoError::InvalidParameters {
                details: format!(
                    "Resolution {}x{} exceeds {} pixels per frame",
                    width,
                    height,
                    Resolution::MAX_PIXELS
                ),
            }
            .into());
        }

        if self.frame_rate == 0 {
            return Err(VideoError::InvalidParameters {
                details: "Frame rate must be positive".to_string(),
            }
            .into());
        }

        if self.bitrate_kbps == 0 {
            return Err(VideoError::InvalidParameters {
                details: "Bitrate must be positive".to_string(),
            }
            .into());
        }

        if let Some(duration) = self.duration {
            if !duration.is_finite() || duration <= 0.0 {
                return Err(VideoError::InvalidParameters {
                    details: format!("Invalid duration: {}", duration),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Description of a finished video
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoMetadata {
    /// Rendered duration in seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    /// Requested video bitrate in kbps
    pub bitrate: u32,
    pub file_size: u64,
    pub style: StyleKind,
    pub created_at: DateTime<Utc>,
    pub frame_count: usize,
    pub estimated_bpm: u32,
    pub codec: String,
}

/// Result of a completed job
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub video: Vec<u8>,
    pub metadata: VideoMetadata,
}
