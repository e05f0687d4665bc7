use thiserror::Error;

use crate::pipeline::JobState;

/// Main error type for the beat-visualizer library
#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Audio processing error: {0}")]
    Audio(#[from] AudioError),

    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Style processing error: {0}")]
    Style(#[from] StyleError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Audio-specific errors
#[derive(Error, Debug)]
pub enum AudioError {
    /// Unsupported or corrupt audio. Fatal: the job aborts before any frame work.
    #[error("Failed to decode audio: {reason}")]
    Decode { reason: String },

    #[error("Audio analysis failed: {reason}")]
    AnalysisFailed { reason: String },

    #[error("Invalid audio parameters: {details}")]
    InvalidParameters { details: String },
}

/// Video-specific errors
#[derive(Error, Debug)]
pub enum VideoError {
    /// Encoder backend failure. Fatal: partial frame work is discarded.
    #[error("Video encoding failed: {reason}")]
    Encode { reason: String },

    #[error("Invalid video parameters: {details}")]
    InvalidParameters { details: String },
}

/// Style-specific errors
#[derive(Error, Debug)]
pub enum StyleError {
    #[error("Style not found: {name}")]
    NotFound { name: String },

    /// A style algorithm fault. Fatal for the whole job since skipping a
    /// frame would desynchronize audio and video.
    #[error("Rendering {style} failed at frame {frame}: {reason}")]
    Render {
        style: String,
        frame: usize,
        reason: String,
    },

    #[error("Style configuration invalid: {details}")]
    InvalidConfig { details: String },
}

/// Job lifecycle errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("A render job is already active ({state:?})")]
    Busy { state: JobState },

    #[error("Render job cancelled after {frames_rendered} frames")]
    Cancelled { frames_rendered: usize },

    #[error("Render job failed: {reason}")]
    JobFailed { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using CompositorError
pub type Result<T> = std::result::Result<T, CompositorError>;

impl CompositorError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// User-initiated cancellation is a terminal state, not a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Pipeline(PipelineError::Cancelled { .. }))
    }

    /// Check if the caller may simply re-invoke generation
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Pipeline(PipelineError::Busy { .. }) => true,
            Self::Pipeline(PipelineError::Cancelled { .. }) => true,
            Self::Video(VideoError::Encode { .. }) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Audio(AudioError::Decode { reason }) => {
                format!("Could not decode the audio track ({}). Please check it is a supported format.", reason)
            }
            Self::Style(StyleError::NotFound { name }) => {
                format!(
                    "Style '{}' not found. Available styles: particle-system, geometric-patterns, waveform-animation, gradient-flow, spectrum-3d, auto",
                    name
                )
            }
            Self::Pipeline(PipelineError::Busy { .. }) => {
                "Another video is still being generated. Cancel it or wait for it to finish.".to_string()
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
