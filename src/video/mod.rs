//! # Video Module
//!
//! Raster frames, the drawing primitives styles paint with, and the
//! incremental encoder interface with its ffmpeg implementation.

pub mod encoder;
pub mod paint;
pub mod types;

pub use encoder::{
    AudioTrack, EncodeSettings, EncodedVideo, EncoderFactory, FfmpegEncoder, FfmpegEncoderFactory,
    FfmpegOptions, VideoEncoder,
};
pub use paint::{Color, LinearGradient, Transform};
pub use types::Frame;
