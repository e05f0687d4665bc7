//! # Beat Visualizer
//!
//! Turn an audio track into a beat-synchronized music video.
//!
//! Audio is decoded, analysed into one feature frame per video frame, drawn
//! by a procedural visual style and streamed to an encoder that muxes the
//! original audio back in. The same input always produces the same frames.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use beat_visualizer::{
//!     config::Config,
//!     pipeline::{GenerationOptions, NoProgress, RenderPipeline},
//!     styles::StyleKind,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let options = GenerationOptions {
//!     style: StyleKind::ParticleSystem,
//!     ..config.generation_options(StyleKind::Auto)
//! };
//!
//! let pipeline = RenderPipeline::with_defaults(config)?;
//! let audio = std::fs::read("song.wav")?;
//! let output = pipeline.generate(audio, options, NoProgress).await?;
//! std::fs::write("song.mp4", &output.video)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - [`audio`] - Decoding, feature extraction and beat/tempo estimation
//! - [`styles`] - Procedural visual styles and the per-frame renderer
//! - [`video`] - Frames, drawing primitives and video encoding
//! - [`pipeline`] - The cancellable render job
//! - [`config`] - Configuration management
//!
//! ## Creating Custom Styles
//!
//! A style paints one frame from the frame index and its audio features by
//! implementing the [`Style`](styles::Style) trait:
//!
//! ```rust,no_run
//! use beat_visualizer::audio::FeatureFrame;
//! use beat_visualizer::styles::{RenderContext, Style, StyleKind};
//! use beat_visualizer::video::{Color, Frame};
//!
//! struct Pulse;
//!
//! impl Style for Pulse {
//!     fn kind(&self) -> StyleKind {
//!         StyleKind::GradientFlow
//!     }
//!
//!     fn description(&self) -> &str {
//!         "Flashes white on every beat"
//!     }
//!
//!     fn render(
//!         &mut self,
//!         _ctx: &RenderContext,
//!         features: &FeatureFrame,
//!         frame: &mut Frame,
//!     ) -> beat_visualizer::Result<()> {
//!         if features.beat_detected {
//!             frame.clear(Color::WHITE);
//!         }
//!         Ok(())
//!     }
//! }
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod styles;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    error::{CompositorError, Result},
    pipeline::{GenerationOptions, RenderPipeline},
    styles::{Style, StyleKind, StyleRegistry},
};
