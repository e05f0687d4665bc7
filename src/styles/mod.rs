//! # Visual Style System
//!
//! Every style maps a frame index and its [`FeatureFrame`](crate::audio::FeatureFrame)
//! to a raster frame. Time comes from the frame index and randomness from a
//! seeded generator, so the same inputs always produce the same pixels.
//!
//! ## Built-in Styles
//!
//! - **particle-system**: beat-triggered particle bursts
//! - **geometric-patterns**: a ring of rotating squares
//! - **waveform-animation**: oscilloscope line over a spectrum outline
//! - **gradient-flow**: rotating three-band colour gradient
//! - **spectrum-3d**: a fan of extruded spectrum triangles
//! - **auto**: cycles the others in fixed-length blocks
//!
//! ## Usage
//!
//! ```rust,no_run
//! use beat_visualizer::audio::FeatureFrame;
//! use beat_visualizer::styles::{StyleKind, StyleRegistry, StyleRenderer};
//!
//! # fn main() -> beat_visualizer::Result<()> {
//! let registry = StyleRegistry::default();
//! let style = registry.create(StyleKind::GradientFlow)?;
//! let mut renderer = StyleRenderer::new(style, 1280, 720, 30)?;
//!
//! let frame = renderer.render_frame(0, &FeatureFrame::silent(0, 1024))?;
//! frame.save_png("preview.png").ok();
//! # Ok(())
//! # }
//! ```

pub mod auto;
pub mod geometric;
pub mod gradient;
pub mod particles;
pub mod registry;
pub mod renderer;
pub mod spectrum;
pub mod traits;
pub mod waveform;

pub use auto::{AutoSchedule, AutoStyle};
pub use geometric::GeometricPatternsStyle;
pub use gradient::GradientFlowStyle;
pub use particles::ParticleSystemStyle;
pub use registry::StyleRegistry;
pub use renderer::StyleRenderer;
pub use spectrum::Spectrum3dStyle;
pub use traits::{AutoConfig, RenderContext, Style, StyleConfig, StyleKind, StyleMetadata};
pub use waveform::WaveformAnimationStyle;
