//! # Video Assembly Pipeline
//!
//! Orchestrates a render job from audio bytes to an encoded video:
//! analysis, per-frame rendering and encoding, with progress notifications
//! and cooperative cancellation. One job runs per pipeline at a time.
//!
//! ```rust,no_run
//! use beat_visualizer::config::Config;
//! use beat_visualizer::pipeline::{GenerationOptions, Progress, RenderPipeline};
//!
//! # async fn run(audio: Vec<u8>) -> beat_visualizer::Result<()> {
//! let pipeline = RenderPipeline::with_defaults(Config::default())?;
//! let output = pipeline
//!     .generate(audio, GenerationOptions::default(), |p: &Progress| {
//!         println!("{:?} {:.0}%", p.stage, p.percentage);
//!     })
//!     .await?;
//! std::fs::write("out.mp4", &output.video)?;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod job;
pub mod options;
pub mod progress;

pub use engine::{RenderJob, RenderPipeline};
pub use job::JobHandle;
pub use options::{GenerationOptions, RenderOutput, Resolution, VideoMetadata};
pub use progress::{JobState, NoProgress, Progress, ProgressSink};
