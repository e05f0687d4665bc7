//! # Audio Analysis Module
//!
//! Decodes audio and reduces it to one [`FeatureFrame`] per output video
//! frame: a normalized spectrum, bass/mid/treble energies, the raw window
//! samples and a beat flag.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use beat_visualizer::audio::{AudioDecoder, AudioFeatureExtractor, SymphoniaDecoder};
//!
//! # fn main() -> anyhow::Result<()> {
//! let bytes = std::fs::read("song.wav")?;
//! let pcm = SymphoniaDecoder::new().decode(&bytes)?;
//!
//! let track = AudioFeatureExtractor::new().extract(&pcm, 30, pcm.duration())?;
//! println!("Estimated BPM: {}", track.estimated_bpm);
//! println!("{} frames, {} beats", track.len(), track.beat_count());
//! # Ok(())
//! # }
//! ```

pub mod beat;
pub mod extractor;
pub mod live;
pub mod loader;
pub mod types;

pub use beat::{BeatConfig, BeatDecision, BeatTempoEstimator, EnergySample, EnergySource, LiveEnergy, OfflineEnergy};
pub use extractor::{AudioFeatureExtractor, ExtractionSession, SpectrumAnalyzer};
pub use live::{BeatDetection, LiveAnalyzer};
pub use loader::{AudioDecoder, SymphoniaDecoder};
pub use types::{frame_count_for, AnalysisConfig, FeatureFrame, FeatureTrack, PcmBuffer};
