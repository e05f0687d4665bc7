use serde::{Deserialize, Serialize};

use crate::audio::beat::BeatConfig;

/// Decoded audio, immutable once produced by a decoder
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl PcmBuffer {
    /// Wrap interleaved samples. `channels` must be at least 1.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels: channels.max(1),
        }
    }

    /// Interleaved samples (one value per channel per sample frame)
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels (1 = mono, 2 = stereo)
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of sample frames (samples per channel)
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Get mono mix of all channels
    pub fn mono_samples(&self) -> Vec<f32> {
        if self.channels == 1 {
            return self.samples.clone();
        }

        let mut mono = Vec::with_capacity(self.frame_count());

        for chunk in self.samples.chunks_exact(self.channels as usize) {
            let sum: f32 = chunk.iter().sum();
            mono.push(sum / self.channels as f32);
        }

        mono
    }
}

/// Per-frame audio descriptor that drives every style
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    /// Output frame index this descriptor belongs to
    pub index: usize,

    /// Spectrum magnitudes, normalized to 0.0-1.0, lowest frequency first
    pub frequency_bins: Vec<f32>,

    /// Raw (mono) samples of the analysis window
    pub time_domain: Vec<f32>,

    /// Mean magnitude of the lowest 10% of bins
    pub bass: f32,

    /// Mean magnitude of bins 10%-40%
    pub mid: f32,

    /// Mean magnitude of bins 40%-100%
    pub treble: f32,

    /// Mean absolute sample value of the window
    pub average_amplitude: f32,

    /// Whether the beat estimator flagged this window
    pub beat_detected: bool,
}

impl FeatureFrame {
    /// Descriptor for a window with no samples
    pub fn silent(index: usize, bins: usize) -> Self {
        Self {
            index,
            frequency_bins: vec![0.0; bins],
            time_domain: Vec::new(),
            bass: 0.0,
            mid: 0.0,
            treble: 0.0,
            average_amplitude: 0.0,
            beat_detected: false,
        }
    }

    /// Whether every scalar is finite and inside its documented range
    pub fn is_well_formed(&self) -> bool {
        let unit = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
        unit(self.bass)
            && unit(self.mid)
            && unit(self.treble)
            && unit(self.average_amplitude)
            && self.frequency_bins.iter().all(|&b| unit(b))
            && self.time_domain.iter().all(|s| s.is_finite())
    }
}

/// Ordered feature sequence for a whole track
#[derive(Debug, Clone)]
pub struct FeatureTrack {
    /// One entry per output frame, indices 0..N-1
    pub frames: Vec<FeatureFrame>,

    /// Frame rate the track was analysed at
    pub frame_rate: u32,

    /// Analysed duration in seconds
    pub duration: f64,

    /// Tempo estimate after the last window
    pub estimated_bpm: u32,
}

impl FeatureTrack {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frames flagged as beats
    pub fn beat_count(&self) -> usize {
        self.frames.iter().filter(|f| f.beat_detected).count()
    }

    /// Average band energies over the whole track
    pub fn mean_bands(&self) -> (f32, f32, f32) {
        if self.frames.is_empty() {
            return (0.0, 0.0, 0.0);
        }
        let n = self.frames.len() as f32;
        let (b, m, t) = self.frames.iter().fold((0.0, 0.0, 0.0), |acc, f| {
            (acc.0 + f.bass, acc.1 + f.mid, acc.2 + f.treble)
        });
        (b / n, m / n, t / n)
    }
}

/// Number of output frames for a duration: `ceil(duration * frame_rate)`
pub fn frame_count_for(duration: f64, frame_rate: u32) -> usize {
    let exact = duration * frame_rate as f64;
    // Guard against 59.99999999 style representation error turning into an extra frame
    let rounded = exact.round();
    if (exact - rounded).abs() < 1e-9 {
        rounded as usize
    } else {
        exact.ceil() as usize
    }
}

/// Configuration for feature extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of spectrum bins per FeatureFrame
    pub frequency_bins: usize,

    /// Lower edge of the magnitude mapping in dBFS
    pub min_decibels: f32,

    /// Upper edge of the magnitude mapping in dBFS
    pub max_decibels: f32,

    /// Windows analysed per parallel chunk (also the progress/cancel cadence)
    pub chunk_frames: usize,

    /// Beat and tempo estimator settings
    pub beat: BeatConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frequency_bins: 1024,
            min_decibels: -100.0,
            max_decibels: -30.0,
            chunk_frames: 256,
            beat: BeatConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.frequency_bins < 10 {
            return Err("At least 10 frequency bins are required".to_string());
        }

        if self.min_decibels >= self.max_decibels {
            return Err("min_decibels must be below max_decibels".to_string());
        }

        if self.chunk_frames == 0 {
            return Err("chunk_frames must be positive".to_string());
        }

        self.beat.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_mono_conversion() {
        let stereo = PcmBuffer::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 44100, 2);
        assert_eq!(stereo.mono_samples(), vec![1.5, 3.5, 5.5]);
        assert_eq!(stereo.frame_count(), 3);
    }

    #[test]
    fn test_pcm_duration() {
        let pcm = PcmBuffer::new(vec![0.0; 88200], 44100, 1);
        assert!((pcm.duration() - 2.0).abs() < 1e-12);

        let empty = PcmBuffer::new(Vec::new(), 0, 0);
        assert_eq!(empty.duration(), 0.0);
        assert_eq!(empty.channels(), 1);
    }

    #[test]
    fn test_frame_count_rounds_up() {
        assert_eq!(frame_count_for(2.0, 30), 60);
        assert_eq!(frame_count_for(2.01, 30), 61);
        assert_eq!(frame_count_for(0.1 * 3.0, 10), 3);
        assert_eq!(frame_count_for(0.0, 30), 0);
    }

    #[test]
    fn test_well_formed_frame() {
        let mut frame = FeatureFrame::silent(0, 16);
        assert!(frame.is_well_formed());

        frame.bass = f32::NAN;
        assert!(!frame.is_well_formed());
    }

    #[test]
    fn test_analysis_config_validation() {
        assert!(AnalysisConfig::default().validate().is_ok());

        let invalid = AnalysisConfig {
            min_decibels: -10.0,
            max_decibels: -20.0,
            ..Default::default()
        };
        assert!(invalid.validate().is_err());
    }
}
