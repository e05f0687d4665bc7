//! Playback-position analysis for previews.
//!
//! Not a capture-time analyser: it reads windows out of an already decoded
//! buffer, but detects beats against a monotonic clock the way a player
//! would see them.

use crate::audio::beat::{BeatDecision, BeatTempoEstimator, LiveEnergy};
use crate::audio::extractor::{band_energies, SpectrumAnalyzer};
use crate::audio::types::{AnalysisConfig, FeatureFrame, PcmBuffer};
use crate::error::{AudioError, Result};

/// Samples per live analysis window
pub const LIVE_WINDOW: usize = 2048;

/// Default spectral smoothing between consecutive readings
pub const LIVE_SMOOTHING: f32 = 0.8;

/// Condensed beat state for indicators
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatDetection {
    pub is_beat: bool,
    pub strength: f32,
    pub bpm: u32,
}

/// Feature readings at arbitrary playback positions of a decoded track
pub struct LiveAnalyzer {
    mono: Vec<f32>,
    sample_rate: u32,
    window_len: usize,
    smoothing: f32,
    spectrum: SpectrumAnalyzer,
    estimator: BeatTempoEstimator,
    previous_bins: Option<Vec<f32>>,
    energy: LiveEnergy,
    readings: usize,
}

impl LiveAnalyzer {
    pub fn new(pcm: &PcmBuffer, config: &AnalysisConfig) -> Result<Self> {
        Self::with_window(pcm, config, LIVE_WINDOW, LIVE_SMOOTHING)
    }

    pub fn with_window(
        pcm: &PcmBuffer,
        config: &AnalysisConfig,
        window_len: usize,
        smoothing: f32,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|details| AudioError::InvalidParameters { details })?;

        if window_len < 2 {
            return Err(AudioError::InvalidParameters {
                details: format!("Live window of {} samples is too short", window_len),
            }
            .into());
        }

        if !(0.0..1.0).contains(&smoothing) {
            return Err(AudioError::InvalidParameters {
                details: format!("Smoothing must be in [0, 1), got {}", smoothing),
            }
            .into());
        }

        Ok(Self {
            mono: pcm.mono_samples(),
            sample_rate: pcm.sample_rate(),
            window_len,
            smoothing,
            spectrum: SpectrumAnalyzer::new(window_len, config),
            estimator: BeatTempoEstimator::with_config(config.beat.clone()),
            previous_bins: None,
            energy: LiveEnergy::new(),
            readings: 0,
        })
    }

    /// Reading for the window under `position` seconds, timestamped now
    pub fn analyze_at(&mut self, position: f64) -> Result<FeatureFrame> {
        let timestamp_ms = self.energy.elapsed_ms();
        self.analyze_with_timestamp(position, timestamp_ms)
    }

    /// Reading for the window under `position` seconds with an explicit
    /// tick time, for simulated playback
    pub fn analyze_with_timestamp(&mut self, position: f64, timestamp_ms: f64) -> Result<FeatureFrame> {
        let index = self.readings;
        self.readings += 1;

        let start = if position.is_finite() && position > 0.0 {
            (position * self.sample_rate as f64) as usize
        } else {
            0
        };

        if start >= self.mono.len() {
            self.observe_energy(0.0, timestamp_ms);
            return Ok(FeatureFrame::silent(index, self.spectrum.bins()));
        }

        let end = (start + self.window_len).min(self.mono.len());
        let samples = &self.mono[start..end];

        let raw = self.spectrum.magnitudes(samples)?;
        let frequency_bins = match self.previous_bins.take() {
            Some(previous) => previous
                .iter()
                .zip(raw.iter())
                .map(|(&p, &r)| self.smoothing * p + (1.0 - self.smoothing) * r)
                .collect(),
            None => raw,
        };
        self.previous_bins = Some(frequency_bins.clone());

        let (bass, mid, treble) = band_energies(&frequency_bins);
        let average_amplitude =
            (samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32).min(1.0);

        let time_domain = samples.to_vec();
        let decision = self.observe_energy(bass, timestamp_ms);

        Ok(FeatureFrame {
            index,
            frequency_bins,
            time_domain,
            bass,
            mid,
            treble,
            average_amplitude,
            beat_detected: decision.is_beat(),
        })
    }

    fn observe_energy(&mut self, energy: f32, timestamp_ms: f64) -> BeatDecision {
        self.energy.push_at(energy, timestamp_ms);
        self.estimator
            .poll(&mut self.energy)
            .unwrap_or(BeatDecision::NoBeat)
    }

    pub fn beat_detection(&self, frame: &FeatureFrame) -> BeatDetection {
        BeatDetection {
            is_beat: frame.beat_detected,
            strength: frame.bass,
            bpm: self.estimator.estimated_bpm(),
        }
    }

    pub fn estimated_bpm(&self) -> u32 {
        self.estimator.estimated_bpm()
    }

    /// Forget smoothing and tempo state, e.g. after a seek
    pub fn reset(&mut self) {
        self.estimator.reset();
        self.previous_bins = None;
        self.energy.restart();
        self.readings = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2 kHz mono track with a loud burst every half second
    fn pulse_track(seconds: f64) -> PcmBuffer {
        let sample_rate = 2000;
        let samples: Vec<f32> = (0..(sample_rate as f64 * seconds) as usize)
            .map(|i| {
                let t = i % 1000;
                if t < 100 {
                    let phase = 2.0 * std::f32::consts::PI * 40.0 * i as f32 / sample_rate as f32;
                    phase.sin() * 0.9
                } else {
                    0.0
                }
            })
            .collect();
        PcmBuffer::new(samples, sample_rate, 1)
    }

    #[test]
    fn test_simulated_playback_finds_tempo() {
        let pcm = pulse_track(8.0);
        let mut analyzer = LiveAnalyzer::with_window(&pcm, &AnalysisConfig::default(), 100, 0.0).unwrap();

        // Tick every 50ms of playback
        let mut beats = 0;
        for tick in 0..160 {
            let position = tick as f64 * 0.05;
            let frame = analyzer.analyze_with_timestamp(position, position * 1000.0).unwrap();
            if frame.beat_detected {
                beats += 1;
            }
        }

        assert!(beats >= 10);
        assert_eq!(analyzer.estimated_bpm(), 120);
    }

    #[test]
    fn test_position_past_end_is_silent() {
        let pcm = pulse_track(1.0);
        let mut analyzer = LiveAnalyzer::new(&pcm, &AnalysisConfig::default()).unwrap();
        let frame = analyzer.analyze_at(5.0).unwrap();
        assert_eq!(frame.average_amplitude, 0.0);
        assert!(!frame.beat_detected);
        assert_eq!(frame.frequency_bins.len(), 1024);
    }

    #[test]
    fn test_readings_are_well_formed_and_indexed() {
        let pcm = pulse_track(2.0);
        let mut analyzer = LiveAnalyzer::new(&pcm, &AnalysisConfig::default()).unwrap();
        for i in 0..5 {
            let frame = analyzer.analyze_at(i as f64 * 0.1).unwrap();
            assert_eq!(frame.index, i);
            assert!(frame.is_well_formed());
        }

        analyzer.reset();
        assert_eq!(analyzer.analyze_at(0.0).unwrap().index, 0);
    }

    #[test]
    fn test_reset_restarts_tempo_clock() {
        let pcm = pulse_track(4.0);
        let mut analyzer = LiveAnalyzer::with_window(&pcm, &AnalysisConfig::default(), 100, 0.0).unwrap();
        for tick in 0..80 {
            let position = tick as f64 * 0.05;
            analyzer.analyze_with_timestamp(position, position * 1000.0).unwrap();
        }
        assert!(analyzer.estimated_bpm() > 0);

        analyzer.reset();
        assert_eq!(analyzer.estimated_bpm(), 0);

        // Wall-clock readings after a seek feed the same estimator
        let frame = analyzer.analyze_at(0.0).unwrap();
        assert!(frame.is_well_formed());
        assert_eq!(analyzer.estimated_bpm(), 0);
    }

    #[test]
    fn test_rejects_bad_smoothing() {
        let pcm = pulse_track(1.0);
        assert!(LiveAnalyzer::with_window(&pcm, &AnalysisConfig::default(), 2048, 1.0).is_err());
        assert!(LiveAnalyzer::with_window(&pcm, &AnalysisConfig::default(), 1, 0.5).is_err());
    }
}
