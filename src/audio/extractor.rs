use std::borrow::Cow;
use std::sync::Arc;

use rayon::prelude::*;
use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use crate::audio::beat::{BeatTempoEstimator, OfflineEnergy};
use crate::audio::types::{frame_count_for, AnalysisConfig, FeatureFrame, FeatureTrack, PcmBuffer};
use crate::error::{AudioError, Result};

/// Fraction of bins counted as bass
const BASS_END: f32 = 0.1;
/// Fraction of bins where treble starts
const MID_END: f32 = 0.4;

/// Per-frame feature extractor for whole tracks
///
/// Splits the mono mix into one window per output frame, computes a binned
/// magnitude spectrum for each window and runs the beat estimator over the
/// bass band in frame order.
pub struct AudioFeatureExtractor {
    config: AnalysisConfig,
}

impl AudioFeatureExtractor {
    /// Create a new extractor with default configuration
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    /// Create a new extractor with custom configuration
    pub fn with_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Extract the full feature track in one go
    pub fn extract(&self, pcm: &PcmBuffer, frame_rate: u32, duration: f64) -> Result<FeatureTrack> {
        let mut session = self.session(pcm, frame_rate, duration)?;
        while session.next_chunk()?.is_some() {}
        Ok(session.finish())
    }

    /// Start an incremental extraction that is advanced chunk by chunk
    pub fn session(&self, pcm: &PcmBuffer, frame_rate: u32, duration: f64) -> Result<ExtractionSession> {
        self.config
            .validate()
            .map_err(|details| AudioError::InvalidParameters { details })?;

        if frame_rate == 0 {
            return Err(AudioError::InvalidParameters {
                details: "Frame rate must be positive".to_string(),
            }
            .into());
        }

        if !duration.is_finite() || duration < 0.0 {
            return Err(AudioError::InvalidParameters {
                details: format!("Invalid duration: {}", duration),
            }
            .into());
        }

        let sample_rate = pcm.sample_rate();
        let window_len = (sample_rate / frame_rate) as usize;
        if window_len == 0 {
            return Err(AudioError::InvalidParameters {
                details: format!(
                    "Frame rate {} exceeds sample rate {} Hz",
                    frame_rate, sample_rate
                ),
            }
            .into());
        }

        let total_frames = frame_count_for(duration, frame_rate);

        tracing::debug!(
            "Extraction: {} frames, {} samples per window, {} bins",
            total_frames,
            window_len,
            self.config.frequency_bins
        );

        Ok(ExtractionSession {
            mono: pcm.mono_samples(),
            sample_rate,
            frame_rate,
            duration,
            window_len,
            total_frames,
            chunk_frames: self.config.chunk_frames,
            spectrum: SpectrumAnalyzer::new(window_len, &self.config),
            estimator: BeatTempoEstimator::with_config(self.config.beat.clone()),
            frames: Vec::with_capacity(total_frames),
        })
    }
}

impl Default for AudioFeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extraction in progress
///
/// Windows inside a chunk are analysed in parallel; beat detection always
/// runs afterwards in index order, so chunking never changes the output.
pub struct ExtractionSession {
    mono: Vec<f32>,
    sample_rate: u32,
    frame_rate: u32,
    duration: f64,
    window_len: usize,
    total_frames: usize,
    chunk_frames: usize,
    spectrum: SpectrumAnalyzer,
    estimator: BeatTempoEstimator,
    frames: Vec<FeatureFrame>,
}

impl ExtractionSession {
    /// Total number of frames this session will produce
    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// Frames produced so far
    pub fn processed(&self) -> usize {
        self.frames.len()
    }

    /// Analyse the next chunk of windows. Returns the number of frames
    /// processed so far, or `None` once every frame has been produced.
    pub fn next_chunk(&mut self) -> Result<Option<usize>> {
        let start = self.frames.len();
        if start >= self.total_frames {
            return Ok(None);
        }
        let end = (start + self.chunk_frames).min(self.total_frames);

        let analysed: Vec<FeatureFrame> = (start..end)
            .into_par_iter()
            .map(|index| self.analyse_window(index))
            .collect::<Result<Vec<_>>>()?;

        let energies: Vec<f32> = analysed.iter().map(|frame| frame.bass).collect();
        let mut source = OfflineEnergy::starting_at(energies.into_iter(), self.frame_rate, start);

        for mut frame in analysed {
            frame.beat_detected = self
                .estimator
                .poll(&mut source)
                .map(|decision| decision.is_beat())
                .unwrap_or(false);
            self.frames.push(frame);
        }

        Ok(Some(self.frames.len()))
    }

    /// Consume the session. Frames not yet analysed are not included.
    pub fn finish(self) -> FeatureTrack {
        FeatureTrack {
            estimated_bpm: self.estimator.estimated_bpm(),
            frames: self.frames,
            frame_rate: self.frame_rate,
            duration: self.duration,
        }
    }

    fn analyse_window(&self, index: usize) -> Result<FeatureFrame> {
        // Anchor each window to the exact frame time so non-integer
        // samples-per-frame ratios do not drift
        let start = (index as u128 * self.sample_rate as u128 / self.frame_rate as u128) as usize;
        if start >= self.mono.len() {
            return Ok(FeatureFrame::silent(index, self.spectrum.bins));
        }
        let end = (start + self.window_len).min(self.mono.len());
        let samples = &self.mono[start..end];

        let frequency_bins = self.spectrum.magnitudes(samples)?;
        let (bass, mid, treble) = band_energies(&frequency_bins);

        let average_amplitude =
            (samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32).min(1.0);

        Ok(FeatureFrame {
            index,
            frequency_bins,
            time_domain: samples.to_vec(),
            bass,
            mid,
            treble,
            average_amplitude,
            beat_detected: false,
        })
    }
}

/// Binned, dB-normalized magnitude spectrum of one window
pub struct SpectrumAnalyzer {
    bins: usize,
    min_db: f32,
    max_db: f32,
    window_len: usize,
    fft: Arc<dyn RealToComplex<f32>>,
    hann: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(window_len: usize, config: &AnalysisConfig) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        Self {
            bins: config.frequency_bins,
            min_db: config.min_decibels,
            max_db: config.max_decibels,
            window_len,
            fft: planner.plan_fft_forward(window_len.max(1)),
            hann: hann_window(window_len),
        }
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Magnitudes of exactly `samples`, no zero padding
    pub fn magnitudes(&self, samples: &[f32]) -> Result<Vec<f32>> {
        let n = samples.len();
        if n < 2 {
            return Ok(vec![0.0; self.bins]);
        }

        // Only a truncated final window needs its own plan
        let (fft, window): (Arc<dyn RealToComplex<f32>>, Cow<[f32]>) = if n == self.window_len {
            (Arc::clone(&self.fft), Cow::Borrowed(self.hann.as_slice()))
        } else {
            let mut planner = RealFftPlanner::<f32>::new();
            (planner.plan_fft_forward(n), Cow::Owned(hann_window(n)))
        };

        let mut input: Vec<f32> = samples
            .iter()
            .zip(window.iter())
            .map(|(&s, &w)| s * w)
            .collect();
        let mut spectrum: Vec<Complex<f32>> = fft.make_output_vec();

        fft.process(&mut input, &mut spectrum)
            .map_err(|e| AudioError::AnalysisFailed {
                reason: format!("FFT processing failed: {}", e),
            })?;

        let scale = 1.0 / n as f32;
        let levels: Vec<f32> = spectrum
            .iter()
            .map(|c| self.normalize(c.norm() * scale))
            .collect();

        Ok(rebin(&levels, self.bins))
    }

    fn normalize(&self, magnitude: f32) -> f32 {
        let db = 20.0 * magnitude.max(1e-12).log10();
        ((db - self.min_db) / (self.max_db - self.min_db)).clamp(0.0, 1.0)
    }
}

fn hann_window(len: usize) -> Vec<f32> {
    if len < 2 {
        return vec![1.0; len];
    }
    (0..len)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (len - 1) as f32).cos()))
        .collect()
}

/// Average `levels` into exactly `bins` buckets
fn rebin(levels: &[f32], bins: usize) -> Vec<f32> {
    let src = levels.len();
    if src == 0 {
        return vec![0.0; bins];
    }

    (0..bins)
        .map(|b| {
            let start = b * src / bins;
            let end = ((b + 1) * src / bins).max(start + 1).min(src);
            let slice = &levels[start..end];
            slice.iter().sum::<f32>() / slice.len() as f32
        })
        .collect()
}

/// Mean level of the bass, mid and treble bin ranges
pub fn band_energies(bins: &[f32]) -> (f32, f32, f32) {
    let len = bins.len();
    let bass_end = (len as f32 * BASS_END) as usize;
    let mid_end = (len as f32 * MID_END) as usize;

    let mean = |range: &[f32]| {
        if range.is_empty() {
            0.0
        } else {
            range.iter().sum::<f32>() / range.len() as f32
        }
    };

    (
        mean(&bins[..bass_end]),
        mean(&bins[bass_end..mid_end]),
        mean(&bins[mid_end..]),
    )
}
