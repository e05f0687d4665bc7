//! Incremental beat and tempo estimation.
//!
//! The same [`BeatTempoEstimator`] serves the offline window loop and live
//! preview ticks. Only the source of energy samples differs: offline samples
//! are timestamped from their window index, live samples from a monotonic
//! clock.

use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// A band-energy reading and when it was taken
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergySample {
    pub energy: f32,
    pub timestamp_ms: f64,
}

/// Anything that can hand the estimator its next energy reading
pub trait EnergySource {
    fn next_sample(&mut self) -> Option<EnergySample>;
}

/// Energies from the offline window loop, timestamped by window index
pub struct OfflineEnergy<I> {
    energies: I,
    frame_rate: u32,
    index: usize,
}

impl<I: Iterator<Item = f32>> OfflineEnergy<I> {
    pub fn new(energies: I, frame_rate: u32) -> Self {
        Self::starting_at(energies, frame_rate, 0)
    }

    /// Resume a stream whose first energy belongs to window `index`
    pub fn starting_at(energies: I, frame_rate: u32, index: usize) -> Self {
        Self {
            energies,
            frame_rate: frame_rate.max(1),
            index,
        }
    }
}

/// Timestamp of an output frame in milliseconds
pub fn window_timestamp_ms(index: usize, frame_rate: u32) -> f64 {
    index as f64 * 1000.0 / frame_rate.max(1) as f64
}

impl<I: Iterator<Item = f32>> EnergySource for OfflineEnergy<I> {
    fn next_sample(&mut self) -> Option<EnergySample> {
        let energy = self.energies.next()?;
        let sample = EnergySample {
            energy,
            timestamp_ms: window_timestamp_ms(self.index, self.frame_rate),
        };
        self.index += 1;
        Some(sample)
    }
}

/// Energies handed over on each live tick, timestamped by a monotonic clock
///
/// A tick pushes its reading and the estimator polls it straight away.
#[derive(Debug, Clone)]
pub struct LiveEnergy {
    started: Instant,
    pending: Option<EnergySample>,
}

impl LiveEnergy {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            pending: None,
        }
    }

    /// Milliseconds since the clock was started
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// Queue this tick's reading, stamped now
    pub fn push(&mut self, energy: f32) {
        let timestamp_ms = self.elapsed_ms();
        self.push_at(energy, timestamp_ms);
    }

    /// Queue a reading with an explicit tick time, for simulated playback
    pub fn push_at(&mut self, energy: f32, timestamp_ms: f64) {
        self.pending = Some(EnergySample { energy, timestamp_ms });
    }

    /// Restart the clock and drop any unread reading
    pub fn restart(&mut self) {
        self.started = Instant::now();
        self.pending = None;
    }
}

impl Default for LiveEnergy {
    fn default() -> Self {
        Self::new()
    }
}

impl EnergySource for LiveEnergy {
    fn next_sample(&mut self) -> Option<EnergySample> {
        self.pending.take()
    }
}

/// Estimator tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeatConfig {
    /// A sample is a beat when it exceeds `mean * threshold`
    pub threshold: f32,

    /// Capacity of the energy ring buffer
    pub energy_history: usize,

    /// Capacity of the BPM ring buffer
    pub bpm_history: usize,

    /// Minimum spacing between beats counted toward tempo
    pub debounce_ms: f64,

    /// Exclusive lower BPM bound
    pub min_bpm: f64,

    /// Exclusive upper BPM bound
    pub max_bpm: f64,
}

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            threshold: 1.4,
            energy_history: 10,
            bpm_history: 10,
            debounce_ms: 200.0,
            min_bpm: 60.0,
            max_bpm: 200.0,
        }
    }
}

impl BeatConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.threshold.is_finite() && self.threshold > 1.0) {
            return Err("Beat threshold must be greater than 1.0".to_string());
        }

        if self.energy_history == 0 || self.bpm_history == 0 {
            return Err("Beat history capacities must be positive".to_string());
        }

        if self.debounce_ms < 0.0 {
            return Err("Debounce window cannot be negative".to_string());
        }

        if self.min_bpm >= self.max_bpm {
            return Err("Minimum BPM must be less than maximum BPM".to_string());
        }

        Ok(())
    }
}

/// What the estimator made of one energy sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BeatDecision {
    /// Energy stayed under the adaptive threshold
    NoBeat,

    /// Above threshold but inside the debounce window of the last accepted beat
    Debounced,

    /// Beat accepted; carries the BPM admitted to history, if any
    Accepted { bpm: Option<f64> },
}

impl BeatDecision {
    pub fn is_beat(&self) -> bool {
        !matches!(self, BeatDecision::NoBeat)
    }
}

/// Energy-threshold beat detector with a running tempo estimate
#[derive(Debug, Clone)]
pub struct BeatTempoEstimator {
    config: BeatConfig,
    energy: VecDeque<f32>,
    bpm_history: VecDeque<f64>,
    last_beat_ms: Option<f64>,
}

impl BeatTempoEstimator {
    pub fn new() -> Self {
        Self::with_config(BeatConfig::default())
    }

    pub fn with_config(config: BeatConfig) -> Self {
        Self {
            energy: VecDeque::with_capacity(config.energy_history),
            bpm_history: VecDeque::with_capacity(config.bpm_history),
            last_beat_ms: None,
            config,
        }
    }

    pub fn config(&self) -> &BeatConfig {
        &self.config
    }

    /// Feed one energy reading
    pub fn observe(&mut self, sample: EnergySample) -> BeatDecision {
        if self.energy.len() == self.config.energy_history {
            self.energy.pop_front();
        }
        self.energy.push_back(sample.energy);

        let mean = self.energy.iter().sum::<f32>() / self.energy.len() as f32;
        if !(sample.energy > mean * self.config.threshold) {
            return BeatDecision::NoBeat;
        }

        let Some(last) = self.last_beat_ms else {
            self.last_beat_ms = Some(sample.timestamp_ms);
            return BeatDecision::Accepted { bpm: None };
        };

        let interval = sample.timestamp_ms - last;
        if interval < self.config.debounce_ms {
            return BeatDecision::Debounced;
        }

        self.last_beat_ms = Some(sample.timestamp_ms);

        let bpm = 60_000.0 / interval;
        if bpm > self.config.min_bpm && bpm < self.config.max_bpm {
            if self.bpm_history.len() == self.config.bpm_history {
                self.bpm_history.pop_front();
            }
            self.bpm_history.push_back(bpm);
            BeatDecision::Accepted { bpm: Some(bpm) }
        } else {
            BeatDecision::Accepted { bpm: None }
        }
    }

    /// Pull the next reading from `source`, if it has one
    pub fn poll<S: EnergySource>(&mut self, source: &mut S) -> Option<BeatDecision> {
        source.next_sample().map(|sample| self.observe(sample))
    }

    /// Rounded mean of the BPM history, 0 while it is empty
    pub fn estimated_bpm(&self) -> u32 {
        if self.bpm_history.is_empty() {
            return 0;
        }
        let mean = self.bpm_history.iter().sum::<f64>() / self.bpm_history.len() as f64;
        mean.round() as u32
    }

    /// Accepted BPM values, oldest first
    pub fn bpm_history(&self) -> impl Iterator<Item = f64> + '_ {
        self.bpm_history.iter().copied()
    }

    pub fn bpm_history_len(&self) -> usize {
        self.bpm_history.len()
    }

    pub fn reset(&mut self) {
        self.energy.clear();
        self.bpm_history.clear();
        self.last_beat_ms = None;
    }
}

impl Default for BeatTempoEstimator {
    fn default() -> Self {
        Self::new()
    }
}
