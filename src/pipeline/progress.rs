use std::time::Instant;

use serde::Serialize;

use crate::styles::StyleKind;

/// Lifecycle of a render job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Analyzing,
    Rendering,
    Encoding,
    Complete,
    Error,
    Cancelled,
}

impl JobState {
    /// Analyzing, Rendering or Encoding
    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Analyzing | JobState::Rendering | JobState::Encoding)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Error | JobState::Cancelled)
    }

    /// Percentage band a stage reports within
    pub fn percentage_range(&self) -> (f64, f64) {
        match self {
            JobState::Idle => (0.0, 0.0),
            JobState::Analyzing => (0.0, 20.0),
            JobState::Rendering => (20.0, 90.0),
            JobState::Encoding => (90.0, 100.0),
            JobState::Complete => (100.0, 100.0),
            JobState::Error | JobState::Cancelled => (0.0, 100.0),
        }
    }
}

/// One progress notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub current_frame: usize,
    pub total_frames: usize,
    pub percentage: f64,
    pub stage: JobState,
    /// Remaining time extrapolated from the render rate so far
    pub estimated_time_remaining_ms: Option<u64>,
    /// Style on screen at `current_frame`; differs from the requested one under `auto`
    pub current_style: Option<StyleKind>,
}

/// Receives progress notifications, in order, on the job's task
pub trait ProgressSink: Send {
    fn report(&mut self, progress: &Progress);
}

impl<F> ProgressSink for F
where
    F: FnMut(&Progress) + Send,
{
    fn report(&mut self, progress: &Progress) {
        self(progress)
    }
}

/// Sink that discards every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _progress: &Progress) {}
}

/// Builds progress events and extrapolates the time remaining
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    total_frames: usize,
    render_started: Option<Instant>,
    last_percentage: f64,
}

impl ProgressTracker {
    pub(crate) fn new() -> Self {
        Self {
            total_frames: 0,
            render_started: None,
            last_percentage: 0.0,
        }
    }

    pub(crate) fn set_total_frames(&mut self, total_frames: usize) {
        self.total_frames = total_frames;
    }

    /// Event for `done` of `of` units of work in `stage`
    pub(crate) fn event(&mut self, stage: JobState, current_frame: usize, done: usize, of: usize) -> Progress {
        let (lo, hi) = stage.percentage_range();
        let fraction = if of == 0 { 1.0 } else { (done as f64 / of as f64).min(1.0) };

        let percentage = match stage {
            JobState::Error | JobState::Cancelled => self.last_percentage,
            _ => (lo + (hi - lo) * fraction).max(self.last_percentage),
        };
        self.last_percentage = percentage;

        let estimated_time_remaining_ms = match stage {
            JobState::Rendering => self.render_eta(current_frame),
            JobState::Complete | JobState::Error | JobState::Cancelled => Some(0),
            _ => None,
        };

        Progress {
            current_frame,
            total_frames: self.total_frames,
            percentage,
            stage,
            estimated_time_remaining_ms,
            current_style: None,
        }
    }

    fn render_eta(&mut self, rendered: usize) -> Option<u64> {
        let started = *self.render_started.get_or_insert_with(Instant::now);
        if rendered == 0 {
            return None;
        }
        let per_frame_ms = started.elapsed().as_secs_f64() * 1000.0 / rendered as f64;
        let remaining = self.total_frames.saturating_sub(rendered) as f64;
        Some((per_frame_ms * remaining).round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_ranges() {
        let mut tracker = ProgressTracker::new();
        tracker.set_total_frames(100);

        assert_eq!(tracker.event(JobState::Analyzing, 0, 0, 10).percentage, 0.0);
        assert_eq!(tracker.event(JobState::Analyzing, 0, 5, 10).percentage, 10.0);
        assert_eq!(tracker.event(JobState::Rendering, 0, 0, 100).percentage, 20.0);
        assert_eq!(tracker.event(JobState::Rendering, 50, 50, 100).percentage, 55.0);
        assert_eq!(tracker.event(JobState::Encoding, 100, 0, 1).percentage, 90.0);
        assert_eq!(tracker.event(JobState::Complete, 100, 1, 1).percentage, 100.0);
    }

    #[test]
    fn test_percentage_never_decreases() {
        let mut tracker = ProgressTracker::new();
        tracker.event(JobState::Rendering, 40, 40, 100);
        let cancelled = tracker.event(JobState::Cancelled, 40, 0, 0);
        assert!((cancelled.percentage - 48.0).abs() < 1e-9);
        assert_eq!(cancelled.estimated_time_remaining_ms, Some(0));
    }

    #[test]
    fn test_eta_after_first_frame() {
        let mut tracker = ProgressTracker::new();
        tracker.set_total_frames(10);
        assert_eq!(tracker.event(JobState::Rendering, 0, 0, 10).estimated_time_remaining_ms, None);
        assert!(tracker.event(JobState::Rendering, 5, 5, 10).estimated_time_remaining_ms.is_some());
    }

    #[test]
    fn test_closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |p: &Progress| seen.push(p.stage);
            let mut tracker = ProgressTracker::new();
            sink.report(&tracker.event(JobState::Analyzing, 0, 0, 1));
        }
        assert_eq!(seen, vec![JobState::Analyzing]);
    }
}
