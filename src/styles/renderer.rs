use rayon::prelude::*;

use crate::{
    audio::FeatureFrame,
    error::{Result, StyleError, VideoError},
    styles::traits::{RenderContext, Style, StyleKind},
    video::types::Frame,
};

/// Turns feature frames into raster frames with one style instance
///
/// Owns the style for the length of a job. Frames start black and are sized
/// to the job's resolution.
pub struct StyleRenderer {
    style: Box<dyn Style>,
    width: u32,
    height: u32,
    frame_rate: u32,
}

impl StyleRenderer {
    pub fn new(style: Box<dyn Style>, width: u32, height: u32, frame_rate: u32) -> Result<Self> {
        if width == 0 || height == 0 || frame_rate == 0 {
            return Err(VideoError::InvalidParameters {
                details: format!("Cannot render {}x{} at {} fps", width, height, frame_rate),
            }
            .into());
        }

        Ok(Self {
            style,
            width,
            height,
            frame_rate,
        })
    }

    pub fn kind(&self) -> StyleKind {
        self.style.kind()
    }

    /// Whether frames may be rendered out of order
    pub fn is_frame_local(&self) -> bool {
        self.style.metadata().frame_local
    }

    fn context(&self, frame_index: usize) -> RenderContext {
        RenderContext {
            frame_index,
            frame_rate: self.frame_rate,
            width: self.width,
            height: self.height,
        }
    }

    fn check_features(&self, frame_index: usize, features: &FeatureFrame) -> Result<()> {
        if features.is_well_formed() {
            return Ok(());
        }
        Err(StyleError::Render {
            style: self.style.kind().to_string(),
            frame: frame_index,
            reason: "feature frame holds non-finite or out-of-range values".to_string(),
        }
        .into())
    }

    /// Render a single frame
    pub fn render_frame(&mut self, frame_index: usize, features: &FeatureFrame) -> Result<Frame> {
        self.check_features(frame_index, features)?;

        let ctx = self.context(frame_index);
        let mut frame = Frame::new_black(self.width, self.height);
        self.style.render(&ctx, features, &mut frame)?;
        Ok(frame)
    }

    /// Render consecutive frames starting at `first_index`, returned in order
    ///
    /// Frame-local styles are rendered in parallel on forked instances;
    /// anything else falls back to sequential rendering.
    pub fn render_batch(&mut self, first_index: usize, features: &[FeatureFrame]) -> Result<Vec<Frame>> {
        let forks: Option<Vec<Box<dyn Style>>> = if features.len() > 1 && self.is_frame_local() {
            features.iter().map(|_| self.style.fork()).collect()
        } else {
            None
        };

        let Some(forks) = forks else {
            return features
                .iter()
                .enumerate()
                .map(|(offset, f)| self.render_frame(first_index + offset, f))
                .collect();
        };

        for (offset, f) in features.iter().enumerate() {
            self.check_features(first_index + offset, f)?;
        }

        let (width, height, frame_rate) = (self.width, self.height, self.frame_rate);
        forks
            .into_par_iter()
            .zip(features.par_iter())
            .enumerate()
            .map(|(offset, (mut style, f))| -> Result<Frame> {
                let ctx = RenderContext {
                    frame_index: first_index + offset,
                    frame_rate,
                    width,
                    height,
                };
                let mut frame = Frame::new_black(width, height);
                style.render(&ctx, f, &mut frame)?;
                Ok(frame)
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.style.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::StyleRegistry;

    fn renderer(kind: StyleKind) -> StyleRenderer {
        let style = StyleRegistry::default().create(kind).unwrap();
        StyleRenderer::new(style, 64, 36, 30).unwrap()
    }

    fn features(index: usize) -> FeatureFrame {
        let level = (index % 10) as f32 / 10.0;
        FeatureFrame {
            frequency_bins: vec![level; 32],
            time_domain: vec![level - 0.5; 64],
            bass: level,
            mid: 1.0 - level,
            treble: level / 2.0,
            average_amplitude: 0.5,
            beat_detected: index % 4 == 0,
            ..FeatureFrame::silent(index, 32)
        }
    }

    #[test]
    fn test_frames_have_job_resolution() {
        for kind in StyleKind::ALL {
            let mut r = renderer(kind);
            let frame = r.render_frame(0, &features(0)).unwrap();
            assert_eq!((frame.width(), frame.height()), (64, 36));
        }
    }

    #[test]
    fn test_non_finite_features_are_render_errors() {
        let mut r = renderer(StyleKind::GradientFlow);
        let mut bad = features(3);
        bad.treble = f32::INFINITY;

        match r.render_frame(3, &bad) {
            Err(crate::error::CompositorError::Style(StyleError::Render { frame, style, .. })) => {
                assert_eq!(frame, 3);
                assert_eq!(style, "gradient-flow");
            }
            other => panic!("Expected render error, got {:?}", other.map(|f| f.width())),
        }
    }

    #[test]
    fn test_parallel_batch_matches_sequential() {
        let inputs: Vec<FeatureFrame> = (0..12).map(features).collect();

        let mut parallel = renderer(StyleKind::Spectrum3d);
        assert!(parallel.is_frame_local());
        let batch = parallel.render_batch(0, &inputs).unwrap();

        let mut sequential = renderer(StyleKind::Spectrum3d);
        for (i, f) in inputs.iter().enumerate() {
            let frame = sequential.render_frame(i, f).unwrap();
            assert_eq!(frame.as_rgb_bytes(), batch[i].as_rgb_bytes());
        }
    }

    #[test]
    fn test_stateful_batch_is_sequential() {
        let inputs: Vec<FeatureFrame> = (0..8).map(features).collect();

        let mut batched = renderer(StyleKind::ParticleSystem);
        assert!(!batched.is_frame_local());
        let batch = batched.render_batch(0, &inputs).unwrap();

        let mut single = renderer(StyleKind::ParticleSystem);
        for (i, f) in inputs.iter().enumerate() {
            assert_eq!(single.render_frame(i, f).unwrap().as_rgb_bytes(), batch[i].as_rgb_bytes());
        }
    }

    #[test]
    fn test_rejects_empty_resolution() {
        let style = StyleRegistry::default().create(StyleKind::GradientFlow).unwrap();
        assert!(StyleRenderer::new(style, 0, 36, 30).is_err());
    }
}
