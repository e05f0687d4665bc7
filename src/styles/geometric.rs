use std::f32::consts::TAU;

use crate::{
    audio::FeatureFrame,
    error::Result,
    styles::traits::{RenderContext, Style, StyleKind},
    video::{
        paint::{Color, Transform},
        types::Frame,
    },
};

/// A ring of spinning squares: more of them with more bass, a wider ring
/// with more mid, bigger and more opaque with more treble
#[derive(Debug, Clone, Default)]
pub struct GeometricPatternsStyle;

impl GeometricPatternsStyle {
    pub fn new() -> Self {
        Self
    }

    /// `floor(bass * 8) + 3`
    pub fn shape_count(bass: f32) -> usize {
        (bass * 8.0).floor() as usize + 3
    }
}

impl Style for GeometricPatternsStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::GeometricPatterns
    }

    fn description(&self) -> &str {
        "Rotating ring of outlined squares pulsing with the spectrum"
    }

    fn render(&mut self, ctx: &RenderContext, features: &FeatureFrame, frame: &mut Frame) -> Result<()> {
        let t = ctx.time();
        let scale = ctx.scale();
        let (cx, cy) = ctx.center();
        let shapes = Self::shape_count(features.bass);

        let size = (features.treble * 30.0 + 10.0) * features.average_amplitude * scale;
        let half = size / 2.0;
        let square = [(-half, -half), (half, -half), (half, half), (-half, half)];
        let opacity = 0.6 + features.treble * 0.4;
        let line_width = (2.0 * scale).max(1.0);

        for i in 0..shapes {
            let angle = i as f32 / shapes as f32 * TAU;
            let radius = (150.0 + features.mid * 100.0) * (1.0 + (t + i as f32).sin() * 0.3) * scale;
            let x = cx + angle.cos() * radius;
            let y = cy + angle.sin() * radius;

            let outline = Transform::IDENTITY
                .translate(x, y)
                .rotate(angle + t * features.bass)
                .apply_all(&square);

            let hue = (i as f32 * 360.0 / shapes as f32 + t * 50.0) % 360.0;
            frame.fill_polygon(&outline, Color::hsl(hue, 0.7, 0.5), opacity);
            frame.stroke_polygon(&outline, line_width, Color::hsl(hue + 30.0, 0.8, 0.6), 1.0);
        }

        Ok(())
    }

    fn fork(&self) -> Option<Box<dyn Style>> {
        Some(Box::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_count_follows_bass() {
        assert_eq!(GeometricPatternsStyle::shape_count(0.0), 3);
        assert_eq!(GeometricPatternsStyle::shape_count(0.5), 7);
        assert_eq!(GeometricPatternsStyle::shape_count(1.0), 11);
    }

    #[test]
    fn test_silent_frame_draws_only_outlines() {
        let ctx = RenderContext {
            frame_index: 0,
            frame_rate: 30,
            width: 320,
            height: 180,
        };
        let mut frame = Frame::new_black(320, 180);
        GeometricPatternsStyle::new()
            .render(&ctx, &FeatureFrame::silent(0, 32), &mut frame)
            .unwrap();

        // Zero amplitude collapses the squares to points; only their outlines remain
        let lit = frame.as_image().pixels().filter(|p| p.0 != [0, 0, 0]).count();
        assert!(lit > 0);
        assert!(lit < 100);
    }

    #[test]
    fn test_output_depends_on_frame_index_only() {
        let features = FeatureFrame {
            bass: 0.5,
            mid: 0.5,
            treble: 0.5,
            average_amplitude: 0.8,
            ..FeatureFrame::silent(12, 32)
        };
        let ctx = RenderContext {
            frame_index: 12,
            frame_rate: 24,
            width: 256,
            height: 144,
        };

        let mut a = Frame::new_black(256, 144);
        let mut b = Frame::new_black(256, 144);
        GeometricPatternsStyle::new().render(&ctx, &features, &mut a).unwrap();
        GeometricPatternsStyle::new()
            .fork()
            .unwrap()
            .render(&ctx, &features, &mut b)
            .unwrap();
        assert_eq!(a.as_rgb_bytes(), b.as_rgb_bytes());
    }
}
