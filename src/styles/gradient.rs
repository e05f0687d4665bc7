use crate::{
    audio::FeatureFrame,
    error::Result,
    styles::traits::{RenderContext, Style, StyleKind},
    video::{
        paint::{Color, LinearGradient},
        types::Frame,
    },
};

/// Full-frame three-stop gradient whose axis turns with time; beats flash
/// the frame white in proportion to the bass
#[derive(Debug, Clone, Default)]
pub struct GradientFlowStyle;

impl GradientFlowStyle {
    pub fn new() -> Self {
        Self
    }

    pub fn gradient(ctx: &RenderContext, features: &FeatureFrame) -> LinearGradient {
        let t = ctx.time();
        let (w, h) = (ctx.width as f32, ctx.height as f32);
        let (sin, cos) = t.sin_cos();

        let start = (w * 0.5 + sin * w * 0.3, h * 0.5 + cos * h * 0.3);
        let end = (w * 0.5 - sin * w * 0.3, h * 0.5 - cos * h * 0.3);

        let phase = (t * 20.0) % 360.0;
        LinearGradient::new(start, end)
            .with_stop(0.0, Color::hsl(phase + features.bass * 60.0, 0.8, 0.5))
            .with_stop(0.5, Color::hsl(phase + 180.0 + features.mid * 60.0, 0.8, 0.5))
            .with_stop(1.0, Color::hsl(phase + 360.0 + features.treble * 60.0, 0.8, 0.5))
    }
}

impl Style for GradientFlowStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::GradientFlow
    }

    fn description(&self) -> &str {
        "Rotating colour gradient tinted by the three bands, flashing on beats"
    }

    fn render(&mut self, ctx: &RenderContext, features: &FeatureFrame, frame: &mut Frame) -> Result<()> {
        let gradient = Self::gradient(ctx, features);
        frame.fill_with(|x, y| gradient.color_at(x, y));

        if features.beat_detected {
            frame.overlay(Color::WHITE, features.bass * 0.5);
        }

        Ok(())
    }

    fn fork(&self) -> Option<Box<dyn Style>> {
        Some(Box::new(self.clone()))
    }
}
