use crate::{
    audio::FeatureFrame,
    error::Result,
    styles::traits::{RenderContext, Style, StyleKind},
    video::{
        paint::{Color, LinearGradient},
        types::Frame,
    },
};

/// Every n-th sample/bin is plotted
const STRIDE: usize = 4;

/// Oscilloscope trace of the window's samples over a faint outline of the
/// spectrum
#[derive(Debug, Clone, Default)]
pub struct WaveformAnimationStyle;

impl WaveformAnimationStyle {
    pub fn new() -> Self {
        Self
    }

    fn trace(ctx: &RenderContext, features: &FeatureFrame) -> Vec<(f32, f32)> {
        let len = features.time_domain.len();
        let (width, mid_y) = (ctx.width as f32, ctx.height as f32 / 2.0);
        // A full-scale sample swings 256px at the reference size
        let gain = 128.0 * 2.0 * features.average_amplitude * ctx.scale();

        (0..len)
            .step_by(STRIDE)
            .map(|i| {
                let x = i as f32 / len as f32 * width;
                let y = mid_y + features.time_domain[i].clamp(-1.0, 1.0) * gain;
                (x, y)
            })
            .collect()
    }

    fn silhouette(ctx: &RenderContext, features: &FeatureFrame) -> Vec<(f32, f32)> {
        let len = features.frequency_bins.len();
        let (width, height) = (ctx.width as f32, ctx.height as f32);

        (0..len)
            .step_by(STRIDE)
            .map(|i| {
                let x = i as f32 / len as f32 * width;
                (x, height - features.frequency_bins[i] * height * 0.3)
            })
            .collect()
    }
}

impl Style for WaveformAnimationStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::WaveformAnimation
    }

    fn description(&self) -> &str {
        "Gradient oscilloscope line with a translucent spectrum outline"
    }

    fn render(&mut self, ctx: &RenderContext, features: &FeatureFrame, frame: &mut Frame) -> Result<()> {
        let (width, height) = (ctx.width as f32, ctx.height as f32);

        let gradient = LinearGradient::new((0.0, 0.0), (width, height))
            .with_stop(0.0, Color::rgb(0x00, 0xff, 0x00))
            .with_stop(0.5, Color::rgb(0x00, 0x99, 0xff))
            .with_stop(1.0, Color::rgb(0xff, 0x00, 0xff));

        let trace = Self::trace(ctx, features);
        let line_width = (3.0 * ctx.scale()).max(1.0);
        frame.stroke_polyline(&trace, line_width, |x, y| gradient.color_at(x, y), 1.0);

        let silhouette = Self::silhouette(ctx, features);
        frame.stroke_polyline(&silhouette, 1.0, |_, _| Color::WHITE, features.average_amplitude * 0.8);

        Ok(())
    }

    fn fork(&self) -> Option<Box<dyn Style>> {
        Some(Box::new(self.clone()))
    }
}
