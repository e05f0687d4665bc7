use std::f32::consts::PI;

use crate::{
    audio::FeatureFrame,
    error::Result,
    styles::traits::{RenderContext, Style, StyleKind},
    video::{
        paint::{Color, Transform},
        types::Frame,
    },
};

/// Lower half of the spectrum as a fan of extruded triangles
///
/// Mid widens and tilts each triangle, treble lightens them, and bass turns
/// the whole scene about the centre by up to a quarter turn.
#[derive(Debug, Clone, Default)]
pub struct Spectrum3dStyle;

impl Spectrum3dStyle {
    pub fn new() -> Self {
        Self
    }

    /// Triangle outlines in frame coordinates, lowest bin first
    pub fn triangles(ctx: &RenderContext, features: &FeatureFrame) -> Vec<[(f32, f32); 3]> {
        let bins = &features.frequency_bins;
        let len = bins.len();
        if len == 0 {
            return Vec::new();
        }

        let (cx, cy) = ctx.center();
        let bar_width = ctx.width as f32 / len as f32 * 2.0;
        let depth = features.mid * 100.0 * ctx.scale();
        let scene = Transform::IDENTITY
            .translate(cx, cy)
            .rotate(features.bass * PI * 0.5);

        bins[..len / 2]
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                let height = value * ctx.height as f32 * 0.4;
                let x = (i as f32 - len as f32 / 4.0) * bar_width;
                let local = scene
                    .translate(x, 0.0)
                    .scale(1.0 + features.mid * 0.5, 1.0)
                    .rotate(features.mid * PI * 0.1);
                [
                    local.apply((0.0, -height / 2.0)),
                    local.apply((-depth, height / 2.0)),
                    local.apply((depth, height / 2.0)),
                ]
            })
            .collect()
    }
}

impl Style for Spectrum3dStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::Spectrum3d
    }

    fn description(&self) -> &str {
        "Rotating fan of spectrum triangles with mid-driven depth"
    }

    fn render(&mut self, ctx: &RenderContext, features: &FeatureFrame, frame: &mut Frame) -> Result<()> {
        let t = ctx.time();
        let len = features.frequency_bins.len().max(1) as f32;
        let lightness = 0.5 + features.treble * 0.3;

        for (i, triangle) in Self::triangles(ctx, features).iter().enumerate() {
            let hue = (i as f32 / len * 360.0 + t * 20.0) % 360.0;
            frame.fill_polygon(triangle, Color::hsl(hue, 0.7, lightness), 1.0);
        }

        Ok(())
    }

    fn fork(&self) -> Option<Box<dyn Style>> {
        Some(Box::new(self.clone()))
    }
}
