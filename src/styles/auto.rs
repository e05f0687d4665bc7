use std::collections::HashMap;

use crate::{
    audio::FeatureFrame,
    error::{Result, StyleError},
    styles::traits::{AutoConfig, RenderContext, Style, StyleKind, StyleMetadata},
    video::types::Frame,
};

/// Which style owns which frame under `auto`
#[derive(Debug, Clone, PartialEq)]
pub struct AutoSchedule {
    block_length: usize,
    rotation: Vec<StyleKind>,
}

impl AutoSchedule {
    pub fn new(config: &AutoConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            block_length: config.block_length,
            rotation: config.rotation.clone(),
        })
    }

    /// `(frame_index / block_length) mod rotation.len()`
    pub fn style_index(&self, frame_index: usize) -> usize {
        (frame_index / self.block_length) % self.rotation.len()
    }

    pub fn kind_at(&self, frame_index: usize) -> StyleKind {
        self.rotation[self.style_index(frame_index)]
    }

    /// Frames before the rotation repeats
    pub fn period(&self) -> usize {
        self.block_length * self.rotation.len()
    }

    pub fn rotation(&self) -> &[StyleKind] {
        &self.rotation
    }
}

/// Deterministic meta-style cycling through fixed-length blocks
///
/// Each distinct style in the rotation keeps one instance for the whole job,
/// so a stateful style picks up where it left off when its block comes round
/// again.
pub struct AutoStyle {
    schedule: AutoSchedule,
    styles: HashMap<StyleKind, Box<dyn Style>>,
}

impl AutoStyle {
    /// `build` creates the concrete style for each kind in the rotation
    pub fn new<F>(config: &AutoConfig, mut build: F) -> Result<Self>
    where
        F: FnMut(StyleKind) -> Result<Box<dyn Style>>,
    {
        let schedule = AutoSchedule::new(config)?;
        let mut styles = HashMap::new();
        for &kind in schedule.rotation() {
            if !styles.contains_key(&kind) {
                styles.insert(kind, build(kind)?);
            }
        }
        Ok(Self { schedule, styles })
    }

    pub fn schedule(&self) -> &AutoSchedule {
        &self.schedule
    }
}

impl Style for AutoStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::Auto
    }

    fn description(&self) -> &str {
        "Cycles through the other styles in fixed-length blocks"
    }

    fn render(&mut self, ctx: &RenderContext, features: &FeatureFrame, frame: &mut Frame) -> Result<()> {
        let kind = self.schedule.kind_at(ctx.frame_index);
        let style = self.styles.get_mut(&kind).ok_or_else(|| StyleError::Render {
            style: StyleKind::Auto.to_string(),
            frame: ctx.frame_index,
            reason: format!("no instance for {}", kind),
        })?;
        style.render(ctx, features, frame)
    }

    fn fork(&self) -> Option<Box<dyn Style>> {
        let mut styles = HashMap::with_capacity(self.styles.len());
        for (&kind, style) in &self.styles {
            styles.insert(kind, style.fork()?);
        }
        Some(Box::new(AutoStyle {
            schedule: self.schedule.clone(),
            styles,
        }))
    }

    fn metadata(&self) -> StyleMetadata {
        let parts: Vec<StyleMetadata> = self.styles.values().map(|s| s.metadata()).collect();
        StyleMetadata {
            frame_local: parts.iter().all(|m| m.frame_local),
            performance_impact: parts.iter().map(|m| m.performance_impact).fold(0.0, f32::max),
        }
    }

    fn reset(&mut self) {
        for style in self.styles.values_mut() {
            style.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::{GeometricPatternsStyle, GradientFlowStyle, ParticleSystemStyle, Spectrum3dStyle};

    fn build(kind: StyleKind) -> Result<Box<dyn Style>> {
        Ok(match kind {
            StyleKind::ParticleSystem => Box::new(ParticleSystemStyle::new(1, 100)),
            StyleKind::GeometricPatterns => Box::new(GeometricPatternsStyle::new()),
            StyleKind::GradientFlow => Box::new(GradientFlowStyle::new()),
            StyleKind::Spectrum3d => Box::new(Spectrum3dStyle::new()),
            other => {
                return Err(StyleError::NotFound {
                    name: other.to_string(),
                }
                .into())
            }
        })
    }

    #[test]
    fn test_blocks_of_180_frames() {
        let schedule = AutoSchedule::new(&AutoConfig::default()).unwrap();

        for frame in 0..180 {
            assert_eq!(schedule.style_index(frame), 0);
        }
        for frame in 180..360 {
            assert_eq!(schedule.style_index(frame), 1);
        }
        assert_eq!(schedule.kind_at(360), StyleKind::GradientFlow);
        assert_eq!(schedule.kind_at(540), StyleKind::Spectrum3d);

        let period = schedule.period();
        assert_eq!(period, 720);
        for frame in (0..2000).step_by(37) {
            assert_eq!(schedule.style_index(frame), schedule.style_index(frame + period));
        }
    }

    #[test]
    fn test_waveform_not_in_default_rotation() {
        let schedule = AutoSchedule::new(&AutoConfig::default()).unwrap();
        assert!(!schedule.rotation().contains(&StyleKind::WaveformAnimation));
    }

    #[test]
    fn test_custom_rotation() {
        let config = AutoConfig {
            block_length: 2,
            rotation: vec![StyleKind::GradientFlow, StyleKind::Spectrum3d],
        };
        let schedule = AutoSchedule::new(&config).unwrap();
        let kinds: Vec<StyleKind> = (0..6).map(|i| schedule.kind_at(i)).collect();
        assert_eq!(
            kinds,
            vec![
                StyleKind::GradientFlow,
                StyleKind::GradientFlow,
                StyleKind::Spectrum3d,
                StyleKind::Spectrum3d,
                StyleKind::GradientFlow,
                StyleKind::GradientFlow,
            ]
        );
    }

    #[test]
    fn test_auto_delegates_to_scheduled_style() {
        let config = AutoConfig {
            block_length: 1,
            rotation: vec![StyleKind::GradientFlow, StyleKind::GeometricPatterns],
        };
        let mut auto = AutoStyle::new(&config, build).unwrap();
        let features = FeatureFrame::silent(0, 16);

        let render = |style: &mut dyn Style, index: usize| {
            let ctx = RenderContext {
                frame_index: index,
                frame_rate: 30,
                width: 64,
                height: 36,
            };
            let mut frame = Frame::new_black(64, 36);
            style.render(&ctx, &features, &mut frame).unwrap();
            frame.into_rgb_bytes()
        };

        assert_eq!(render(&mut auto, 0), render(&mut GradientFlowStyle::new(), 0));
        assert_eq!(render(&mut auto, 1), render(&mut GeometricPatternsStyle::new(), 1));
    }

    #[test]
    fn test_frame_locality_follows_rotation() {
        let with_particles = AutoStyle::new(&AutoConfig::default(), build).unwrap();
        assert!(!with_particles.metadata().frame_local);
        assert!(with_particles.fork().is_none());

        let stateless = AutoStyle::new(
            &AutoConfig {
                block_length: 10,
                rotation: vec![StyleKind::GradientFlow, StyleKind::Spectrum3d],
            },
            build,
        )
        .unwrap();
        assert!(stateless.metadata().frame_local);
        assert!(stateless.fork().is_some());
    }
}
