use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    audio::FeatureFrame,
    error::{CompositorError, Result, StyleError},
    video::types::Frame,
};

/// Selector for the visual algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleKind {
    ParticleSystem,
    GeometricPatterns,
    WaveformAnimation,
    GradientFlow,
    #[serde(rename = "spectrum-3d")]
    Spectrum3d,
    #[serde(alias = "auto-generate")]
    Auto,
}

impl StyleKind {
    /// Every selectable style, `auto` last
    pub const ALL: [StyleKind; 6] = [
        StyleKind::ParticleSystem,
        StyleKind::GeometricPatterns,
        StyleKind::WaveformAnimation,
        StyleKind::GradientFlow,
        StyleKind::Spectrum3d,
        StyleKind::Auto,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StyleKind::ParticleSystem => "particle-system",
            StyleKind::GeometricPatterns => "geometric-patterns",
            StyleKind::WaveformAnimation => "waveform-animation",
            StyleKind::GradientFlow => "gradient-flow",
            StyleKind::Spectrum3d => "spectrum-3d",
            StyleKind::Auto => "auto",
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, StyleKind::Auto)
    }
}

impl fmt::Display for StyleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StyleKind {
    type Err = CompositorError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        if normalized == "auto-generate" {
            return Ok(StyleKind::Auto);
        }
        StyleKind::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| StyleError::NotFound { name: s.to_string() }.into())
    }
}

/// Where in the output a frame sits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    pub frame_index: usize,
    pub frame_rate: u32,
    pub width: u32,
    pub height: u32,
}

impl RenderContext {
    /// Reference canvas the style constants were tuned for
    pub const REFERENCE_WIDTH: f32 = 1280.0;
    pub const REFERENCE_HEIGHT: f32 = 720.0;

    /// Presentation time in seconds, derived from the frame index only
    pub fn time(&self) -> f32 {
        (self.frame_index as f64 / self.frame_rate.max(1) as f64) as f32
    }

    /// Factor applied to pixel-sized constants
    pub fn scale(&self) -> f32 {
        (self.width as f32 / Self::REFERENCE_WIDTH).min(self.height as f32 / Self::REFERENCE_HEIGHT)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }
}

/// Core trait that all visual styles must implement
pub trait Style: Send {
    fn kind(&self) -> StyleKind;

    /// Returns a human-readable description of this style
    fn description(&self) -> &str;

    /// Paint one frame. `frame` arrives cleared to black.
    fn render(&mut self, ctx: &RenderContext, features: &FeatureFrame, frame: &mut Frame) -> Result<()>;

    /// A fresh instance for rendering frames out of order. Only frame-local
    /// styles can be forked.
    fn fork(&self) -> Option<Box<dyn Style>> {
        None
    }

    fn metadata(&self) -> StyleMetadata {
        StyleMetadata::default()
    }

    /// Drop any state carried between frames
    fn reset(&mut self) {}
}

/// Metadata about a style's capabilities and characteristics
#[derive(Debug, Clone)]
pub struct StyleMetadata {
    /// Output depends only on the frame's own inputs
    pub frame_local: bool,

    /// Estimated performance impact (0.0 = minimal, 1.0 = heavy)
    pub performance_impact: f32,
}

impl Default for StyleMetadata {
    fn default() -> Self {
        Self {
            frame_local: true,
            performance_impact: 0.3,
        }
    }
}

/// Settings shared by all styles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    /// Seed for the particle emitter
    pub particle_seed: u64,

    /// Live particles kept at most; the oldest are dropped first
    pub max_particles: usize,

    /// Meta-style rotation
    pub auto: AutoConfig,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            particle_seed: 0x5EED,
            max_particles: 2000,
            auto: AutoConfig::default(),
        }
    }
}

impl StyleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_particles == 0 {
            return Err(StyleError::InvalidConfig {
                details: "max_particles must be positive".to_string(),
            }
            .into());
        }
        self.auto.validate()
    }
}

/// Block rotation used by the `auto` style
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoConfig {
    /// Frames each style stays on screen
    pub block_length: usize,

    /// Styles cycled through, in order
    pub rotation: Vec<StyleKind>,
}

impl Default for AutoConfig {
    fn default() -> Self {
        Self {
            block_length: 180,
            rotation: vec![
                StyleKind::ParticleSystem,
                StyleKind::GeometricPatterns,
                StyleKind::GradientFlow,
                StyleKind::Spectrum3d,
            ],
        }
    }
}

impl AutoConfig {
    pub fn validate(&self) -> Result<()> {
        if self.block_length == 0 {
            return Err(StyleError::InvalidConfig {
                details: "auto.block_length must be positive".to_string(),
            }
            .into());
        }

        if self.rotation.is_empty() {
            return Err(StyleError::InvalidConfig {
                details: "auto.rotation must name at least one style".to_string(),
            }
            .into());
        }

        if self.rotation.iter().any(StyleKind::is_auto) {
            return Err(StyleError::InvalidConfig {
                details: "auto.rotation cannot contain auto".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_names_round_trip() {
        for kind in StyleKind::ALL {
            assert_eq!(kind.name().parse::<StyleKind>().unwrap(), kind);
        }
        assert_eq!("auto-generate".parse::<StyleKind>().unwrap(), StyleKind::Auto);
        assert_eq!("Particle_System".parse::<StyleKind>().unwrap(), StyleKind::ParticleSystem);
        assert!("vaporwave".parse::<StyleKind>().is_err());
    }

    #[test]
    fn test_style_kind_serde_names() {
        #[derive(Serialize, Deserialize)]
        struct Holder {
            style: StyleKind,
        }

        let text = toml::to_string(&Holder { style: StyleKind::Spectrum3d }).unwrap();
        assert!(text.contains("spectrum-3d"));

        let parsed: Holder = toml::from_str("style = \"auto-generate\"").unwrap();
        assert_eq!(parsed.style, StyleKind::Auto);
    }

    #[test]
    fn test_render_context_time_and_scale() {
        let ctx = RenderContext {
            frame_index: 45,
            frame_rate: 30,
            width: 640,
            height: 360,
        };
        assert!((ctx.time() - 1.5).abs() < 1e-6);
        assert!((ctx.scale() - 0.5).abs() < 1e-6);
        assert_eq!(ctx.center(), (320.0, 180.0));
    }

    #[test]
    fn test_auto_config_validation() {
        assert!(AutoConfig::default().validate().is_ok());

        let with_auto = AutoConfig {
            rotation: vec![StyleKind::Auto],
            ..Default::default()
        };
        assert!(with_auto.validate().is_err());

        let zero = AutoConfig {
            block_length: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }
}
