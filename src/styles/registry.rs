use std::collections::HashMap;

use crate::{
    error::{Result, StyleError},
    styles::{
        AutoStyle, GeometricPatternsStyle, GradientFlowStyle, ParticleSystemStyle, Spectrum3dStyle, Style,
        StyleConfig, StyleKind, WaveformAnimationStyle,
    },
};

type StyleFactory = fn(&StyleConfig) -> Box<dyn Style>;

/// Registry of the built-in visual styles
///
/// Every job gets fresh instances, so state such as live particles never
/// leaks from one job into the next.
pub struct StyleRegistry {
    config: StyleConfig,
    styles: HashMap<StyleKind, StyleFactory>,
}

impl StyleRegistry {
    /// Create a new style registry with all built-in styles
    pub fn new(config: StyleConfig) -> Self {
        let mut registry = Self {
            config,
            styles: HashMap::new(),
        };

        registry.register_builtin_styles();
        registry
    }

    fn register_builtin_styles(&mut self) {
        self.styles.insert(StyleKind::ParticleSystem, |config| {
            Box::new(ParticleSystemStyle::new(config.particle_seed, config.max_particles))
        });
        self.styles
            .insert(StyleKind::GeometricPatterns, |_| Box::new(GeometricPatternsStyle::new()));
        self.styles
            .insert(StyleKind::WaveformAnimation, |_| Box::new(WaveformAnimationStyle::new()));
        self.styles
            .insert(StyleKind::GradientFlow, |_| Box::new(GradientFlowStyle::new()));
        self.styles
            .insert(StyleKind::Spectrum3d, |_| Box::new(Spectrum3dStyle::new()));
    }

    pub fn config(&self) -> &StyleConfig {
        &self.config
    }

    /// Create a fresh instance of the requested style
    pub fn create(&self, kind: StyleKind) -> Result<Box<dyn Style>> {
        if kind.is_auto() {
            let auto = AutoStyle::new(&self.config.auto, |inner| self.create_concrete(inner))?;
            return Ok(Box::new(auto));
        }
        self.create_concrete(kind)
    }

    /// Look a style up by its kebab-case name
    pub fn get_style(&self, name: &str) -> Result<Box<dyn Style>> {
        self.create(name.parse()?)
    }

    fn create_concrete(&self, kind: StyleKind) -> Result<Box<dyn Style>> {
        let factory = self.styles.get(&kind).ok_or_else(|| StyleError::NotFound {
            name: kind.to_string(),
        })?;
        Ok(factory(&self.config))
    }

    /// Get all available style names, `auto` last
    pub fn available_styles(&self) -> Vec<StyleKind> {
        StyleKind::ALL
            .into_iter()
            .filter(|kind| kind.is_auto() || self.styles.contains_key(kind))
            .collect()
    }

    pub fn has_style(&self, kind: StyleKind) -> bool {
        kind.is_auto() || self.styles.contains_key(&kind)
    }

    /// Number of concrete (non-meta) styles
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new(StyleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_styles_available() {
        let registry = StyleRegistry::default();

        for kind in StyleKind::ALL {
            assert!(registry.has_style(kind));
        }
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.available_styles().len(), 6);
    }

    #[test]
    fn test_get_style() {
        let registry = StyleRegistry::default();

        let style = registry.get_style("gradient-flow").unwrap();
        assert_eq!(style.kind(), StyleKind::GradientFlow);

        let auto = registry.get_style("auto-generate").unwrap();
        assert_eq!(auto.kind(), StyleKind::Auto);

        assert!(registry.get_style("vhs").is_err());
    }

    #[test]
    fn test_frame_locality_of_builtins() {
        let registry = StyleRegistry::default();
        let particles = registry.create(StyleKind::ParticleSystem).unwrap();
        assert!(!particles.metadata().frame_local);

        for kind in [StyleKind::GeometricPatterns, StyleKind::GradientFlow, StyleKind::Spectrum3d] {
            let style = registry.create(kind).unwrap();
            assert!(style.metadata().frame_local);
            assert_eq!(style.fork().map(|s| s.kind()), Some(kind));
        }
    }

    #[test]
    fn test_invalid_auto_config_is_rejected() {
        let config = StyleConfig {
            auto: crate::styles::AutoConfig {
                block_length: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(StyleRegistry::new(config).create(StyleKind::Auto).is_err());
    }
}
