//! # Particle System
//!
//! Bursts of particles fired from the centre on every beat. Burst speed
//! follows the bass, particle radius the treble. Particles fade and shift
//! hue as they age, leaving trails that fade over following frames.
//!
//! Particles live across frames, so this style has to see frames in index
//! order and cannot be forked for parallel rendering.

use std::collections::VecDeque;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{
    audio::FeatureFrame,
    error::Result,
    styles::traits::{RenderContext, Style, StyleKind, StyleMetadata},
    video::{paint::Color, types::Frame},
};

/// Particles emitted per beat
pub const BURST_SIZE: usize = 5;

const SPEED: f32 = 20.0;
const DAMPING: f32 = 0.99;
const LIFE_DECAY: f32 = 0.01;
const RADIUS: f32 = 10.0;
/// Share of the previous frame's brightness kept as a trail
const TRAIL_KEEP: f32 = 0.95;

#[derive(Debug, Clone, PartialEq)]
struct Particle {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    life: f32,
    size: f32,
}

pub struct ParticleSystemStyle {
    seed: u64,
    max_particles: usize,
    rng: SmallRng,
    particles: VecDeque<Particle>,
    /// Last drawn frame and its index
    trail: Option<(usize, Frame)>,
}

impl ParticleSystemStyle {
    pub fn new(seed: u64, max_particles: usize) -> Self {
        Self {
            seed,
            max_particles: max_particles.max(1),
            rng: SmallRng::seed_from_u64(seed),
            particles: VecDeque::new(),
            trail: None,
        }
    }

    pub fn live_particles(&self) -> usize {
        self.particles.len()
    }

    fn emit(&mut self, ctx: &RenderContext, bass: f32) {
        let (cx, cy) = ctx.center();
        let speed = bass * SPEED * ctx.scale();

        for _ in 0..BURST_SIZE {
            let particle = Particle {
                x: cx,
                y: cy,
                vx: (self.rng.gen::<f32>() - 0.5) * speed,
                vy: (self.rng.gen::<f32>() - 0.5) * speed,
                life: 1.0,
                size: self.rng.gen::<f32>() * 3.0 + 1.0,
            };
            if self.particles.len() == self.max_particles {
                self.particles.pop_front();
            }
            self.particles.push_back(particle);
        }
    }
}

impl Style for ParticleSystemStyle {
    fn kind(&self) -> StyleKind {
        StyleKind::ParticleSystem
    }

    fn description(&self) -> &str {
        "Beat-triggered particle bursts sized by treble and flung by bass"
    }

    fn render(&mut self, ctx: &RenderContext, features: &FeatureFrame, frame: &mut Frame) -> Result<()> {
        if let Some((index, mut previous)) = self.trail.take() {
            let follows = index + 1 == ctx.frame_index;
            if follows && previous.width() == frame.width() && previous.height() == frame.height() {
                previous.fade(TRAIL_KEEP);
                *frame = previous;
            }
        }

        if features.beat_detected {
            self.emit(ctx, features.bass);
        }

        self.particles.retain(|p| p.life > 0.0);

        let radius_scale = features.treble * RADIUS * ctx.scale();
        for p in self.particles.iter_mut() {
            p.x += p.vx;
            p.y += p.vy;
            p.life -= LIFE_DECAY;
            p.vx *= DAMPING;
            p.vy *= DAMPING;

            if p.life > 0.0 {
                let color = Color::hsl((p.life * 360.0) % 360.0, 0.7, 0.5);
                frame.fill_circle(p.x, p.y, p.size * radius_scale, color, p.life);
            }
        }

        self.trail = Some((ctx.frame_index, frame.clone()));
        Ok(())
    }

    fn metadata(&self) -> StyleMetadata {
        StyleMetadata {
            frame_local: false,
            performance_impact: 0.2,
        }
    }

    fn reset(&mut self) {
        self.rng = SmallRng::seed_from_u64(self.seed);
        self.particles.clear();
        self.trail = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(frame_index: usize) -> RenderContext {
        RenderContext {
            frame_index,
            frame_rate: 30,
            width: 320,
            height: 180,
        }
    }

    fn features(beat: bool) -> FeatureFrame {
        FeatureFrame {
            bass: 0.8,
            mid: 0.4,
            treble: 0.6,
            average_amplitude: 0.3,
            beat_detected: beat,
            ..FeatureFrame::silent(0, 64)
        }
    }

    fn run(style: &mut ParticleSystemStyle, beats: &[bool]) -> Vec<Vec<u8>> {
        beats
            .iter()
            .enumerate()
            .map(|(i, &beat)| {
                let mut frame = Frame::new_black(320, 180);
                style.render(&ctx(i), &features(beat), &mut frame).unwrap();
                frame.into_rgb_bytes()
            })
            .collect()
    }

    #[test]
    fn test_beat_emits_burst() {
        let mut style = ParticleSystemStyle::new(7, 100);
        let mut frame = Frame::new_black(320, 180);
        style.render(&ctx(0), &features(true), &mut frame).unwrap();
        assert_eq!(style.live_particles(), BURST_SIZE);

        let lit = frame.as_image().pixels().filter(|p| p.0 != [0, 0, 0]).count();
        assert!(lit > 0);
    }

    #[test]
    fn test_trails_fade_to_black() {
        let mut style = ParticleSystemStyle::new(7, 100);
        let mut first = Frame::new_black(320, 180);
        style.render(&ctx(0), &features(true), &mut first).unwrap();
        style.particles.clear();

        let mut second = Frame::new_black(320, 180);
        style.render(&ctx(1), &features(false), &mut second).unwrap();
        let before = first.as_rgb_bytes();
        let after = second.as_rgb_bytes();
        assert!(after.iter().any(|&v| v > 0));
        assert!(before.iter().zip(after).all(|(&b, &a)| a <= b));
        assert!(before.iter().zip(after).any(|(&b, &a)| a < b));

        let mut last = second;
        for i in 2..150 {
            last = Frame::new_black(320, 180);
            style.render(&ctx(i), &features(false), &mut last).unwrap();
        }
        assert!(last.as_rgb_bytes().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_trail_only_carries_into_the_next_frame() {
        let mut style = ParticleSystemStyle::new(7, 100);
        let mut first = Frame::new_black(320, 180);
        style.render(&ctx(0), &features(true), &mut first).unwrap();
        style.particles.clear();

        // Resuming after a gap, e.g. when auto mode rotates back
        let mut later = Frame::new_black(320, 180);
        style.render(&ctx(200), &features(false), &mut later).unwrap();
        assert!(later.as_rgb_bytes().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_particles_die_after_hundred_frames() {
        let mut style = ParticleSystemStyle::new(7, 100);
        let mut beats = vec![false; 105];
        beats[0] = true;
        run(&mut style, &beats);
        assert_eq!(style.live_particles(), 0);
    }

    #[test]
    fn test_particle_count_is_capped() {
        let mut style = ParticleSystemStyle::new(1, 12);
        run(&mut style, &[true; 10]);
        assert_eq!(style.live_particles(), 12);
    }

    #[test]
    fn test_same_seed_same_frames() {
        let beats: Vec<bool> = (0..40).map(|i| i % 7 == 0).collect();
        let a = run(&mut ParticleSystemStyle::new(42, 500), &beats);
        let b = run(&mut ParticleSystemStyle::new(42, 500), &beats);
        assert_eq!(a, b);
    }

    #[test]
    fn test_reset_replays_identically() {
        let beats: Vec<bool> = (0..20).map(|i| i % 5 == 0).collect();
        let mut style = ParticleSystemStyle::new(3, 500);
        let first = run(&mut style, &beats);
        style.reset();
        assert_eq!(style.live_particles(), 0);
        assert_eq!(run(&mut style, &beats), first);
    }

    #[test]
    fn test_not_frame_local() {
        let style = ParticleSystemStyle::new(0, 10);
        assert!(!style.metadata().frame_local);
        assert!(style.fork().is_none());
    }
}
