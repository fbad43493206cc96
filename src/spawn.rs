//! Random source for spawning and stochastic effects.
//!
//! Every random draw in the simulation goes through a [`SpawnRng`]. Seed it
//! and the whole run becomes reproducible.

use glam::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// Uniform random source with helpers for common spawn patterns.
///
/// ```ignore
/// let mut rng = SpawnRng::from_seed(7);
/// let velocity = rng.burst_velocity((2.0, 5.0));   // random direction
/// let jitter = rng.range(-3.0, 3.0);
/// if rng.chance(0.3) { /* ... */ }
/// ```
#[derive(Debug, Clone)]
pub struct SpawnRng {
    rng: SmallRng,
}

impl SpawnRng {
    /// Create a reproducible source from a seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Create a source seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Draw a seed for a child source.
    #[inline]
    pub fn next_seed(&mut self) -> u64 {
        self.rng.gen()
    }

    /// Random f32 between 0.0 and 1.0.
    #[inline]
    pub fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Random f32 in `min..max`.
    ///
    /// An empty or inverted range yields `min` instead of panicking.
    #[inline]
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        if max > min {
            self.rng.gen_range(min..max)
        } else {
            min
        }
    }

    /// Random f32 within a `(min, max)` pair as stored in configs.
    #[inline]
    pub fn span(&mut self, span: (f32, f32)) -> f32 {
        self.range(span.0, span.1)
    }

    /// `true` with probability `p`.
    #[inline]
    pub fn chance(&mut self, p: f32) -> bool {
        self.random() < p
    }

    /// Random angle in `[0, 2π)`.
    #[inline]
    pub fn angle(&mut self) -> f32 {
        self.range(0.0, TAU)
    }

    /// Velocity for a burst particle.
    ///
    /// Angle is uniform in `[0, 2π)` and speed uniform in `speed`; the result
    /// is `(speed * cos(angle), speed * sin(angle))`.
    pub fn burst_velocity(&mut self, speed: (f32, f32)) -> Vec2 {
        let angle = self.angle();
        let speed = self.span(speed);
        Vec2::new(speed * angle.cos(), speed * angle.sin())
    }

    /// Vector with each component uniform in `-extent..extent`.
    pub fn jitter(&mut self, extent: f32) -> Vec2 {
        Vec2::new(self.range(-extent, extent), self.range(-extent, extent))
    }
}
