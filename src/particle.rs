//! A single simulated point.
//!
//! Particles are owned by exactly one [`Emitter`](crate::Emitter). Each tick
//! the emitter calls [`Particle::update`], which integrates in a fixed order:
//!
//! 1. Record the current position in the trail (bounded, oldest dropped).
//! 2. `velocity += acceleration`
//! 3. `position += velocity`
//! 4. `acceleration = 0`
//! 5. Accumulate quadratic drag into the acceleration for the next tick.
//! 6. Accumulate gravity the same way.
//! 7. `lifespan -= decay_rate`
//!
//! A particle is dead once its lifespan drops below zero; dead particles are
//! never updated or drawn again.
//!
//! Two cosmetic sub-states exist on top of the physics, neither of which
//! touches integration:
//!
//! - **Flash**: a brief white dot drawn at twice the particle size.
//! - **Glow**: a late-life conversion into a dimming, flickering ember.

use crate::color::{ColorRole, Hsb};
use crate::config::{FadeConfig, FlashConfig, PhysicsConfig, TrailConfig};
use crate::render::Canvas;
use crate::spawn::SpawnRng;
use crate::trail::Trail;
use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Flash {
    elapsed: u32,
    duration: u32,
    color: Hsb,
}

/// Countdown of a converted particle's glow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glow {
    /// Ticks since conversion.
    pub elapsed: u32,
    /// Ticks until the glow reaches zero brightness.
    pub duration: u32,
}

/// A single simulated point with a trail.
///
/// # Example
///
/// ```ignore
/// let spark = Particle::new(Vec2::new(100.0, 200.0), Vec2::new(2.0, -1.0), 300.0)
///     .with_color(Hsb::new(280.0, 80.0, 90.0), ColorRole::PrimaryBurst)
///     .with_size(2.0)
///     .with_trail(40);
/// ```
#[derive(Debug, Clone)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    acceleration: Vec2,
    pub mass: f32,
    pub color: Hsb,
    pub role: ColorRole,
    /// Disc diameter; trails scale from it.
    pub size: f32,
    /// Ticks remaining, also the draw alpha on a 0-100 scale.
    pub lifespan: f32,
    /// Lifespan lost per tick.
    pub decay_rate: f32,
    trail: Trail,
    flash: Option<Flash>,
    glow: Option<Glow>,
}

impl Particle {
    /// Create a white particle with unit size, unit mass and no trail.
    pub fn new(position: Vec2, velocity: Vec2, lifespan: f32) -> Self {
        Self {
            position,
            velocity,
            acceleration: Vec2::ZERO,
            mass: 1.0,
            color: Hsb::WHITE,
            role: ColorRole::MainBurst,
            size: 1.0,
            lifespan,
            decay_rate: 1.0,
            trail: Trail::new(0),
            flash: None,
            glow: None,
        }
    }

    pub fn with_color(mut self, color: Hsb, role: ColorRole) -> Self {
        self.color = color;
        self.role = role;
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_decay(mut self, rate: f32) -> Self {
        self.decay_rate = rate;
        self
    }

    /// Keep up to `length` previous positions for trail rendering.
    pub fn with_trail(mut self, length: usize) -> Self {
        self.trail = Trail::new(length);
        self
    }

    /// Whether the particle has run out of lifespan.
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.lifespan < 0.0
    }

    /// Whether the particle has been turned into a glowing ember.
    #[inline]
    pub fn is_converted(&self) -> bool {
        self.glow.is_some()
    }

    /// Whether the white flash is currently showing.
    #[inline]
    pub fn is_flashing(&self) -> bool {
        self.flash.is_some()
    }

    pub fn glow(&self) -> Option<Glow> {
        self.glow
    }

    pub fn acceleration(&self) -> Vec2 {
        self.acceleration
    }

    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    /// Accumulate a force; it takes effect on the next update.
    #[inline]
    pub fn apply_force(&mut self, force: Vec2) {
        self.acceleration += force / self.mass;
    }

    /// Advance one tick. Does nothing once the particle is dead.
    pub fn update(&mut self, physics: &PhysicsConfig, flash: Option<&FlashConfig>, rng: &mut SpawnRng) {
        if self.is_dead() {
            return;
        }

        self.trail.push(self.position);

        self.velocity += self.acceleration;
        self.position += self.velocity;
        self.acceleration = Vec2::ZERO;

        let drag = self.velocity * (-physics.drag * self.velocity.length_squared());
        self.apply_force(drag);
        self.apply_force(physics.gravity);

        self.lifespan -= self.decay_rate;

        self.update_flash(flash, rng);
    }

    fn update_flash(&mut self, config: Option<&FlashConfig>, rng: &mut SpawnRng) {
        if let Some(flash) = &mut self.flash {
            flash.elapsed += 1;
            if flash.elapsed > flash.duration {
                self.flash = None;
            }
            return;
        }

        let Some(config) = config else {
            return;
        };
        if self.role == config.role
            && self.lifespan < config.below_lifespan
            && self.trail.len() < config.max_trail
            && rng.chance(config.chance)
        {
            self.flash = Some(Flash {
                elapsed: 0,
                duration: config.duration,
                color: config.color,
            });
        }
    }

    /// Turn this particle into a glowing ember: new role and color, a fresh
    /// lifespan and its own countdown.
    pub fn convert_to_glow(&mut self, fade: &FadeConfig) {
        self.role = ColorRole::ConvertedGlow;
        self.color = fade.glow_color;
        self.lifespan = fade.glow_lifespan;
        self.decay_rate = fade.glow_decay;
        self.glow = Some(Glow {
            elapsed: 0,
            duration: fade.glow_duration,
        });
    }

    /// Advance the glow countdown: brightness falls linearly to zero over the
    /// glow duration, with occasional random flicker.
    pub fn advance_glow(&mut self, fade: &FadeConfig, rng: &mut SpawnRng) {
        let Some(glow) = &mut self.glow else {
            return;
        };
        glow.elapsed += 1;

        let progress = if glow.duration == 0 {
            1.0
        } else {
            glow.elapsed as f32 / glow.duration as f32
        };
        let full = fade.glow_color.brightness;
        let mut brightness = (full * (1.0 - progress)).max(0.0);

        if rng.chance(fade.flicker_chance) {
            let flicker = rng.range(-fade.flicker_amount, fade.flicker_amount);
            brightness = (brightness + flicker).clamp(0.0, 100.0);
        }

        self.color = fade.glow_color.with_brightness(brightness);
    }

    /// Draw the trail and the particle head.
    ///
    /// Trail segments run from oldest to newest with width and alpha growing
    /// towards the head. Segments near either end of the trail are skipped
    /// at random, giving a dotted look. `rng` only drives that thinning.
    pub fn render<C: Canvas + ?Sized>(&self, canvas: &mut C, trail: &TrailConfig, rng: &mut SpawnRng) {
        if self.is_dead() {
            return;
        }

        if let Some(flash) = &self.flash {
            canvas.disc(self.position, self.size * 2.0, flash.color.to_rgba(100.0));
        }

        let n = self.trail.len();
        if n > 1 {
            for (i, (from, to)) in self.trail.segments().enumerate() {
                let t = if n > 2 { i as f32 / (n - 2) as f32 } else { 1.0 };

                if (t < trail.tail_fraction || t > 1.0 - trail.tail_fraction)
                    && rng.chance(trail.skip_chance)
                {
                    continue;
                }

                let k = trail.floor + t * (1.0 - trail.floor);
                canvas.line(from, to, self.color.to_rgba(self.lifespan * k), self.size * k);
            }
        }

        canvas.disc(self.position, self.size, self.color.to_rgba(self.lifespan));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingCanvas;

    fn still_air() -> PhysicsConfig {
        PhysicsConfig {
            drag: 0.0,
            gravity: Vec2::ZERO,
            ..PhysicsConfig::default()
        }
    }

    #[test]
    fn test_lifespan_hundred_dies_on_tick_101() {
        let physics = PhysicsConfig::default();
        let mut rng = SpawnRng::from_seed(0);
        let mut p = Particle::new(Vec2::ZERO, Vec2::ZERO, 100.0);

        for _ in 0..100 {
            p.update(&physics, None, &mut rng);
            assert!(!p.is_dead());
        }
        assert_eq!(p.lifespan, 0.0);

        p.update(&physics, None, &mut rng);
        assert!(p.is_dead());
    }

    #[test]
    fn test_dead_particle_is_frozen() {
        let physics = PhysicsConfig::default();
        let mut rng = SpawnRng::from_seed(0);
        let mut p = Particle::new(Vec2::ZERO, Vec2::ONE, 0.5);
        p.update(&physics, None, &mut rng);
        assert!(p.is_dead());

        let snapshot = (p.position, p.lifespan, p.trail().len());
        p.update(&physics, None, &mut rng);
        assert_eq!(snapshot, (p.position, p.lifespan, p.trail().len()));
    }

    #[test]
    fn test_forces_apply_next_tick() {
        let physics = PhysicsConfig {
            drag: 0.0,
            ..PhysicsConfig::default()
        };
        let mut rng = SpawnRng::from_seed(0);
        let mut p = Particle::new(Vec2::ZERO, Vec2::ZERO, 100.0);

        p.update(&physics, None, &mut rng);
        assert_eq!(p.position, Vec2::ZERO);
        assert_eq!(p.acceleration(), physics.gravity);

        p.update(&physics, None, &mut rng);
        assert_eq!(p.velocity, physics.gravity);
        assert_eq!(p.position, physics.gravity);
    }

    #[test]
    fn test_drag_opposes_velocity() {
        let physics = PhysicsConfig {
            drag: 0.01,
            gravity: Vec2::ZERO,
            ..PhysicsConfig::default()
        };
        let mut rng = SpawnRng::from_seed(0);
        let mut p = Particle::new(Vec2::ZERO, Vec2::new(3.0, 0.0), 100.0);

        p.update(&physics, None, &mut rng);
        // force = -v * |v|² * k = -(3 * 9 * 0.01)
        assert!((p.acceleration().x + 0.27).abs() < 1e-5);

        p.update(&physics, None, &mut rng);
        assert!(p.velocity.x < 3.0);
        assert!(p.velocity.x > 0.0);
    }

    #[test]
    fn test_heavier_particle_accelerates_less() {
        let physics = PhysicsConfig::default();
        let mut rng = SpawnRng::from_seed(0);
        let mut light = Particle::new(Vec2::ZERO, Vec2::ZERO, 100.0);
        let mut heavy = Particle::new(Vec2::ZERO, Vec2::ZERO, 100.0).with_mass(4.0);

        light.update(&physics, None, &mut rng);
        heavy.update(&physics, None, &mut rng);
        assert!((heavy.acceleration().y * 4.0 - light.acceleration().y).abs() < 1e-6);
    }

    #[test]
    fn test_trail_never_exceeds_bound() {
        let mut rng = SpawnRng::from_seed(0);
        let mut p = Particle::new(Vec2::ZERO, Vec2::new(1.0, 0.0), 500.0).with_trail(40);
        for _ in 0..200 {
            p.update(&still_air(), None, &mut rng);
            assert!(p.trail().len() <= 40);
        }
        assert_eq!(p.trail().len(), 40);
        assert_eq!(p.trail().newest(), Some(Vec2::new(199.0, 0.0)));
    }

    #[test]
    fn test_render_trail_grows_towards_head() {
        let trail = TrailConfig {
            skip_chance: 0.0,
            ..TrailConfig::default()
        };
        let mut rng = SpawnRng::from_seed(0);
        let mut p = Particle::new(Vec2::ZERO, Vec2::new(1.0, 0.0), 100.0)
            .with_size(4.0)
            .with_trail(10);
        for _ in 0..10 {
            p.update(&still_air(), None, &mut rng);
        }

        let mut canvas = RecordingCanvas::new();
        p.render(&mut canvas, &trail, &mut rng);

        let widths: Vec<f32> = canvas.lines().map(|l| l.width).collect();
        assert_eq!(widths.len(), 9);
        assert!(widths.windows(2).all(|w| w[0] < w[1]));
        assert!((widths[0] - 0.4).abs() < 1e-5);
        assert!((widths[8] - 4.0).abs() < 1e-5);

        let alphas: Vec<f32> = canvas.lines().map(|l| l.color.w).collect();
        assert!(alphas.windows(2).all(|w| w[0] <= w[1]));

        // Head disc comes last.
        assert_eq!(canvas.disc_count(), 1);
        let head = canvas.discs().next().unwrap();
        assert_eq!(head.center, p.position);
        assert_eq!(head.diameter, 4.0);
    }

    #[test]
    fn test_render_thins_tail_segments() {
        let trail = TrailConfig {
            skip_chance: 1.0,
            ..TrailConfig::default()
        };
        let mut rng = SpawnRng::from_seed(0);
        let mut p = Particle::new(Vec2::ZERO, Vec2::new(1.0, 0.0), 100.0).with_trail(11);
        for _ in 0..11 {
            p.update(&still_air(), None, &mut rng);
        }

        let mut canvas = RecordingCanvas::new();
        p.render(&mut canvas, &trail, &mut rng);

        // 10 segments at t = i / 9; only i = 3..=6 sit inside the middle band.
        assert_eq!(canvas.line_count(), 4);
    }

    #[test]
    fn test_two_point_trail_draws_full_width() {
        let trail = TrailConfig {
            skip_chance: 0.0,
            ..TrailConfig::default()
        };
        let mut rng = SpawnRng::from_seed(0);
        let mut p = Particle::new(Vec2::ZERO, Vec2::new(1.0, 0.0), 100.0)
            .with_size(3.0)
            .with_trail(2);
        p.update(&still_air(), None, &mut rng);
        p.update(&still_air(), None, &mut rng);

        let mut canvas = RecordingCanvas::new();
        p.render(&mut canvas, &trail, &mut rng);
        let line = canvas.lines().next().unwrap();
        assert!(line.width.is_finite());
        assert_eq!(line.width, 3.0);
    }

    #[test]
    fn test_flash_on_spent_main_burst_particle() {
        let flash = FlashConfig {
            chance: 1.0,
            duration: 3,
            ..FlashConfig::default()
        };
        let mut rng = SpawnRng::from_seed(0);
        let mut p = Particle::new(Vec2::ZERO, Vec2::ZERO, 20.0)
            .with_color(Hsb::new(60.0, 20.0, 100.0), ColorRole::MainBurst)
            .with_size(2.0);

        p.update(&still_air(), Some(&flash), &mut rng);
        assert!(p.is_flashing());

        let mut canvas = RecordingCanvas::new();
        p.render(&mut canvas, &TrailConfig::default(), &mut rng);
        let discs: Vec<_> = canvas.discs().collect();
        assert_eq!(discs.len(), 2);
        assert_eq!(discs[0].diameter, 4.0);
        assert_eq!(discs[0].color.w, 1.0);

        for _ in 0..4 {
            p.update(&still_air(), Some(&flash), &mut rng);
        }
        assert!(!p.is_flashing());
    }

    #[test]
    fn test_flash_ignores_other_roles() {
        let flash = FlashConfig {
            chance: 1.0,
            ..FlashConfig::default()
        };
        let mut rng = SpawnRng::from_seed(0);
        let mut p = Particle::new(Vec2::ZERO, Vec2::ZERO, 20.0)
            .with_color(Hsb::new(20.0, 90.0, 95.0), ColorRole::MicroCluster);
        p.update(&still_air(), Some(&flash), &mut rng);
        assert!(!p.is_flashing());
    }

    #[test]
    fn test_flash_and_glow_leave_motion_alone() {
        let physics = PhysicsConfig::default();
        let flash = FlashConfig {
            chance: 1.0,
            ..FlashConfig::default()
        };
        let fade = FadeConfig {
            flicker_chance: 1.0,
            ..FadeConfig::default()
        };
        let spark = || {
            Particle::new(Vec2::new(10.0, 20.0), Vec2::new(3.0, -4.0), 20.0)
                .with_color(Hsb::new(60.0, 20.0, 100.0), ColorRole::MainBurst)
        };
        let mut lit = spark();
        let mut plain = spark();
        let mut rng = SpawnRng::from_seed(3);
        let mut other = SpawnRng::from_seed(4);

        for _ in 0..5 {
            lit.update(&physics, Some(&flash), &mut rng);
            plain.update(&physics, None, &mut other);
        }
        assert!(lit.is_flashing());
        assert_eq!(lit.position, plain.position);
        assert_eq!(lit.velocity, plain.velocity);

        lit.convert_to_glow(&fade);
        for _ in 0..5 {
            lit.advance_glow(&fade, &mut rng);
            lit.update(&physics, Some(&flash), &mut rng);
            plain.update(&physics, None, &mut other);
        }
        assert!(lit.is_converted());
        assert_eq!(lit.position, plain.position);
        assert_eq!(lit.velocity, plain.velocity);
    }

    #[test]
    fn test_glow_dims_over_its_duration() {
        let fade = FadeConfig {
            flicker_chance: 0.0,
            glow_duration: 10,
            ..FadeConfig::default()
        };
        let mut rng = SpawnRng::from_seed(0);
        let mut p = Particle::new(Vec2::ZERO, Vec2::ZERO, 20.0).with_size(2.0);
        p.convert_to_glow(&fade);

        assert!(p.is_converted());
        assert_eq!(p.role, ColorRole::ConvertedGlow);
        assert_eq!(p.lifespan, fade.glow_lifespan);
        assert_eq!(p.decay_rate, fade.glow_decay);

        let mut last = f32::MAX;
        for _ in 0..10 {
            p.advance_glow(&fade, &mut rng);
            assert!(p.color.brightness < last);
            last = p.color.brightness;
        }
        assert_eq!(p.color.brightness, 0.0);
        assert_eq!(p.color.hue, fade.glow_color.hue);
    }

    #[test]
    fn test_glow_flicker_stays_in_range() {
        let fade = FadeConfig {
            flicker_chance: 1.0,
            ..FadeConfig::default()
        };
        let mut rng = SpawnRng::from_seed(5);
        let mut p = Particle::new(Vec2::ZERO, Vec2::ZERO, 20.0);
        p.convert_to_glow(&fade);
        for _ in 0..400 {
            p.advance_glow(&fade, &mut rng);
            assert!((0.0..=100.0).contains(&p.color.brightness));
        }
    }
}
