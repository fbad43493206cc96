//! Fireworks as staged particle emitters.
//!
//! An [`Emitter`] is one firework. It owns its particles and runs a
//! three-stage state machine:
//!
//! | Stage | Behavior | Exit |
//! |-------|----------|------|
//! | [`Stage::Ascending`] | Climbs on a snaking path, leaving one exhaust particle per tick | `stage_timer >= duration` |
//! | [`Stage::Exploding`] | Primary burst, main burst, sparkle bursts, micro clusters, late color shift | `stage_timer >= duration` |
//! | [`Stage::Fading`] | No spawning; particles shrink, linger and sometimes turn into glowing embers | terminal |
//!
//! Each tick the stage step runs first, then every particle is integrated and
//! dead particles are pruned. Drawing is a separate pass ([`Emitter::render`]).
//!
//! An emitter is finished once it is fading and has no particles left. Fading
//! particles decay slowly, so this usually happens well after the nominal
//! fade duration.
//!
//! # Example
//!
//! ```ignore
//! let config = Arc::new(FireworkConfig::compact());
//! let mut firework = Emitter::new(EmitterId(0), Vec2::new(400.0, 600.0), config, 7);
//!
//! while !firework.is_dead() {
//!     firework.advance();
//!     firework.render(&mut canvas);
//! }
//! ```

use crate::color::ColorRole;
use crate::config::{BurstConfig, FireworkConfig};
use crate::particle::Particle;
use crate::render::Canvas;
use crate::spawn::SpawnRng;
use glam::Vec2;
use std::fmt;
use std::sync::Arc;

/// Identifier of an emitter, unique within one [`FireworkSystem`](crate::FireworkSystem).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EmitterId(pub u64);

impl fmt::Display for EmitterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "firework #{}", self.0)
    }
}

/// Lifecycle stage of an emitter. Stages only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Ascending,
    Exploding,
    Fading,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Ascending => write!(f, "ascending"),
            Stage::Exploding => write!(f, "exploding"),
            Stage::Fading => write!(f, "fading"),
        }
    }
}

/// One firework: an origin, a stage machine and the particles it spawned.
pub struct Emitter {
    id: EmitterId,
    origin: Vec2,
    stage: Stage,
    stage_timer: u32,
    stage_duration: u32,
    particles: Vec<Particle>,
    config: Arc<FireworkConfig>,
    sim_rng: SpawnRng,
    render_rng: SpawnRng,
}

impl Emitter {
    /// Create an ascending firework at `origin`.
    ///
    /// `seed` drives two independent random streams: one for spawning and
    /// effects, one for stochastic trail thinning. Rendering therefore never
    /// changes what the simulation does.
    pub fn new(id: EmitterId, origin: Vec2, config: Arc<FireworkConfig>, seed: u64) -> Self {
        let mut seeder = SpawnRng::from_seed(seed);
        let sim_rng = SpawnRng::from_seed(seeder.next_seed());
        let render_rng = SpawnRng::from_seed(seeder.next_seed());
        Self {
            id,
            origin,
            stage: Stage::Ascending,
            stage_timer: 0,
            stage_duration: config.ascent.duration,
            particles: Vec::new(),
            config,
            sim_rng,
            render_rng,
        }
    }

    pub fn id(&self) -> EmitterId {
        self.id
    }

    /// Current launch or explosion point.
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Ticks spent in the current stage.
    pub fn stage_timer(&self) -> u32 {
        self.stage_timer
    }

    /// Length of the current stage in ticks. Nominal for [`Stage::Fading`].
    pub fn stage_duration(&self) -> u32 {
        self.stage_duration
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn config(&self) -> &FireworkConfig {
        &self.config
    }

    /// Whether the firework has finished: fading with no particles left.
    pub fn is_dead(&self) -> bool {
        self.stage == Stage::Fading && self.particles.is_empty()
    }

    /// Advance one tick: stage step, particle integration, pruning.
    ///
    /// Returns the new stage if this tick caused a transition.
    pub fn advance(&mut self) -> Option<Stage> {
        let transition = match self.stage {
            Stage::Ascending => self.step_ascent(),
            Stage::Exploding => self.step_explosion(),
            Stage::Fading => {
                self.step_fade();
                None
            }
        };

        let config = &self.config;
        let rng = &mut self.sim_rng;
        for particle in &mut self.particles {
            particle.update(&config.physics, config.flash.as_ref(), rng);
        }
        self.particles.retain(|p| !p.is_dead());

        if let Some(stage) = transition {
            log::debug!(
                "{} entered {} with {} particles",
                self.id,
                stage,
                self.particles.len()
            );
        }
        transition
    }

    /// Draw every live particle.
    pub fn render<C: Canvas + ?Sized>(&mut self, canvas: &mut C) {
        for particle in &self.particles {
            particle.render(canvas, &self.config.trail, &mut self.render_rng);
        }
    }

    // =========================================================================
    // STAGE STEPS
    // =========================================================================

    fn step_ascent(&mut self) -> Option<Stage> {
        let ascent = &self.config.ascent;
        let progress = self.stage_timer as f32 / self.stage_duration.max(1) as f32;
        let lifespan = ascent.lifespan.0 + (ascent.lifespan.1 - ascent.lifespan.0) * progress;

        let rng = &mut self.sim_rng;
        let position = Vec2::new(self.origin.x + rng.range(-ascent.jitter, ascent.jitter), self.origin.y);
        let velocity = rng.jitter(ascent.drift);
        let size = rng.span(ascent.size);
        let exhaust = self
            .make_particle(position, velocity, lifespan)
            .with_color(ascent.color, ColorRole::AscentTrail)
            .with_size(size);
        self.particles.push(exhaust);

        let ascent = &self.config.ascent;
        self.origin.y -= ascent.rise_step;
        self.origin.x += (self.stage_timer as f32 * ascent.sway_frequency).sin() * ascent.sway_amplitude;

        self.stage_timer += 1;
        if self.stage_timer >= self.stage_duration {
            self.enter(Stage::Exploding, self.config.explosion.duration);
            return Some(Stage::Exploding);
        }
        None
    }

    fn step_explosion(&mut self) -> Option<Stage> {
        let config = Arc::clone(&self.config);
        let explosion = &config.explosion;
        let t = self.stage_timer;

        if t == explosion.primary.at {
            self.burst(self.origin, &explosion.primary.burst);
        }
        if t == explosion.main.at {
            self.burst(self.origin, &explosion.main.burst);
        } else if let Some(sparkle) = &explosion.sparkle {
            if sparkle.window.fires_at(t) {
                self.burst(self.origin, &sparkle.burst);
            }
        }

        if let Some(micro) = &explosion.micro {
            if micro.window.fires_at(t) {
                let offset = Vec2::new(self.sim_rng.span(micro.offset_x), self.sim_rng.span(micro.offset_y));
                self.burst(self.origin + offset, &micro.burst);
            }
        }

        if let Some(shift) = &explosion.color_shift {
            if t > shift.after {
                let span = explosion.duration.saturating_sub(shift.progress_from).max(1) as f32;
                let progress = ((t as f32 - shift.progress_from as f32) / span).clamp(0.0, 1.0);
                for particle in &mut self.particles {
                    if let Some(rule) = shift.rules.iter().find(|r| r.role == particle.role) {
                        particle.color = rule.from.lerp(rule.to, progress);
                    }
                }
            }
        }

        self.stage_timer += 1;
        if self.stage_timer >= self.stage_duration {
            self.enter(Stage::Fading, config.fade.duration);
            let decay = config.fade.decay;
            for particle in &mut self.particles {
                particle.decay_rate = decay;
            }
            return Some(Stage::Fading);
        }
        None
    }

    fn step_fade(&mut self) {
        let fade = &self.config.fade;
        self.stage_timer += 1;

        if self.stage_timer > fade.convert_after {
            let rng = &mut self.sim_rng;
            for particle in &mut self.particles {
                if !particle.is_converted()
                    && particle.lifespan > 0.0
                    && particle.lifespan < fade.convert_below
                    && rng.chance(fade.convert_chance)
                {
                    particle.convert_to_glow(fade);
                }
                particle.advance_glow(fade, rng);
            }
        }

        for particle in &mut self.particles {
            if !particle.is_converted() {
                particle.size = (particle.size - fade.shrink).max(fade.min_size);
            }
        }
    }

    // =========================================================================
    // SPAWNING
    // =========================================================================

    fn enter(&mut self, stage: Stage, duration: u32) {
        self.stage = stage;
        self.stage_timer = 0;
        self.stage_duration = duration;
    }

    fn burst(&mut self, center: Vec2, burst: &BurstConfig) {
        self.particles.reserve(burst.count as usize);
        for _ in 0..burst.count {
            let velocity = self.sim_rng.burst_velocity(burst.speed) * burst.speed_scale;
            let size = self.sim_rng.span(burst.size);
            let lifespan = self.sim_rng.span(burst.lifespan);
            let particle = self
                .make_particle(center, velocity, lifespan)
                .with_color(burst.color, burst.role)
                .with_size(size);
            self.particles.push(particle);
        }
    }

    fn make_particle(&self, position: Vec2, velocity: Vec2, lifespan: f32) -> Particle {
        Particle::new(position, velocity, lifespan)
            .with_mass(self.config.physics.mass)
            .with_decay(self.config.physics.decay)
            .with_trail(self.config.trail.length)
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("stage", &self.stage)
            .field("stage_timer", &self.stage_timer)
            .field("particles", &self.particles.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Hsb;
    use crate::render::RecordingCanvas;

    fn compact() -> Arc<FireworkConfig> {
        Arc::new(FireworkConfig::compact())
    }

    fn count_role(emitter: &Emitter, role: ColorRole) -> usize {
        emitter.particles().iter().filter(|p| p.role == role).count()
    }

    #[test]
    fn test_ascent_spawns_one_exhaust_per_tick() {
        let mut emitter = Emitter::new(EmitterId(0), Vec2::new(100.0, 500.0), compact(), 1);
        for tick in 1..=10 {
            emitter.advance();
            assert_eq!(emitter.particle_count(), tick);
        }
        assert_eq!(count_role(&emitter, ColorRole::AscentTrail), 10);
    }

    #[test]
    fn test_ascent_moves_origin_up_on_snaking_path() {
        let config = compact();
        let mut emitter = Emitter::new(EmitterId(0), Vec2::new(100.0, 500.0), Arc::clone(&config), 1);
        let ascent = &config.ascent;

        let mut expected_x = 100.0;
        for timer in 0..ascent.duration {
            expected_x += (timer as f32 * ascent.sway_frequency).sin() * ascent.sway_amplitude;
        }
        for _ in 0..ascent.duration {
            emitter.advance();
        }

        let expected_y = 500.0 - ascent.duration as f32 * ascent.rise_step;
        assert!((emitter.origin().y - expected_y).abs() < 1e-3);
        assert!((emitter.origin().x - expected_x).abs() < 1e-3);
    }

    #[test]
    fn test_exhaust_lifespan_shrinks_across_ascent() {
        let mut config = FireworkConfig::compact();
        config.physics.decay = 1e-6;
        let mut emitter = Emitter::new(EmitterId(0), Vec2::new(0.0, 500.0), Arc::new(config), 1);
        for _ in 0..20 {
            emitter.advance();
        }
        let lifespans: Vec<f32> = emitter.particles().iter().map(|p| p.lifespan).collect();
        assert!(lifespans.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_stage_transitions_reset_timer() {
        let config = compact();
        let mut emitter = Emitter::new(EmitterId(0), Vec2::new(100.0, 500.0), Arc::clone(&config), 1);

        let mut transitions = Vec::new();
        for tick in 1..=(config.ascent.duration + config.explosion.duration) {
            if let Some(stage) = emitter.advance() {
                assert_eq!(emitter.stage_timer(), 0);
                transitions.push((tick, stage));
            }
        }

        assert_eq!(
            transitions,
            vec![
                (config.ascent.duration, Stage::Exploding),
                (config.ascent.duration + config.explosion.duration, Stage::Fading),
            ]
        );
        assert_eq!(emitter.stage_duration(), config.fade.duration);
    }

    #[test]
    fn test_primary_and_main_burst_counts() {
        let mut config = FireworkConfig::compact();
        config.explosion.sparkle = None;
        config.explosion.micro = None;
        let config = Arc::new(config);
        let mut emitter = Emitter::new(EmitterId(0), Vec2::new(100.0, 500.0), Arc::clone(&config), 3);

        for _ in 0..config.ascent.duration {
            emitter.advance();
        }
        emitter.advance();
        assert_eq!(
            count_role(&emitter, ColorRole::PrimaryBurst),
            config.explosion.primary.burst.count as usize
        );

        while emitter.stage_timer() < config.explosion.main.at {
            emitter.advance();
        }
        assert_eq!(count_role(&emitter, ColorRole::MainBurst), 0);
        emitter.advance();
        assert_eq!(
            count_role(&emitter, ColorRole::MainBurst),
            config.explosion.main.burst.count as usize
        );
    }

    #[test]
    fn test_sparkle_skips_main_burst_tick() {
        let mut config = FireworkConfig::compact();
        config.explosion.primary.burst.count = 0;
        config.explosion.micro = None;
        config.explosion.color_shift = None;
        config.explosion.main.at = 60;
        config.explosion.main.burst.count = 7;
        config.explosion.main.burst.lifespan = (1000.0, 1000.0);
        if let Some(sparkle) = config.explosion.sparkle.as_mut() {
            sparkle.window = crate::config::TickWindow::new(30, 120, 20);
            sparkle.burst.count = 3;
            sparkle.burst.lifespan = (1000.0, 1000.0);
        }
        let config = Arc::new(config);
        let mut emitter = Emitter::new(EmitterId(0), Vec2::ZERO, Arc::clone(&config), 3);
        for _ in 0..config.ascent.duration {
            emitter.advance();
        }
        emitter.particles.clear();

        for _ in 0..config.explosion.duration {
            emitter.advance();
        }
        // Sparkles at 40, 80, 100; 60 belongs to the main burst.
        assert_eq!(count_role(&emitter, ColorRole::MainBurst), 7 + 3 * 3);
    }

    #[test]
    fn test_micro_clusters_spawn_offset_from_origin() {
        let mut config = FireworkConfig::compact();
        config.explosion.primary.burst.count = 0;
        config.explosion.main.burst.count = 0;
        config.explosion.sparkle = None;
        let config = Arc::new(config);
        let mut emitter = Emitter::new(EmitterId(0), Vec2::new(500.0, 500.0), Arc::clone(&config), 11);
        for _ in 0..config.ascent.duration {
            emitter.advance();
        }
        emitter.particles.clear();
        let center = emitter.origin();

        let micro = config.explosion.micro.clone().unwrap();
        while emitter.stage_timer() <= micro.window.after + micro.window.every {
            emitter.advance();
        }
        let cluster: Vec<&Particle> = emitter
            .particles()
            .iter()
            .filter(|p| p.role == ColorRole::MicroCluster)
            .collect();
        assert_eq!(cluster.len(), micro.burst.count as usize);

        // All members share one cluster center within the offset range.
        let first = cluster[0].trail().oldest().unwrap();
        assert!(cluster.iter().all(|p| p.trail().oldest() == Some(first)));
        let offset = first - center;
        assert!((micro.offset_x.0..=micro.offset_x.1).contains(&offset.x));
        assert!((micro.offset_y.0..=micro.offset_y.1).contains(&offset.y));
    }

    #[test]
    fn test_color_shift_only_touches_ruled_roles() {
        let config = compact();
        let mut emitter = Emitter::new(EmitterId(0), Vec2::new(500.0, 500.0), Arc::clone(&config), 5);
        let shift = config.explosion.color_shift.clone().unwrap();

        for _ in 0..config.ascent.duration {
            emitter.advance();
        }
        while emitter.stage_timer() <= shift.after + 1 {
            emitter.advance();
        }

        let rule = &shift.rules[0];
        for particle in emitter.particles() {
            match particle.role {
                ColorRole::MainBurst if !particle.is_flashing() => {
                    assert!(particle.color.saturation > rule.from.saturation);
                    assert!(particle.color.saturation < rule.to.saturation);
                }
                ColorRole::MicroCluster => {
                    assert_eq!(particle.color, config.explosion.micro.as_ref().unwrap().burst.color);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_micro_clusters_turn_red_with_their_rule() {
        use crate::config::ColorShiftRule;

        let mut config = FireworkConfig::compact();
        config.explosion.micro.as_mut().unwrap().burst.lifespan = (400.0, 400.0);
        config.explosion.color_shift.as_mut().unwrap().rules =
            vec![ColorShiftRule::white_gold_to_gold(), ColorShiftRule::red_gold_to_red()];
        let config = Arc::new(config);
        let mut emitter = Emitter::new(EmitterId(0), Vec2::new(500.0, 500.0), Arc::clone(&config), 6);
        for _ in 0..config.ascent.duration {
            emitter.advance();
        }
        while emitter.stage() == Stage::Exploding {
            emitter.advance();
        }

        let rule = ColorShiftRule::red_gold_to_red();
        let cluster: Vec<&Particle> = emitter
            .particles()
            .iter()
            .filter(|p| p.role == ColorRole::MicroCluster)
            .collect();
        assert!(!cluster.is_empty());
        for particle in cluster {
            assert!(particle.color.hue < 1.0);
            assert!(particle.color.hue >= rule.to.hue);
            assert!(particle.color.saturation > 99.0);
        }
    }

    #[test]
    fn test_fading_slows_decay_and_shrinks() {
        let mut config = FireworkConfig::compact();
        config.explosion.main.burst.lifespan = (400.0, 500.0);
        config.explosion.sparkle = None;
        config.fade.convert_chance = 0.0;
        let config = Arc::new(config);
        let mut emitter = Emitter::new(EmitterId(0), Vec2::new(0.0, 5000.0), Arc::clone(&config), 2);
        for _ in 0..(config.ascent.duration + config.explosion.duration) {
            emitter.advance();
        }
        assert_eq!(emitter.stage(), Stage::Fading);

        let before: Vec<(f32, f32)> = emitter.particles().iter().map(|p| (p.lifespan, p.size)).collect();
        assert!(!before.is_empty());
        emitter.advance();

        // Nothing is pruned on this tick, so particles pair up by index.
        assert_eq!(emitter.particle_count(), before.len());
        for (p, (lifespan, size)) in emitter.particles().iter().zip(before) {
            assert!((lifespan - p.lifespan - config.fade.decay).abs() < 1e-3);
            assert!(p.size <= size);
            assert!(p.size >= config.fade.min_size);
        }
    }

    #[test]
    fn test_fading_converts_to_glow() {
        let mut config = FireworkConfig::compact();
        config.explosion.main.burst.lifespan = (400.0, 500.0);
        config.fade.convert_chance = 1.0;
        config.fade.convert_below = f32::MAX;
        config.fade.flicker_chance = 0.0;
        let config = Arc::new(config);
        let mut emitter = Emitter::new(EmitterId(0), Vec2::new(0.0, 5000.0), Arc::clone(&config), 2);
        for _ in 0..(config.ascent.duration + config.explosion.duration) {
            emitter.advance();
        }
        while emitter.stage_timer() <= config.fade.convert_after {
            emitter.advance();
        }

        assert!(emitter.particle_count() > 0);
        for particle in emitter.particles() {
            assert!(particle.is_converted());
            assert_eq!(particle.role, ColorRole::ConvertedGlow);
            assert!(particle.color.brightness < config.fade.glow_color.brightness);
        }
    }

    #[test]
    fn test_emitter_terminates_after_draining() {
        let config = compact();
        let mut emitter = Emitter::new(EmitterId(0), Vec2::new(100.0, 500.0), config, 9);
        let mut ticks = 0;
        while !emitter.is_dead() {
            emitter.advance();
            ticks += 1;
            assert!(ticks < 100_000, "emitter never drained");
        }
        assert_eq!(emitter.stage(), Stage::Fading);
        assert_eq!(emitter.particle_count(), 0);
    }

    #[test]
    fn test_render_draws_every_particle_head() {
        let mut config = FireworkConfig::compact();
        config.flash = None;
        let mut emitter = Emitter::new(EmitterId(0), Vec2::new(100.0, 500.0), Arc::new(config), 4);
        for _ in 0..5 {
            emitter.advance();
        }

        let mut canvas = RecordingCanvas::new();
        emitter.render(&mut canvas);
        assert_eq!(canvas.disc_count(), emitter.particle_count());
        let exhaust = Hsb::new(280.0, 70.0, 70.0).to_rgb();
        assert!(canvas.discs().all(|d| (d.color.truncate() - exhaust).length() < 1e-4));
    }

    #[test]
    fn test_render_does_not_perturb_simulation() {
        let config = compact();
        let mut drawn = Emitter::new(EmitterId(0), Vec2::new(100.0, 500.0), Arc::clone(&config), 8);
        let mut headless = Emitter::new(EmitterId(0), Vec2::new(100.0, 500.0), config, 8);
        let mut canvas = RecordingCanvas::new();

        for _ in 0..120 {
            drawn.advance();
            drawn.render(&mut canvas);
            headless.advance();
        }
        assert_eq!(drawn.particle_count(), headless.particle_count());
        for (a, b) in drawn.particles().iter().zip(headless.particles()) {
            assert_eq!(a.position, b.position);
        }
    }
}
