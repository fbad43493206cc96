//! Configuration for fireworks and simulation sessions.
//!
//! A [`FireworkConfig`] describes one firework from launch to fallout: stage
//! durations, every burst, the physics constants and the cosmetic effects.
//! Visual variants are just different values of this struct, see
//! [`FireworkConfig::classic`] and [`FireworkConfig::compact`].
//!
//! A [`SystemConfig`] wraps a firework config with session-level settings:
//! viewport, seed, population limits and the optional export schedule.
//!
//! Both serialize to JSON and every field has a default, so partial files
//! work:
//!
//! ```ignore
//! let mut config = SystemConfig::load("scene.json")?;
//! config.firework.explosion.main.burst.count = 500;
//! config.save("scene.json")?;
//! ```

use crate::color::{ColorRole, Hsb};
use crate::error::ConfigError;
use crate::export::ExportSchedule;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete description of one firework.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FireworkConfig {
    /// Launch stage.
    pub ascent: AscentConfig,
    /// Explosion stage and all its bursts.
    pub explosion: ExplosionConfig,
    /// Fallout stage.
    pub fade: FadeConfig,
    /// Forces and default lifespan decay.
    pub physics: PhysicsConfig,
    /// Trail history and trail rendering.
    pub trail: TrailConfig,
    /// White flash effect; `None` disables it.
    pub flash: Option<FlashConfig>,
}

impl Default for FireworkConfig {
    fn default() -> Self {
        Self::classic()
    }
}

impl FireworkConfig {
    // =========================================================================
    // PRESETS
    // =========================================================================

    /// The full show: a long snaking climb, a purple primary burst, a large
    /// white-gold main burst followed by sparkle bursts and red-gold micro
    /// clusters, then a slow fallout with glowing embers.
    pub fn classic() -> Self {
        Self {
            ascent: AscentConfig::default(),
            explosion: ExplosionConfig::default(),
            fade: FadeConfig::default(),
            physics: PhysicsConfig::default(),
            trail: TrailConfig::default(),
            flash: Some(FlashConfig::default()),
        }
    }

    /// A small, fast firework with the same shape as [`classic`](Self::classic).
    ///
    /// Stages last tens of ticks and bursts hold tens of particles, which
    /// keeps many concurrent fireworks cheap.
    pub fn compact() -> Self {
        let main = BurstConfig {
            count: 60,
            lifespan: (60.0, 120.0),
            ..BurstConfig::main()
        };
        Self {
            ascent: AscentConfig {
                duration: 30,
                lifespan: (40.0, 20.0),
                ..AscentConfig::default()
            },
            explosion: ExplosionConfig {
                duration: 200,
                primary: TimedBurst {
                    at: 0,
                    burst: BurstConfig {
                        count: 20,
                        lifespan: (30.0, 60.0),
                        ..BurstConfig::primary()
                    },
                },
                main: TimedBurst {
                    at: 40,
                    burst: main.clone(),
                },
                sparkle: Some(RecurringBurst {
                    window: TickWindow::new(30, 120, 20),
                    burst: BurstConfig { count: 20, ..main },
                }),
                micro: Some(ClusterBurst {
                    window: TickWindow::new(50, 100, 25),
                    offset_x: (-60.0, 60.0),
                    offset_y: (-60.0, 20.0),
                    burst: BurstConfig {
                        count: 10,
                        lifespan: (40.0, 80.0),
                        ..BurstConfig::micro()
                    },
                }),
                color_shift: Some(ColorShiftConfig {
                    after: 90,
                    progress_from: 30,
                    rules: vec![ColorShiftRule::white_gold_to_gold()],
                }),
            },
            fade: FadeConfig {
                duration: 40,
                convert_after: 20,
                glow_lifespan: 60.0,
                glow_duration: 60,
                decay: 0.5,
                ..FadeConfig::default()
            },
            physics: PhysicsConfig::default(),
            trail: TrailConfig {
                length: 12,
                ..TrailConfig::default()
            },
            flash: Some(FlashConfig::default()),
        }
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Check that the configuration can drive a simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ascent.duration == 0 {
            return invalid("ascent.duration must be at least 1 tick");
        }
        if self.explosion.duration == 0 {
            return invalid("explosion.duration must be at least 1 tick");
        }
        check_positive_span("ascent.size", self.ascent.size)?;

        self.explosion.primary.burst.validate("explosion.primary")?;
        self.explosion.main.burst.validate("explosion.main")?;
        if let Some(sparkle) = &self.explosion.sparkle {
            sparkle.window.validate("explosion.sparkle.window")?;
            sparkle.burst.validate("explosion.sparkle")?;
        }
        if let Some(micro) = &self.explosion.micro {
            micro.window.validate("explosion.micro.window")?;
            check_span("explosion.micro.offset_x", micro.offset_x)?;
            check_span("explosion.micro.offset_y", micro.offset_y)?;
            micro.burst.validate("explosion.micro")?;
        }
        if let Some(shift) = &self.explosion.color_shift {
            if shift.progress_from >= self.explosion.duration {
                return invalid("explosion.color_shift.progress_from must precede the end of the stage");
            }
        }

        check_chance("fade.convert_chance", self.fade.convert_chance)?;
        check_chance("fade.flicker_chance", self.fade.flicker_chance)?;
        if self.fade.decay <= 0.0 || self.fade.glow_decay <= 0.0 {
            return invalid("fade decay rates must be positive");
        }
        if self.fade.min_size <= 0.0 {
            return invalid("fade.min_size must be positive");
        }

        if self.physics.mass <= 0.0 {
            return invalid("physics.mass must be positive");
        }
        if self.physics.decay <= 0.0 {
            return invalid("physics.decay must be positive");
        }

        if !(0.0..=0.5).contains(&self.trail.tail_fraction) {
            return invalid("trail.tail_fraction must be within 0.0..=0.5");
        }
        check_chance("trail.skip_chance", self.trail.skip_chance)?;

        if let Some(flash) = &self.flash {
            check_chance("flash.chance", flash.chance)?;
        }
        Ok(())
    }

    /// Save the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Launch stage: the firework climbs from the bottom edge, leaving exhaust.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AscentConfig {
    /// Stage length in ticks.
    pub duration: u32,
    /// Upward distance per tick.
    pub rise_step: f32,
    /// Lateral sway per tick: `sin(timer * sway_frequency) * sway_amplitude`.
    pub sway_amplitude: f32,
    pub sway_frequency: f32,
    /// Horizontal jitter applied to each exhaust particle.
    pub jitter: f32,
    /// Exhaust lifespan at the start and at the end of the climb.
    pub lifespan: (f32, f32),
    /// Exhaust particle size range.
    pub size: (f32, f32),
    /// Each exhaust velocity component is uniform in `-drift..drift`.
    pub drift: f32,
    /// Exhaust color.
    pub color: Hsb,
}

impl Default for AscentConfig {
    fn default() -> Self {
        Self {
            duration: 300,
            rise_step: 3.0,
            sway_amplitude: 1.5,
            sway_frequency: 0.3,
            jitter: 3.0,
            lifespan: (100.0, 50.0),
            size: (2.0, 6.0),
            drift: 1.0,
            color: Hsb::new(280.0, 70.0, 70.0),
        }
    }
}

/// One burst of particles fired from a single point.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BurstConfig {
    /// Particles per burst.
    pub count: u32,
    /// Speed range; direction is uniform over the full circle.
    pub speed: (f32, f32),
    /// Multiplier applied to the sampled velocity.
    pub speed_scale: f32,
    /// Particle size range.
    pub size: (f32, f32),
    /// Lifespan range in ticks.
    pub lifespan: (f32, f32),
    pub color: Hsb,
    pub role: ColorRole,
}

impl BurstConfig {
    /// The small purple burst at the top of the climb.
    pub fn primary() -> Self {
        Self {
            count: 200,
            speed: (0.5, 2.0),
            speed_scale: 1.0,
            size: (1.0, 3.0),
            lifespan: (100.0, 300.0),
            color: Hsb::new(280.0, 80.0, 90.0),
            role: ColorRole::PrimaryBurst,
        }
    }

    /// The large white-gold explosion.
    pub fn main() -> Self {
        Self {
            count: 1000,
            speed: (2.0, 5.0),
            speed_scale: 1.0,
            size: (1.0, 4.0),
            lifespan: (1000.0, 4000.0),
            color: Hsb::new(60.0, 20.0, 100.0),
            role: ColorRole::MainBurst,
        }
    }

    /// A slow red-gold micro cluster.
    pub fn micro() -> Self {
        Self {
            count: 100,
            speed: (0.5, 2.0),
            speed_scale: 0.5,
            size: (1.0, 2.0),
            lifespan: (300.0, 500.0),
            color: Hsb::new(20.0, 90.0, 95.0),
            role: ColorRole::MicroCluster,
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        check_span(&format!("{name}.speed"), self.speed)?;
        check_positive_span(&format!("{name}.size"), self.size)?;
        check_span(&format!("{name}.lifespan"), self.lifespan)
    }
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self::main()
    }
}

/// A burst fired once at `at` ticks into the explosion.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TimedBurst {
    pub at: u32,
    pub burst: BurstConfig,
}

/// Recurring schedule: fires on ticks `t` with `after < t < before` and
/// `t % every == 0`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TickWindow {
    pub after: u32,
    pub before: u32,
    pub every: u32,
}

impl TickWindow {
    pub const fn new(after: u32, before: u32, every: u32) -> Self {
        Self {
            after,
            before,
            every,
        }
    }

    /// Whether the schedule fires on tick `t`.
    #[inline]
    pub fn fires_at(&self, t: u32) -> bool {
        self.every > 0 && t > self.after && t < self.before && t % self.every == 0
    }

    /// Number of ticks this window fires on.
    pub fn occurrences(&self) -> usize {
        (self.after.saturating_add(1)..self.before)
            .filter(|t| self.fires_at(*t))
            .count()
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.every == 0 {
            return invalid(&format!("{name}.every must be at least 1"));
        }
        if self.after >= self.before {
            return invalid(&format!("{name} is empty (after >= before)"));
        }
        Ok(())
    }
}

/// Bursts repeated on a [`TickWindow`] from the explosion center.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RecurringBurst {
    pub window: TickWindow,
    pub burst: BurstConfig,
}

/// Bursts repeated on a [`TickWindow`], each from a random point offset from
/// the explosion center.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClusterBurst {
    pub window: TickWindow,
    /// Horizontal offset range of each cluster center.
    pub offset_x: (f32, f32),
    /// Vertical offset range of each cluster center.
    pub offset_y: (f32, f32),
    pub burst: BurstConfig,
}

/// Explosion stage.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExplosionConfig {
    /// Stage length in ticks.
    pub duration: u32,
    /// First, small burst.
    pub primary: TimedBurst,
    /// The main explosion.
    pub main: TimedBurst,
    /// Follow-up bursts; never fire on the main burst's tick.
    pub sparkle: Option<RecurringBurst>,
    /// Offset micro clusters.
    pub micro: Option<ClusterBurst>,
    /// Late color drift of existing particles.
    pub color_shift: Option<ColorShiftConfig>,
}

impl Default for ExplosionConfig {
    fn default() -> Self {
        Self {
            duration: 1300,
            primary: TimedBurst {
                at: 0,
                burst: BurstConfig::primary(),
            },
            main: TimedBurst {
                at: 200,
                burst: BurstConfig::main(),
            },
            sparkle: Some(RecurringBurst {
                window: TickWindow::new(160, 600, 40),
                burst: BurstConfig {
                    count: 200,
                    ..BurstConfig::main()
                },
            }),
            micro: Some(ClusterBurst {
                window: TickWindow::new(350, 500, 10),
                offset_x: (-300.0, 300.0),
                offset_y: (-300.0, 100.0),
                burst: BurstConfig::micro(),
            }),
            color_shift: Some(ColorShiftConfig::default()),
        }
    }
}

/// Gradual recoloring of existing particles late in the explosion.
///
/// On ticks past `after`, every particle whose role has a rule is recolored
/// to `from.lerp(to, progress)` with
/// `progress = (timer - progress_from) / (duration - progress_from)`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColorShiftConfig {
    pub after: u32,
    pub progress_from: u32,
    pub rules: Vec<ColorShiftRule>,
}

impl Default for ColorShiftConfig {
    fn default() -> Self {
        Self {
            after: 450,
            progress_from: 150,
            rules: vec![ColorShiftRule::white_gold_to_gold()],
        }
    }
}

/// Recolor particles of one role from `from` to `to`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ColorShiftRule {
    pub role: ColorRole,
    pub from: Hsb,
    pub to: Hsb,
}

impl ColorShiftRule {
    /// Main burst: white-gold to saturated gold.
    pub fn white_gold_to_gold() -> Self {
        Self {
            role: ColorRole::MainBurst,
            from: Hsb::new(60.0, 20.0, 100.0),
            to: Hsb::new(60.0, 100.0, 90.0),
        }
    }

    /// Micro clusters: red-gold to red.
    pub fn red_gold_to_red() -> Self {
        Self {
            role: ColorRole::MicroCluster,
            from: Hsb::new(20.0, 90.0, 95.0),
            to: Hsb::new(0.0, 100.0, 90.0),
        }
    }
}

/// Fallout stage: no spawning, particles shrink and linger, some turn into
/// glowing embers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FadeConfig {
    /// Nominal stage length in ticks. The stage is terminal; the emitter
    /// lives on until its particles drain.
    pub duration: u32,
    /// Conversions start once the stage timer exceeds this.
    pub convert_after: u32,
    /// Only particles with `0 < lifespan < convert_below` may convert.
    pub convert_below: f32,
    /// Per-tick conversion probability for an eligible particle.
    pub convert_chance: f32,
    /// Lifespan given to a converted particle.
    pub glow_lifespan: f32,
    /// Ticks over which the glow dims from full brightness to zero.
    pub glow_duration: u32,
    pub glow_color: Hsb,
    pub flicker_chance: f32,
    /// Flicker offsets brightness uniformly in `-flicker_amount..flicker_amount`.
    pub flicker_amount: f32,
    /// Size lost per tick by non-converted particles.
    pub shrink: f32,
    /// Size floor while shrinking.
    pub min_size: f32,
    /// Lifespan decay per tick of non-converted particles.
    pub decay: f32,
    /// Lifespan decay per tick of converted particles.
    pub glow_decay: f32,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            duration: 180,
            convert_after: 120,
            convert_below: 50.0,
            convert_chance: 0.3,
            glow_lifespan: 300.0,
            glow_duration: 300,
            glow_color: Hsb::new(60.0, 20.0, 100.0),
            flicker_chance: 0.1,
            flicker_amount: 10.0,
            shrink: 0.01,
            min_size: 0.1,
            decay: 0.1,
            glow_decay: 1.0,
        }
    }
}

/// Forces applied to every particle every tick.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Quadratic drag coefficient: force is `-v * |v|² * drag`.
    pub drag: f32,
    /// Constant force; canvas space is y-down, so positive y pulls down.
    pub gravity: Vec2,
    pub mass: f32,
    /// Default lifespan decay per tick.
    pub decay: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            drag: 0.0001,
            gravity: Vec2::new(0.0, 0.01),
            mass: 1.0,
            decay: 1.0,
        }
    }
}

/// Trail history length and the shape of rendered trails.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrailConfig {
    /// Maximum stored positions per particle.
    pub length: usize,
    /// Segments whose trail parameter lies within this fraction of either
    /// end are thinned stochastically.
    pub tail_fraction: f32,
    /// Probability of skipping a thinned segment.
    pub skip_chance: f32,
    /// Width and alpha factor at the oldest end of the trail.
    pub floor: f32,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            length: 40,
            tail_fraction: 0.3,
            skip_chance: 0.4,
            floor: 0.1,
        }
    }
}

/// Brief white flash on nearly spent particles.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlashConfig {
    /// Role eligible for flashing.
    pub role: ColorRole,
    /// Only particles with less lifespan than this may flash.
    pub below_lifespan: f32,
    /// Only particles with a shorter trail than this may flash.
    pub max_trail: usize,
    /// Per-tick probability for an eligible particle.
    pub chance: f32,
    /// Flash length in ticks.
    pub duration: u32,
    pub color: Hsb,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            role: ColorRole::MainBurst,
            below_lifespan: 30.0,
            max_trail: 5,
            chance: 0.005,
            duration: 180,
            color: Hsb::WHITE,
        }
    }
}

/// What to do when a population limit is hit.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Remove the oldest live emitters to make room.
    #[default]
    DropOldest,
    /// Reject new spawns until the population drops.
    RefuseNew,
}

/// Bounds on the live population of a [`FireworkSystem`](crate::FireworkSystem).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PopulationLimits {
    /// Maximum live emitters; `None` is unbounded.
    pub max_emitters: Option<usize>,
    /// Maximum live particles across all emitters; `None` is unbounded.
    pub max_particles: Option<usize>,
    pub eviction: EvictionPolicy,
}

impl PopulationLimits {
    /// No bounds at all.
    pub fn unbounded() -> Self {
        Self {
            max_emitters: None,
            max_particles: None,
            eviction: EvictionPolicy::DropOldest,
        }
    }
}

impl Default for PopulationLimits {
    fn default() -> Self {
        Self {
            max_emitters: Some(16),
            max_particles: Some(200_000),
            eviction: EvictionPolicy::DropOldest,
        }
    }
}

/// Session-level configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SystemConfig {
    /// Canvas size; fireworks launch from the bottom edge (`y = viewport.y`).
    pub viewport: Vec2,
    /// Seed for the random source; `None` seeds from the operating system.
    pub seed: Option<u64>,
    pub limits: PopulationLimits,
    /// Frame export cadence; `None` disables export.
    pub export: Option<ExportSchedule>,
    /// Configuration of every spawned firework.
    pub firework: FireworkConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            viewport: Vec2::new(3200.0, 1600.0),
            seed: None,
            limits: PopulationLimits::default(),
            export: None,
            firework: FireworkConfig::classic(),
        }
    }
}

impl SystemConfig {
    /// Check that the configuration can drive a simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport.x <= 0.0 || self.viewport.y <= 0.0 {
            return invalid("viewport must be positive in both dimensions");
        }
        if self.limits.max_emitters == Some(0) {
            return invalid("limits.max_emitters must be at least 1");
        }
        if let Some(export) = &self.export {
            export.validate()?;
        }
        self.firework.validate()
    }

    /// Save the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

pub(crate) fn invalid<T>(msg: &str) -> Result<T, ConfigError> {
    Err(ConfigError::Invalid(msg.to_string()))
}

fn check_span(name: &str, span: (f32, f32)) -> Result<(), ConfigError> {
    if !span.0.is_finite() || !span.1.is_finite() || span.0 > span.1 {
        return invalid(&format!("{name} must be a finite range with min <= max"));
    }
    Ok(())
}

fn check_positive_span(name: &str, span: (f32, f32)) -> Result<(), ConfigError> {
    check_span(name, span)?;
    if span.0 <= 0.0 {
        return invalid(&format!("{name} must be positive"));
    }
    Ok(())
}

fn check_chance(name: &str, p: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&p) {
        return invalid(&format!("{name} must be a probability within 0.0..=1.0"));
    }
    Ok(())
}
