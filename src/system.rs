//! The firework manager.
//!
//! [`FireworkSystem`] owns every live [`Emitter`] of a session. An external
//! frame clock drives it:
//!
//! ```ignore
//! let mut system = FireworkSystem::new(SystemConfig::default())?;
//! let mut canvas = RasterCanvas::new(800, 400);
//!
//! system.spawn(320.0, 200.0)?;          // pointer press
//! let mut clock = FrameClock::new();
//! loop {
//!     clock.tick();
//!     canvas.clear_to(Hsb::NIGHT_SKY);
//!     if !system.advance_and_render(clock.frame(), &mut canvas) {
//!         break;                         // nothing left in the sky
//!     }
//! }
//! ```
//!
//! Per tick, every emitter is advanced and drawn exactly once, finished
//! emitters are pruned, the population limits are enforced and finally a
//! frame is exported if one is due.
//!
//! # Population limits
//!
//! | Policy | Emitter limit | Particle budget |
//! |--------|---------------|-----------------|
//! | [`EvictionPolicy::DropOldest`] | oldest emitter removed before spawning | oldest emitters removed after the tick until within budget (one always survives) |
//! | [`EvictionPolicy::RefuseNew`] | [`SpawnError::EmitterLimit`] | [`SpawnError::ParticleBudget`] on spawn, nothing evicted |

use crate::config::{EvictionPolicy, FireworkConfig, SystemConfig};
use crate::emitter::{Emitter, EmitterId};
use crate::error::{ConfigError, SpawnError};
use crate::export::{ExportOutcome, FrameExporter, FrameSink};
use crate::render::{Canvas, NullCanvas};
use crate::spawn::SpawnRng;
use glam::Vec2;
use std::sync::Arc;

/// Owns and drives every live firework.
#[derive(Debug)]
pub struct FireworkSystem {
    config: SystemConfig,
    firework: Arc<FireworkConfig>,
    emitters: Vec<Emitter>,
    rng: SpawnRng,
    next_id: u64,
    tick: u64,
    exporter: Option<FrameExporter>,
    last_export: ExportOutcome,
    evicted: u64,
    refused: u64,
}

impl FireworkSystem {
    /// Create an empty system after validating `config`.
    pub fn new(config: SystemConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => SpawnRng::from_seed(seed),
            None => SpawnRng::from_entropy(),
        };
        Ok(Self {
            firework: Arc::new(config.firework.clone()),
            config,
            emitters: Vec::new(),
            rng,
            next_id: 0,
            tick: 0,
            exporter: None,
            last_export: ExportOutcome::Idle,
            evicted: 0,
            refused: 0,
        })
    }

    /// Attach an export sink, using the configured schedule or the default
    /// one if none is configured.
    pub fn with_sink(mut self, sink: Box<dyn FrameSink>) -> Self {
        let schedule = self.config.export.clone().unwrap_or_default();
        self.exporter = Some(FrameExporter::new(schedule, sink));
        self
    }

    // =========================================================================
    // SPAWNING
    // =========================================================================

    /// Launch a firework at horizontal position `x`.
    ///
    /// Fireworks always launch from the bottom edge of the viewport; `y` is
    /// only logged. Positions outside the viewport are accepted.
    pub fn spawn(&mut self, x: f32, y: f32) -> Result<EmitterId, SpawnError> {
        let limits = self.config.limits.clone();

        if let Some(limit) = limits.max_emitters {
            if self.emitters.len() >= limit {
                match limits.eviction {
                    EvictionPolicy::RefuseNew => {
                        return Err(self.refuse(SpawnError::EmitterLimit { limit }));
                    }
                    EvictionPolicy::DropOldest => {
                        let excess = self.emitters.len() + 1 - limit;
                        self.evict_oldest(excess);
                    }
                }
            }
        }

        if let (Some(limit), EvictionPolicy::RefuseNew) = (limits.max_particles, limits.eviction) {
            let live = self.particle_count();
            if live >= limit {
                return Err(self.refuse(SpawnError::ParticleBudget { live, limit }));
            }
        }

        let id = EmitterId(self.next_id);
        self.next_id += 1;
        let origin = Vec2::new(x, self.config.viewport.y);
        let seed = self.rng.next_seed();
        self.emitters
            .push(Emitter::new(id, origin, Arc::clone(&self.firework), seed));

        if let Some(exporter) = &mut self.exporter {
            exporter.mark_spawn(self.tick);
        }
        log::debug!("Spawned {id} at ({x:.1}, {y:.1}), launching from {origin}");
        Ok(id)
    }

    fn refuse(&mut self, error: SpawnError) -> SpawnError {
        self.refused += 1;
        log::warn!("Refusing spawn: {error}");
        error
    }

    fn evict_oldest(&mut self, count: usize) {
        let count = count.min(self.emitters.len());
        for emitter in self.emitters.drain(..count) {
            log::debug!(
                "Evicting {} ({}, {} particles)",
                emitter.id(),
                emitter.stage(),
                emitter.particle_count()
            );
        }
        self.evicted += count as u64;
    }

    // =========================================================================
    // STEPPING
    // =========================================================================

    /// Advance and draw every firework, prune finished ones, enforce limits
    /// and export a frame if one is due.
    ///
    /// Returns whether any firework is still live. Safe to call with none.
    pub fn advance_and_render<C: Canvas + ?Sized>(&mut self, tick: u64, canvas: &mut C) -> bool {
        self.step(tick, canvas);
        if let Some(exporter) = &mut self.exporter {
            self.last_export = exporter.export(tick, canvas);
        }
        !self.emitters.is_empty()
    }

    /// Advance without drawing or exporting.
    pub fn advance(&mut self, tick: u64) -> bool {
        self.step(tick, &mut NullCanvas);
        !self.emitters.is_empty()
    }

    fn step<C: Canvas + ?Sized>(&mut self, tick: u64, canvas: &mut C) {
        self.tick = tick;

        for emitter in &mut self.emitters {
            emitter.advance();
            emitter.render(canvas);
        }

        self.emitters.retain(|emitter| {
            let dead = emitter.is_dead();
            if dead {
                log::debug!("{} finished at tick {tick}", emitter.id());
            }
            !dead
        });

        self.enforce_particle_budget();
    }

    fn enforce_particle_budget(&mut self) {
        let limits = &self.config.limits;
        let Some(limit) = limits.max_particles else {
            return;
        };
        if limits.eviction != EvictionPolicy::DropOldest {
            return;
        }

        let mut live = self.particle_count();
        let mut excess = 0;
        while live > limit && self.emitters.len() - excess > 1 {
            live -= self.emitters[excess].particle_count();
            excess += 1;
        }
        if excess > 0 {
            log::debug!("Particle budget of {limit} exceeded, evicting {excess} emitters");
            self.evict_oldest(excess);
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Live fireworks, oldest first.
    pub fn emitters(&self) -> &[Emitter] {
        &self.emitters
    }

    pub fn emitter(&self, id: EmitterId) -> Option<&Emitter> {
        self.emitters.iter().find(|e| e.id() == id)
    }

    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    /// Live particles across all fireworks.
    pub fn particle_count(&self) -> usize {
        self.emitters.iter().map(Emitter::particle_count).sum()
    }

    /// Whether any firework is live.
    pub fn is_active(&self) -> bool {
        !self.emitters.is_empty()
    }

    /// Tick of the most recent advance, 0 before the first one.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn exporter(&self) -> Option<&FrameExporter> {
        self.exporter.as_ref()
    }

    /// Outcome of the most recent export attempt.
    pub fn last_export(&self) -> &ExportOutcome {
        &self.last_export
    }

    /// Emitters removed by the population policy so far.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Spawns refused by the population policy so far.
    pub fn refused(&self) -> u64 {
        self.refused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PopulationLimits;
    use crate::emitter::Stage;
    use crate::render::RecordingCanvas;

    fn compact(limits: PopulationLimits) -> SystemConfig {
        SystemConfig {
            viewport: Vec2::new(800.0, 600.0),
            seed: Some(42),
            limits,
            export: None,
            firework: FireworkConfig::compact(),
        }
    }

    #[test]
    fn test_empty_system_is_a_noop() {
        let mut system = FireworkSystem::new(compact(PopulationLimits::default())).unwrap();
        let mut canvas = RecordingCanvas::new();
        assert!(!system.advance_and_render(1, &mut canvas));
        assert!(canvas.commands().is_empty());
        assert_eq!(system.tick(), 1);
    }

    #[test]
    fn test_spawn_launches_from_bottom_edge() {
        let mut system = FireworkSystem::new(compact(PopulationLimits::default())).unwrap();
        let id = system.spawn(100.0, 12.0).unwrap();
        let emitter = system.emitter(id).unwrap();
        assert_eq!(emitter.origin(), Vec2::new(100.0, 600.0));
        assert_eq!(emitter.stage(), Stage::Ascending);
    }

    #[test]
    fn test_off_screen_spawn_is_accepted() {
        let mut system = FireworkSystem::new(compact(PopulationLimits::default())).unwrap();
        assert!(system.spawn(-5000.0, 99999.0).is_ok());
        assert!(system.advance(1));
    }

    #[test]
    fn test_ids_are_unique() {
        let mut system = FireworkSystem::new(compact(PopulationLimits::unbounded())).unwrap();
        let a = system.spawn(1.0, 0.0).unwrap();
        let b = system.spawn(2.0, 0.0).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_drop_oldest_on_emitter_limit() {
        let limits = PopulationLimits {
            max_emitters: Some(2),
            max_particles: None,
            eviction: EvictionPolicy::DropOldest,
        };
        let mut system = FireworkSystem::new(compact(limits)).unwrap();
        let first = system.spawn(1.0, 0.0).unwrap();
        let second = system.spawn(2.0, 0.0).unwrap();
        let third = system.spawn(3.0, 0.0).unwrap();

        let ids: Vec<EmitterId> = system.emitters().iter().map(Emitter::id).collect();
        assert_eq!(ids, vec![second, third]);
        assert!(system.emitter(first).is_none());
        assert_eq!(system.evicted(), 1);
    }

    #[test]
    fn test_refuse_new_on_emitter_limit() {
        let limits = PopulationLimits {
            max_emitters: Some(1),
            max_particles: None,
            eviction: EvictionPolicy::RefuseNew,
        };
        let mut system = FireworkSystem::new(compact(limits)).unwrap();
        system.spawn(1.0, 0.0).unwrap();
        assert_eq!(
            system.spawn(2.0, 0.0),
            Err(SpawnError::EmitterLimit { limit: 1 })
        );
        assert_eq!(system.emitter_count(), 1);
        assert_eq!(system.refused(), 1);
    }

    #[test]
    fn test_refuse_new_on_particle_budget() {
        let limits = PopulationLimits {
            max_emitters: None,
            max_particles: Some(5),
            eviction: EvictionPolicy::RefuseNew,
        };
        let mut system = FireworkSystem::new(compact(limits)).unwrap();
        system.spawn(1.0, 0.0).unwrap();
        for tick in 1..=5 {
            system.advance(tick);
        }
        assert_eq!(system.particle_count(), 5);
        assert_eq!(
            system.spawn(2.0, 0.0),
            Err(SpawnError::ParticleBudget { live: 5, limit: 5 })
        );
    }

    #[test]
    fn test_particle_budget_evicts_oldest_but_keeps_one() {
        let limits = PopulationLimits {
            max_emitters: None,
            max_particles: Some(10),
            eviction: EvictionPolicy::DropOldest,
        };
        let mut system = FireworkSystem::new(compact(limits)).unwrap();
        let first = system.spawn(1.0, 0.0).unwrap();
        for tick in 1..=8 {
            system.advance(tick);
        }
        let second = system.spawn(2.0, 0.0).unwrap();
        for tick in 9..=11 {
            system.advance(tick);
        }

        // Both exhausts together outgrow the budget, so the oldest goes.
        assert!(system.emitter(first).is_none());
        assert!(system.emitter(second).is_some());

        for tick in 12..=40 {
            system.advance(tick);
        }
        // A lone emitter is never evicted, even over budget.
        assert_eq!(system.emitter_count(), 1);
        assert!(system.particle_count() > 10);
    }

    #[test]
    fn test_finished_fireworks_are_pruned() {
        let mut system = FireworkSystem::new(compact(PopulationLimits::default())).unwrap();
        system.spawn(400.0, 0.0).unwrap();

        let mut tick = 0;
        while system.advance(tick + 1) {
            tick += 1;
            assert!(tick < 100_000);
            for emitter in system.emitters() {
                assert!(!emitter.is_dead());
            }
        }
        assert_eq!(system.emitter_count(), 0);
        assert_eq!(system.particle_count(), 0);
    }
}
