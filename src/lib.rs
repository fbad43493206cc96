//! # Skyburst - staged firework particle simulation
//!
//! Skyburst simulates fireworks as particle emitters that climb, burst and
//! fade, and describes every frame as draw calls on a [`Canvas`]. It has no
//! window, no GPU and no input handling of its own: a frame clock drives it,
//! pointer presses become [`FireworkSystem::spawn`] calls and any backend that
//! can draw lines and discs can display it.
//!
//! ## Quick Start
//!
//! ```ignore
//! use skyburst::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SystemConfig {
//!         seed: Some(7),
//!         ..SystemConfig::default()
//!     };
//!     let mut system = FireworkSystem::new(config)?;
//!     let mut canvas = RasterCanvas::for_viewport(system.config().viewport, 0.25);
//!
//!     system.spawn(1600.0, 0.0)?;
//!     let mut clock = FrameClock::new();
//!     loop {
//!         canvas.clear_to(Hsb::NIGHT_SKY);
//!         if !system.advance_and_render(clock.tick(), &mut canvas) {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Particles
//!
//! A [`Particle`] is a point with velocity, accumulated acceleration, an HSB
//! color, a size, a lifespan in ticks and a bounded trail of recent positions.
//! Forces are accumulated and consumed on the next tick; lifespan doubles as
//! draw alpha.
//!
//! ### Emitters
//!
//! An [`Emitter`] is one firework running the [`Stage`] machine
//! `Ascending → Exploding → Fading`. Every burst, timer and color rule comes
//! from a [`FireworkConfig`], so visual variants are configuration values:
//!
//! | Preset | Description |
//! |--------|-------------|
//! | [`FireworkConfig::classic`] | Long climb, 1000-particle main burst, sparkles, micro clusters, glowing fallout |
//! | [`FireworkConfig::compact`] | Same shape with short stages and small bursts |
//!
//! ### Colors
//!
//! Effects select particles by [`ColorRole`], never by comparing color
//! channels.
//!
//! ### System
//!
//! [`FireworkSystem`] owns all live emitters, bounds their population with
//! [`PopulationLimits`] and optionally exports rendered frames through a
//! [`FrameSink`] (see [`export`]).
//!
//! ## Feature Overview
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`config`] | Serializable configuration, presets, validation |
//! | [`render`] | [`Canvas`] trait, [`RecordingCanvas`], [`NullCanvas`] |
//! | [`raster`] | [`RasterCanvas`] CPU renderer with PNG/JPEG capture |
//! | [`export`] | Frame export messages, sinks and schedule |
//! | [`time`] | [`FrameClock`] tick source |

pub mod color;
pub mod config;
pub mod emitter;
pub mod error;
pub mod export;
pub mod particle;
pub mod raster;
pub mod render;
pub mod spawn;
pub mod system;
pub mod time;
pub mod trail;

pub use bytemuck;
pub use glam::{Vec2, Vec4};

pub use color::{ColorRole, Hsb};
pub use config::{
    AscentConfig, BurstConfig, ClusterBurst, ColorShiftConfig, ColorShiftRule, EvictionPolicy, ExplosionConfig,
    FadeConfig, FireworkConfig, FlashConfig, PhysicsConfig, PopulationLimits, RecurringBurst, SystemConfig,
    TickWindow, TimedBurst, TrailConfig,
};
pub use emitter::{Emitter, EmitterId, Stage};
pub use error::{ConfigError, ExportError, SpawnError};
pub use export::{
    ChannelSink, ExportMessage, ExportOutcome, ExportReply, ExportSchedule, FrameExporter, FrameSink, SinkEndpoint,
};
pub use particle::Particle;
pub use raster::RasterCanvas;
pub use render::{Canvas, DiscInstance, DrawCommand, LineInstance, NullCanvas, RecordingCanvas};
pub use spawn::SpawnRng;
pub use system::FireworkSystem;
pub use time::FrameClock;
pub use trail::Trail;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use skyburst::prelude::*;
/// ```
pub mod prelude {
    pub use crate::color::{ColorRole, Hsb};
    pub use crate::config::{EvictionPolicy, FireworkConfig, PopulationLimits, SystemConfig};
    pub use crate::emitter::{Emitter, EmitterId, Stage};
    pub use crate::error::{ConfigError, ExportError, SpawnError};
    pub use crate::export::{ChannelSink, ExportSchedule, FrameSink};
    pub use crate::raster::RasterCanvas;
    pub use crate::render::{Canvas, NullCanvas, RecordingCanvas};
    pub use crate::system::FireworkSystem;
    pub use crate::time::FrameClock;
    pub use crate::{Vec2, Vec4};
}
