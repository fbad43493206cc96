//! Headless runner for skyburst scenes
//!
//! Replays scripted spawns against a [`FireworkSystem`], rasterizes every
//! frame and stores exported frames in a directory.
//!
//! Usage:
//!
//! ```text
//! skyburst-runner init-scene scene.json --preset compact
//! skyburst-runner run scene.json --output saved_images -v
//! ```

mod cli;
mod scene;
mod sink;

use anyhow::{Context, Result};
use clap::Parser;
use skyburst::prelude::*;
use std::path::PathBuf;

use crate::cli::{Cli, Commands, Preset};
use crate::scene::Scene;
use crate::sink::DirectorySink;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.verbose > 0 {
        log::set_max_level(match cli.verbose {
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        });
    } else if cli.quiet {
        log::set_max_level(log::LevelFilter::Error);
    }

    match cli.command {
        Commands::Run {
            scene,
            output,
            max_ticks,
            seed,
            no_export,
            snapshot,
        } => {
            let mut scene = match scene {
                Some(path) => Scene::load(&path)?,
                None => Scene::default(),
            };
            if seed.is_some() {
                scene.system.seed = seed;
            }
            if no_export {
                scene.system.export = None;
            }
            run(scene, output, max_ticks, snapshot)
        }
        Commands::InitScene { path, preset } => {
            let firework = match preset {
                Preset::Classic => FireworkConfig::classic(),
                Preset::Compact => FireworkConfig::compact(),
            };
            Scene::with_firework(firework).save(&path)?;
            log::info!("Wrote {:?} scene to {}", preset, path.display());
            Ok(())
        }
    }
}

fn run(scene: Scene, output: PathBuf, max_ticks: Option<u64>, snapshot: Option<PathBuf>) -> Result<()> {
    let exporting = scene.system.export.is_some();
    let mut system = FireworkSystem::new(scene.system.clone()).context("Invalid system configuration")?;
    if exporting {
        let sink = DirectorySink::create(&output)
            .with_context(|| format!("Failed to create output directory {}", output.display()))?;
        system = system.with_sink(Box::new(sink));
    }

    let mut canvas = RasterCanvas::for_viewport(scene.system.viewport, scene.scale);
    let mut clock = FrameClock::fixed(scene.fps);
    let mut pending = scene.spawns.iter().peekable();

    log::info!(
        "Running {} spawns on a {}x{} canvas",
        scene.spawns.len(),
        canvas.width(),
        canvas.height()
    );

    loop {
        while let Some(spawn) = pending.next_if(|s| s.tick <= clock.frame()) {
            if let Err(e) = system.spawn(spawn.x, spawn.y) {
                log::warn!("Spawn at tick {} dropped: {e}", spawn.tick);
            }
        }

        let frame = clock.tick();
        canvas.clear_to(Hsb::NIGHT_SKY);
        let active = system.advance_and_render(frame, &mut canvas);

        if frame % 600 == 0 {
            log::info!(
                "Tick {frame}: {} fireworks, {} particles ({:.0} ticks/s)",
                system.emitter_count(),
                system.particle_count(),
                clock.fps()
            );
        }

        if !active && pending.peek().is_none() {
            break;
        }
        if max_ticks.is_some_and(|max| frame >= max) {
            log::info!("Stopping at tick limit with {} fireworks live", system.emitter_count());
            break;
        }
    }

    if let Some(path) = snapshot {
        canvas
            .save(&path)
            .with_context(|| format!("Failed to save snapshot {}", path.display()))?;
    }

    let (sent, skipped) = system
        .exporter()
        .map(|e| (e.sent(), e.skipped()))
        .unwrap_or_default();
    log::info!(
        "Finished after {} ticks ({:.1}s of show): {sent} frames exported to {}, {skipped} dropped, {} evictions",
        clock.frame(),
        clock.elapsed(),
        output.display(),
        system.evicted()
    );
    Ok(())
}
