//! Scene files: a system configuration plus scripted spawns.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use skyburst::{ExportSchedule, FireworkConfig, SystemConfig};
use std::fs;
use std::path::Path;

/// A pointer press replayed at a given tick.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScheduledSpawn {
    pub tick: u64,
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

/// Everything the runner needs to replay a show.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Scene {
    pub system: SystemConfig,
    pub spawns: Vec<ScheduledSpawn>,
    /// Output pixels per world unit.
    pub scale: f32,
    /// Ticks per second assumed for reporting.
    pub fps: f32,
}

impl Default for Scene {
    fn default() -> Self {
        Self::with_firework(FireworkConfig::classic())
    }
}

impl Scene {
    /// Three launches across the viewport with frame export enabled.
    pub fn with_firework(firework: FireworkConfig) -> Self {
        let system = SystemConfig {
            seed: Some(2024),
            export: Some(ExportSchedule::default()),
            firework,
            ..SystemConfig::default()
        };
        let width = system.viewport.x;
        let spawns = [(0, 0.5), (90, 0.25), (180, 0.75)]
            .into_iter()
            .map(|(tick, fraction)| ScheduledSpawn {
                tick,
                x: width * fraction,
                y: 0.0,
            })
            .collect();
        Self {
            system,
            spawns,
            scale: 0.25,
            fps: 60.0,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).with_context(|| format!("Failed to read scene {}", path.display()))?;
        let mut scene: Scene =
            serde_json::from_str(&json).with_context(|| format!("Failed to parse scene {}", path.display()))?;
        scene.validate()?;
        scene.spawns.sort_by_key(|s| s.tick);
        Ok(scene)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write scene {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.system.validate()?;
        if !(self.scale > 0.0 && self.scale.is_finite()) {
            bail!("scale must be a positive number");
        }
        if self.fps <= 0.0 {
            bail!("fps must be positive");
        }
        Ok(())
    }
}
