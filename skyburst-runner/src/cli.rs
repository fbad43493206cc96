//! Command-line structure for skyburst-runner

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "skyburst-runner")]
#[command(about = "Render firework scenes headlessly and save exported frames", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a scene until the sky is empty
    Run {
        /// Scene file (JSON); the built-in scene is used when omitted
        scene: Option<PathBuf>,

        /// Directory exported frames are written to
        #[arg(short, long, default_value = "saved_images")]
        output: PathBuf,

        /// Stop after this many ticks even if fireworks are still live
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Override the scene's seed
        #[arg(long)]
        seed: Option<u64>,

        /// Disable frame export
        #[arg(long)]
        no_export: bool,

        /// Save the final frame to this file
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Write a scene file to start editing from
    InitScene {
        /// Where to write the scene
        path: PathBuf,

        /// Firework preset
        #[arg(long, value_enum, default_value_t = Preset::Classic)]
        preset: Preset,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    Classic,
    Compact,
}
