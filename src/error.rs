//! Error types for skyburst.
//!
//! Stepping the simulation never fails. These errors cover the edges of the
//! crate: loading configuration, refusing spawns under a population limit,
//! and exporting rendered frames.

use thiserror::Error;

/// Errors that can occur while loading, saving or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write the configuration file.
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid configuration JSON.
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    /// The configuration parsed but holds values the simulation cannot run.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Errors that can occur when exporting a rendered frame.
///
/// None of these are fatal: the system logs them and drops the frame.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The sink is connected but cannot accept a write right now.
    #[error("Export sink is not ready")]
    NotReady,
    /// The sink has been closed by the receiving side.
    #[error("Export sink is closed")]
    Closed,
    /// The canvas has no pixels to capture.
    #[error("Canvas does not support frame capture")]
    CaptureUnsupported,
    /// The requested image extension has no encoder.
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    /// Image encoding failed.
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
    /// The export message could not be serialized or parsed.
    #[error("Failed to serialize export message: {0}")]
    Serialize(#[from] serde_json::Error),
    /// A frame payload was not valid base64.
    #[error("Failed to decode frame payload: {0}")]
    Decode(#[from] base64::DecodeError),
    /// Writing the frame failed.
    #[error("Failed to write frame: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by [`FireworkSystem::spawn`](crate::FireworkSystem::spawn)
/// when the population policy refuses a new emitter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    /// The live emitter count is at its limit.
    #[error("Emitter limit of {limit} reached")]
    EmitterLimit {
        /// Configured maximum number of live emitters.
        limit: usize,
    },
    /// The live particle count is at or above its budget.
    #[error("Particle budget exhausted: {live} live of {limit}")]
    ParticleBudget {
        /// Particles alive when the spawn was requested.
        live: usize,
        /// Configured particle budget.
        limit: usize,
    },
}
