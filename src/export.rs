//! Periodic frame export over a message sink.
//!
//! After the first firework is spawned, every `every`-th tick within a fixed
//! window is captured from the canvas, wrapped in a JSON message and handed
//! to a [`FrameSink`]. Whatever sits on the other end (a save server, a
//! directory writer, a test channel) may answer with a [`ExportReply::Saved`]
//! acknowledgment, which is only logged.
//!
//! ```text
//! {"type":"request-save","filename":"fireworks_0000.png","image":"data:image/png;base64,..."}
//! {"type":"saved","filename":"fireworks_0000.png"}
//! ```
//!
//! Export never stalls the simulation. A sink that is not ready, a canvas
//! that cannot capture or a payload that fails to serialize drops that one
//! frame with a warning.

use crate::config::invalid;
use crate::error::{ConfigError, ExportError};
use crate::render::Canvas;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// Messages sent to the export collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExportMessage {
    /// Save one encoded frame under `filename`. `image` is a data URL.
    RequestSave { filename: String, image: String },
}

/// Messages the export collaborator may send back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExportReply {
    /// A frame has been stored.
    Saved { filename: String },
}

/// Destination for serialized export messages.
pub trait FrameSink {
    /// Whether [`send`](Self::send) would be accepted right now.
    fn is_ready(&self) -> bool;

    /// Deliver one serialized message.
    fn send(&mut self, payload: String) -> Result<(), ExportError>;

    /// Next pending reply from the collaborator, if any.
    fn poll_reply(&mut self) -> Option<String> {
        None
    }
}

/// In-process sink over `std::sync::mpsc` channels.
///
/// Pair it with a [`SinkEndpoint`] on the receiving side, typically on
/// another thread.
#[derive(Debug)]
pub struct ChannelSink {
    outgoing: Sender<String>,
    replies: Receiver<String>,
    closed: bool,
}

/// Receiving half of a [`ChannelSink`].
#[derive(Debug)]
pub struct SinkEndpoint {
    /// Serialized [`ExportMessage`]s.
    pub requests: Receiver<String>,
    /// Serialized [`ExportReply`]s sent back to the sink.
    pub replies: Sender<String>,
}

impl ChannelSink {
    /// Create a connected sink and endpoint.
    pub fn pair() -> (ChannelSink, SinkEndpoint) {
        let (request_tx, request_rx) = mpsc::channel();
        let (reply_tx, reply_rx) = mpsc::channel();
        (
            ChannelSink {
                outgoing: request_tx,
                replies: reply_rx,
                closed: false,
            },
            SinkEndpoint {
                requests: request_rx,
                replies: reply_tx,
            },
        )
    }
}

impl FrameSink for ChannelSink {
    fn is_ready(&self) -> bool {
        !self.closed
    }

    fn send(&mut self, payload: String) -> Result<(), ExportError> {
        if self.closed {
            return Err(ExportError::Closed);
        }
        self.outgoing.send(payload).map_err(|_| {
            self.closed = true;
            ExportError::Closed
        })
    }

    fn poll_reply(&mut self) -> Option<String> {
        match self.replies.try_recv() {
            Ok(reply) => Some(reply),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

impl SinkEndpoint {
    /// Acknowledge a saved frame.
    pub fn acknowledge(&self, filename: &str) -> Result<(), ExportError> {
        let reply = serde_json::to_string(&ExportReply::Saved {
            filename: filename.to_string(),
        })?;
        self.replies.send(reply).map_err(|_| ExportError::Closed)
    }
}

/// When and how frames are exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSchedule {
    /// Export every n-th tick.
    pub every: u64,
    /// Stop exporting this many ticks after the first spawn.
    pub window: u64,
    /// Filename prefix; frames are named `{prefix}_{NNNN}.{extension}`.
    pub prefix: String,
    /// Image extension, selects the encoder (`png`, `jpg`, `jpeg`).
    pub extension: String,
}

impl Default for ExportSchedule {
    fn default() -> Self {
        Self {
            every: 3,
            window: 3000,
            prefix: "fireworks".to_string(),
            extension: "png".to_string(),
        }
    }
}

impl ExportSchedule {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.every == 0 {
            return invalid("export.every must be at least 1");
        }
        if self.prefix.is_empty() {
            return invalid("export.prefix must not be empty");
        }
        if self.format().is_err() {
            return invalid(&format!("export.extension '{}' has no encoder", self.extension));
        }
        Ok(())
    }

    /// Image format for the configured extension.
    pub fn format(&self) -> Result<ImageFormat, ExportError> {
        match ImageFormat::from_extension(&self.extension) {
            Some(format @ (ImageFormat::Png | ImageFormat::Jpeg)) => Ok(format),
            _ => Err(ExportError::UnsupportedFormat(self.extension.clone())),
        }
    }

    /// Whether a frame is due `elapsed` ticks after the first spawn.
    #[inline]
    pub fn is_due(&self, elapsed: u64) -> bool {
        self.every > 0 && elapsed < self.window && elapsed % self.every == 0
    }

    /// Filename of the frame with the given counter value.
    pub fn filename(&self, counter: u32) -> String {
        format!("{}_{:04}.{}", self.prefix, counter, self.extension)
    }

    fn mime(&self) -> &'static str {
        match self.format() {
            Ok(ImageFormat::Jpeg) => "image/jpeg",
            _ => "image/png",
        }
    }
}

/// What happened to a due frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Nothing was due this tick.
    Idle,
    /// The frame was handed to the sink.
    Sent { filename: String },
    /// The frame was dropped; the reason has been logged.
    Skipped { filename: String, reason: String },
}

/// Drives an [`ExportSchedule`] against a [`FrameSink`].
pub struct FrameExporter {
    schedule: ExportSchedule,
    sink: Box<dyn FrameSink>,
    first_spawn: Option<u64>,
    counter: u32,
    sent: u64,
    skipped: u64,
}

impl FrameExporter {
    pub fn new(schedule: ExportSchedule, sink: Box<dyn FrameSink>) -> Self {
        Self {
            schedule,
            sink,
            first_spawn: None,
            counter: 0,
            sent: 0,
            skipped: 0,
        }
    }

    pub fn schedule(&self) -> &ExportSchedule {
        &self.schedule
    }

    /// Tick of the first spawn, once one happened.
    pub fn first_spawn(&self) -> Option<u64> {
        self.first_spawn
    }

    /// Counter value the next due frame will use.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Frames handed to the sink so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Due frames that were dropped so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Record a spawn; only the first one starts the export window.
    pub fn mark_spawn(&mut self, tick: u64) {
        if self.first_spawn.is_none() {
            log::debug!("Export window opens at tick {tick}");
            self.first_spawn = Some(tick);
        }
    }

    /// Whether a frame is due on `tick`.
    pub fn is_due(&self, tick: u64) -> bool {
        match self.first_spawn {
            Some(first) if tick >= first => self.schedule.is_due(tick - first),
            _ => false,
        }
    }

    /// Export the canvas if a frame is due on `tick`.
    ///
    /// The counter advances for every due frame, sent or not.
    pub fn export<C: Canvas + ?Sized>(&mut self, tick: u64, canvas: &C) -> ExportOutcome {
        self.drain_replies();

        if !self.is_due(tick) {
            return ExportOutcome::Idle;
        }
        let filename = self.schedule.filename(self.counter);
        self.counter = self.counter.wrapping_add(1);

        match self.send_frame(&filename, canvas) {
            Ok(()) => {
                self.sent += 1;
                ExportOutcome::Sent { filename }
            }
            Err(e) => {
                log::warn!("Dropping frame {filename}: {e}");
                self.skipped += 1;
                ExportOutcome::Skipped {
                    filename,
                    reason: e.to_string(),
                }
            }
        }
    }

    fn send_frame<C: Canvas + ?Sized>(&mut self, filename: &str, canvas: &C) -> Result<(), ExportError> {
        if !self.sink.is_ready() {
            return Err(ExportError::NotReady);
        }
        let bytes = canvas.capture(self.schedule.format()?)?;
        let message = ExportMessage::RequestSave {
            filename: filename.to_string(),
            image: data_url(self.schedule.mime(), &bytes),
        };
        let payload = serde_json::to_string(&message)?;
        self.sink.send(payload)
    }

    /// Parse and log one reply from the collaborator.
    pub fn handle_reply(&self, reply: &str) -> Result<ExportReply, ExportError> {
        let reply: ExportReply = serde_json::from_str(reply)?;
        match &reply {
            ExportReply::Saved { filename } => log::info!("Collaborator saved {filename}"),
        }
        Ok(reply)
    }

    fn drain_replies(&mut self) {
        while let Some(reply) = self.sink.poll_reply() {
            if let Err(e) = self.handle_reply(&reply) {
                log::warn!("Ignoring malformed export reply: {e}");
            }
        }
    }
}

impl std::fmt::Debug for FrameExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameExporter")
            .field("schedule", &self.schedule)
            .field("first_spawn", &self.first_spawn)
            .field("counter", &self.counter)
            .finish()
    }
}

// =============================================================================
// DATA URLS
// =============================================================================

/// Encode bytes as a `data:` URL.
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Decode the payload of a base64 `data:` URL.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, ExportError> {
    let (_, encoded) = url
        .split_once(";base64,")
        .ok_or_else(|| ExportError::UnsupportedFormat("not a base64 data URL".to_string()))?;
    Ok(STANDARD.decode(encoded)?)
}
