//! Drawing API consumed by the simulation.
//!
//! The simulation never rasterizes anything itself. Particles describe what
//! they look like through the [`Canvas`] trait, and a backend decides what to
//! do with it:
//!
//! | Canvas | Description |
//! |--------|-------------|
//! | [`RecordingCanvas`] | Records GPU-ready instances for a line/disc pipeline |
//! | [`RasterCanvas`](crate::raster::RasterCanvas) | CPU rasterizer into an RGBA image, supports frame capture |
//! | [`NullCanvas`] | Discards everything (headless stepping, benchmarks) |
//!
//! Colors arrive as linear RGBA with every channel in 0.0-1.0.

use crate::error::ExportError;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4};
use image::ImageFormat;

/// A surface the simulation can draw on.
pub trait Canvas {
    /// Draw a round-capped line segment.
    fn line(&mut self, from: Vec2, to: Vec2, color: Vec4, width: f32);

    /// Draw a filled disc.
    fn disc(&mut self, center: Vec2, diameter: f32, color: Vec4);

    /// Encode the current contents as an image.
    ///
    /// Canvases without pixels return [`ExportError::CaptureUnsupported`].
    fn capture(&self, format: ImageFormat) -> Result<Vec<u8>, ExportError> {
        let _ = format;
        Err(ExportError::CaptureUnsupported)
    }
}

/// A canvas that draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCanvas;

impl Canvas for NullCanvas {
    #[inline]
    fn line(&mut self, _from: Vec2, _to: Vec2, _color: Vec4, _width: f32) {}

    #[inline]
    fn disc(&mut self, _center: Vec2, _diameter: f32, _color: Vec4) {}
}

/// One line segment, laid out for a GPU instance buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LineInstance {
    pub from: Vec2,
    pub to: Vec2,
    pub color: Vec4,
    pub width: f32,
    pub _pad: [f32; 3],
}

/// One filled disc, laid out for a GPU instance buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct DiscInstance {
    pub center: Vec2,
    pub diameter: f32,
    pub _pad: f32,
    pub color: Vec4,
}

/// A single recorded draw call, in submission order.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Line(LineInstance),
    Disc(DiscInstance),
}

/// Records draw calls instead of executing them.
///
/// Useful as the front half of a GPU renderer (upload
/// [`line_bytes`](Self::line_bytes) and [`disc_bytes`](Self::disc_bytes)
/// as instance buffers) and for inspecting exactly what a frame drew.
#[derive(Debug, Default, Clone)]
pub struct RecordingCanvas {
    commands: Vec<DrawCommand>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// All draw calls in submission order.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Recorded line segments in submission order.
    pub fn lines(&self) -> impl Iterator<Item = &LineInstance> + '_ {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Line(line) => Some(line),
            DrawCommand::Disc(_) => None,
        })
    }

    /// Recorded discs in submission order.
    pub fn discs(&self) -> impl Iterator<Item = &DiscInstance> + '_ {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Disc(disc) => Some(disc),
            DrawCommand::Line(_) => None,
        })
    }

    pub fn line_count(&self) -> usize {
        self.lines().count()
    }

    pub fn disc_count(&self) -> usize {
        self.discs().count()
    }

    /// Line instances as raw bytes for a vertex/instance buffer.
    pub fn line_bytes(&self) -> Vec<u8> {
        let lines: Vec<LineInstance> = self.lines().copied().collect();
        bytemuck::cast_slice(&lines).to_vec()
    }

    /// Disc instances as raw bytes for a vertex/instance buffer.
    pub fn disc_bytes(&self) -> Vec<u8> {
        let discs: Vec<DiscInstance> = self.discs().copied().collect();
        bytemuck::cast_slice(&discs).to_vec()
    }
}

impl Canvas for RecordingCanvas {
    fn line(&mut self, from: Vec2, to: Vec2, color: Vec4, width: f32) {
        self.commands.push(DrawCommand::Line(LineInstance {
            from,
            to,
            color,
            width,
            _pad: [0.0; 3],
        }));
    }

    fn disc(&mut self, center: Vec2, diameter: f32, color: Vec4) {
        self.commands.push(DrawCommand::Disc(DiscInstance {
            center,
            diameter,
            _pad: 0.0,
            color,
        }));
    }
}
