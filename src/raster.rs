//! CPU rasterizer for headless rendering and frame capture.
//!
//! [`RasterCanvas`] draws round-capped lines and discs into an
//! [`image::RgbaImage`] with source-over blending. World coordinates are
//! multiplied by a scale factor, so a 3200 × 1600 viewport can be rendered
//! into a smaller image.

use crate::color::Hsb;
use crate::error::ExportError;
use crate::render::Canvas;
use glam::{Vec2, Vec4};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// An RGBA pixel buffer implementing [`Canvas`].
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    image: RgbaImage,
    scale: f32,
}

impl RasterCanvas {
    /// Create a canvas of `width` × `height` pixels at scale 1, cleared to
    /// the night sky.
    pub fn new(width: u32, height: u32) -> Self {
        let mut canvas = Self {
            image: RgbaImage::new(width, height),
            scale: 1.0,
        };
        canvas.clear_to(Hsb::NIGHT_SKY);
        canvas
    }

    /// Create a canvas covering `viewport` world units at `scale` pixels per
    /// unit.
    pub fn for_viewport(viewport: Vec2, scale: f32) -> Self {
        let size = (viewport * scale).ceil().max(Vec2::ONE);
        let mut canvas = Self::new(size.x as u32, size.y as u32);
        canvas.scale = scale;
        canvas
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pixels per world unit.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Fill the whole canvas with an opaque color.
    pub fn clear_to(&mut self, color: Hsb) {
        let pixel = to_pixel(color.to_rgba(100.0));
        for p in self.image.pixels_mut() {
            *p = pixel;
        }
    }

    /// Write the current contents to an image file; the format follows the
    /// extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let path = path.as_ref();
        let format = ImageFormat::from_path(path)?;
        let bytes = self.capture(format)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Draw everything within `radius` of the segment `a`-`b` (pixel space).
    fn fill_capsule(&mut self, a: Vec2, b: Vec2, radius: f32, color: Vec4) {
        // Sub-pixel shapes are widened to one pixel and dimmed instead.
        let coverage = (radius * 2.0).min(1.0);
        let radius = radius.max(0.5);
        let color = Vec4::new(color.x, color.y, color.z, color.w * coverage);
        if color.w <= 0.0 {
            return;
        }

        if self.image.width() == 0 || self.image.height() == 0 {
            return;
        }

        let min = a.min(b) - Vec2::splat(radius);
        let max = a.max(b) + Vec2::splat(radius);
        let (w, h) = (self.image.width() as f32, self.image.height() as f32);
        if max.x < 0.0 || max.y < 0.0 || min.x >= w || min.y >= h {
            return;
        }
        let x0 = min.x.max(0.0).floor() as u32;
        let y0 = min.y.max(0.0).floor() as u32;
        let x1 = max.x.min(w - 1.0).ceil() as u32;
        let y1 = max.y.min(h - 1.0).ceil() as u32;

        let ab = b - a;
        let len_sq = ab.length_squared();
        let r_sq = radius * radius;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let t = if len_sq > 0.0 {
                    ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                if (p - (a + ab * t)).length_squared() <= r_sq {
                    blend(self.image.get_pixel_mut(x, y), color);
                }
            }
        }
    }
}

impl Canvas for RasterCanvas {
    fn line(&mut self, from: Vec2, to: Vec2, color: Vec4, width: f32) {
        let s = self.scale;
        self.fill_capsule(from * s, to * s, width * s * 0.5, color);
    }

    fn disc(&mut self, center: Vec2, diameter: f32, color: Vec4) {
        let c = center * self.scale;
        self.fill_capsule(c, c, diameter * self.scale * 0.5, color);
    }

    fn capture(&self, format: ImageFormat) -> Result<Vec<u8>, ExportError> {
        let image = match format {
            ImageFormat::Png => DynamicImage::ImageRgba8(self.image.clone()),
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(self.image.clone()).to_rgb8()),
            other => return Err(ExportError::UnsupportedFormat(format!("{other:?}"))),
        };
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, format)?;
        Ok(bytes.into_inner())
    }
}

fn to_pixel(color: Vec4) -> Rgba<u8> {
    let c = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    Rgba([c.x as u8, c.y as u8, c.z as u8, c.w as u8])
}

/// Source-over blend of a straight-alpha color onto `dst`.
fn blend(dst: &mut Rgba<u8>, src: Vec4) {
    let a = src.w.clamp(0.0, 1.0);
    let d = Vec4::new(dst[0] as f32, dst[1] as f32, dst[2] as f32, dst[3] as f32) / 255.0;
    let rgb = src.truncate() * a + d.truncate() * (1.0 - a);
    let alpha = a + d.w * (1.0 - a);
    *dst = to_pixel(rgb.extend(alpha));
}
