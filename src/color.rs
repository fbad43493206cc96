//! Colors and color roles.
//!
//! Particle colors live in HSB space with the ranges artists usually work in:
//! hue in degrees (0-360), saturation and brightness as percentages (0-100).
//! Alpha is never stored on a color; it is derived from a particle's remaining
//! lifespan at render time and passed separately.
//!
//! Which rules apply to a particle (color shifts, flashes, glow conversion)
//! is decided by its [`ColorRole`], never by comparing channel values.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// A color in HSB space.
///
/// # Example
///
/// ```ignore
/// let white_gold = Hsb::new(60.0, 20.0, 100.0);
/// let rgba = white_gold.to_rgba(100.0); // fully opaque
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsb {
    /// Hue in degrees, 0-360.
    pub hue: f32,
    /// Saturation, 0-100.
    pub saturation: f32,
    /// Brightness, 0-100.
    pub brightness: f32,
}

impl Hsb {
    /// Bright white, used for flashes.
    pub const WHITE: Hsb = Hsb::new(0.0, 0.0, 100.0);

    /// Night-sky background.
    pub const NIGHT_SKY: Hsb = Hsb::new(240.0, 10.0, 10.0);

    /// Create a color from hue (degrees), saturation and brightness (percent).
    pub const fn new(hue: f32, saturation: f32, brightness: f32) -> Self {
        Self {
            hue,
            saturation,
            brightness,
        }
    }

    /// Return a copy with a different brightness.
    pub fn with_brightness(self, brightness: f32) -> Self {
        Self { brightness, ..self }
    }

    /// Linearly interpolate every channel towards `other`.
    ///
    /// `t` is clamped to `0.0..=1.0`. Hue is interpolated numerically, not
    /// along the shortest arc.
    pub fn lerp(self, other: Hsb, t: f32) -> Hsb {
        let t = t.clamp(0.0, 1.0);
        Hsb {
            hue: self.hue + (other.hue - self.hue) * t,
            saturation: self.saturation + (other.saturation - self.saturation) * t,
            brightness: self.brightness + (other.brightness - self.brightness) * t,
        }
    }

    /// Convert to RGB with channels in 0.0-1.0.
    pub fn to_rgb(self) -> Vec3 {
        let h = (self.hue / 360.0).rem_euclid(1.0);
        let s = (self.saturation / 100.0).clamp(0.0, 1.0);
        let v = (self.brightness / 100.0).clamp(0.0, 1.0);
        hsv_to_rgb(h, s, v)
    }

    /// Convert to RGBA, taking alpha on the same 0-100 scale as the other
    /// channels. Alpha outside that range is clamped.
    pub fn to_rgba(self, alpha: f32) -> Vec4 {
        self.to_rgb().extend((alpha / 100.0).clamp(0.0, 1.0))
    }
}

/// Convert HSV (all channels 0.0-1.0) to RGB.
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Vec3 {
    let c = v * s;
    let x = c * (1.0 - ((h * 6.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match (h * 6.0) as u32 % 6 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Vec3::new(r + m, g + m, b + m)
}

/// What a particle is, as far as color rules are concerned.
///
/// Every particle carries exactly one role, assigned when it is spawned and
/// changed only by glow conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorRole {
    /// Exhaust left behind while the firework climbs.
    AscentTrail,
    /// The small first burst at the top of the climb.
    PrimaryBurst,
    /// The main explosion and its sparkle follow-ups.
    MainBurst,
    /// Short-range clusters scattered around the explosion.
    MicroCluster,
    /// A fading particle turned into a slowly dimming glow dot.
    ConvertedGlow,
}
