//! The external tick source.
//!
//! [`FrameClock`] hands out a monotonic frame counter for
//! [`FireworkSystem::advance_and_render`](crate::FireworkSystem::advance_and_render)
//! and answers elapsed-time queries. The simulation itself counts in ticks
//! and never looks at wall time.
//!
//! # Example
//!
//! ```ignore
//! use skyburst::time::FrameClock;
//!
//! let mut clock = FrameClock::new();
//!
//! // Once per display refresh:
//! let frame = clock.tick();
//! system.advance_and_render(frame, &mut canvas);
//!
//! println!("frame {} after {:.2}s ({:.1} fps)", clock.frame(), clock.elapsed(), clock.fps());
//! ```

use std::time::{Duration, Instant};

/// Frame counter plus wall-clock bookkeeping.
#[derive(Debug)]
pub struct FrameClock {
    start: Instant,
    /// Seconds since start.
    elapsed_secs: f32,
    frame: u64,
    fps: f32,
    fps_frame: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    /// Report this delta instead of measured time, for offline rendering.
    fixed_delta: Option<f32>,
}

impl FrameClock {
    /// Create a clock at frame 0, starting now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            elapsed_secs: 0.0,
            frame: 0,
            fps: 0.0,
            fps_frame: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            fixed_delta: None,
        }
    }

    /// Create a clock for offline rendering: every tick lasts `1 / fps`
    /// seconds of show time regardless of how long it really took.
    pub fn fixed(fps: f32) -> Self {
        let mut clock = Self::new();
        clock.fixed_delta = Some(1.0 / fps.max(f32::EPSILON));
        clock
    }

    /// Advance to the next frame and return its number.
    pub fn tick(&mut self) -> u64 {
        let now = Instant::now();
        self.frame += 1;

        self.elapsed_secs = match self.fixed_delta {
            Some(fixed) => fixed * self.frame as f32,
            None => now.duration_since(self.start).as_secs_f32(),
        };

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            self.fps = (self.frame - self.fps_frame) as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame = self.frame;
            self.fps_update_time = now;
        }

        self.frame
    }

    /// Current frame number; 0 before the first tick.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Seconds since start; show time for a fixed clock.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Ticks per wall-clock second, refreshed twice a second. Measured even
    /// for a fixed clock, so it reports how fast frames are being produced.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
