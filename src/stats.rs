// stats.rs -- Frame-rate accounting.
//
// Frames are counted as they complete; once per sampling interval the
// count is divided by the elapsed wall time and the counter restarts.
// Callers that want deterministic tests pass explicit `Instant`s through
// the `*_at` variants.

use std::time::{Duration, Instant};

/// Counts frames and reports frames-per-second once per interval.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    interval: Duration,
    window_start: Instant,
    frames: u32,
    total_frames: u64,
    last_fps: Option<f64>,
}

impl FpsCounter {
    /// A counter that reports once per `interval`.
    ///
    /// # Panics
    /// Panics if `interval` is zero.
    pub fn new(interval: Duration) -> Self {
        Self::new_at(interval, Instant::now())
    }

    pub fn new_at(interval: Duration, now: Instant) -> Self {
        assert!(!interval.is_zero(), "interval must be non-zero");
        FpsCounter {
            interval,
            window_start: now,
            frames: 0,
            total_frames: 0,
            last_fps: None,
        }
    }

    /// Record one completed frame.
    pub fn tick(&mut self) {
        self.frames += 1;
        self.total_frames += 1;
    }

    /// Return a fresh FPS value if the interval has elapsed, and start a
    /// new window.
    pub fn sample(&mut self) -> Option<f64> {
        self.sample_at(Instant::now())
    }

    pub fn sample_at(&mut self, now: Instant) -> Option<f64> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.interval {
            return None;
        }
        let fps = self.frames as f64 / elapsed.as_secs_f64();
        self.frames = 0;
        self.window_start = now;
        self.last_fps = Some(fps);
        Some(fps)
    }

    /// The most recent sample, if any.
    pub fn last_fps(&self) -> Option<f64> {
        self.last_fps
    }

    /// Frames recorded since construction.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}

impl Default for FpsCounter {
    /// One-second sampling interval.
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
