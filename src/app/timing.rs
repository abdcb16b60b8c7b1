use std::time::{Duration, Instant};

const NOMINAL_STEP: f32 = 1.0 / 60.0;
const MAX_STEP: f32 = 0.1;
const RATE_WINDOW: Duration = Duration::from_millis(500);

/// Camera step clock plus a frame-rate sampler for the window title.
pub struct FrameClock {
    previous: Option<Instant>,
    window_start: Instant,
    frames: u32,
}

impl FrameClock {
    pub fn new(now: Instant) -> Self {
        Self {
            previous: None,
            window_start: now,
            frames: 0,
        }
    }

    /// Seconds since the previous tick, capped at `MAX_STEP`. The first tick
    /// after a pause returns a nominal 60 Hz step.
    pub fn tick(&mut self, now: Instant) -> f32 {
        self.frames = self.frames.saturating_add(1);
        let step = self
            .previous
            .map_or(NOMINAL_STEP, |previous| now.saturating_duration_since(previous).as_secs_f32());
        self.previous = Some(now);
        step.min(MAX_STEP)
    }

    /// Frames per second over the last half second, once per window.
    pub fn sample_rate(&mut self, now: Instant) -> Option<f32> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < RATE_WINDOW {
            return None;
        }
        let rate = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.window_start = now;
        Some(rate)
    }

    pub fn pause(&mut self) {
        self.previous = None;
    }
}
