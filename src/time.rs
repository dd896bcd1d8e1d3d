pub use std::time::Instant;

/// Tracks elapsed and per-frame time for the application loop.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    elapsed: f32,
    delta: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            elapsed: 0.0,
            delta: 0.0,
        }
    }

    /// Advances the clock to `now`.
    pub fn tick_at(&mut self, now: Instant) {
        self.delta = now.saturating_duration_since(self.last).as_secs_f32();
        self.elapsed = now.saturating_duration_since(self.start).as_secs_f32();
        self.last = now;
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Seconds since the clock was created.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Seconds between the last two ticks.
    pub fn delta(&self) -> f32 {
        self.delta
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn tick_tracks_delta_and_elapsed() {
        let mut clock = FrameClock::new();
        let start = clock.start;
        clock.tick_at(start + Duration::from_millis(100));
        clock.tick_at(start + Duration::from_millis(250));

        assert!((clock.delta() - 0.15).abs() < 1e-4);
        assert!((clock.elapsed() - 0.25).abs() < 1e-4);
    }
}
