use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,

    /// Seconds since the clock was created or last reset.
    pub elapsed: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    pub frame_index: u64,
}

/// Produces `FrameTime` snapshots for one render loop.
///
/// Delta time is clamped so a stalled loop (debugger, minimized window,
/// blocking export) does not report absurd values.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Resets the delta baseline, e.g. after rendering was paused.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: now.saturating_duration_since(self.start).as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
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

    #[test]
    fn delta_is_clamped_and_frames_count_up() {
        let mut clock = FrameClock::with_clamps(Duration::from_millis(5), Duration::from_millis(10));
        let a = clock.tick();
        let b = clock.tick();
        assert_eq!((a.frame_index, b.frame_index), (0, 1));
        assert!(a.dt >= 0.005 && a.dt <= 0.010);
        assert!(b.elapsed >= a.elapsed);
    }
}
