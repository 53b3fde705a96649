use std::time::Instant;

use vp_core::ports::ClockPort;

/// Milliseconds elapsed since the clock was created.
///
/// Backed by `Instant`, so wall-clock adjustments never move it.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for MonotonicClock {
    fn now_ms(&self) -> i64 {
        i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX)
    }
}
