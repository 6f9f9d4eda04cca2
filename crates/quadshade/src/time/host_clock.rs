use std::time::{Duration, Instant};

/// Monotonic clock anchored at host start.
///
/// Copies share the same origin, so every instance attached by one host
/// reports the same time.
#[derive(Debug, Copy, Clone)]
pub struct HostClock {
    origin: Instant,
}

impl HostClock {
    /// Starts a clock at the current instant.
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Clock whose origin lies `elapsed` in the past.
    pub fn started_ago(elapsed: Duration) -> Self {
        let now = Instant::now();
        Self {
            origin: now.checked_sub(elapsed).unwrap_or(now),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    /// Seconds since the origin, as pushed to `uTime`.
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed().as_secs_f32()
    }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::start()
    }
}
