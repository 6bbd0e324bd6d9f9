//! Rate limiting for outbound presence updates.

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Default minimum spacing between two cursor updates.
pub const DEFAULT_CURSOR_THROTTLE_MS: u64 = 30;

/// Leading-edge throttle: the first call in a window fires, the rest drop.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_fire: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fire: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Pass `payload` through if the interval has elapsed, otherwise drop it.
    pub fn try_fire<T>(&mut self, now: Instant, payload: T) -> Option<T> {
        let ready = match self.last_fire {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        };
        if ready {
            self.last_fire = Some(now);
            Some(payload)
        } else {
            None
        }
    }

    /// Fire unconditionally and restart the window.
    pub fn force_fire<T>(&mut self, now: Instant, payload: T) -> T {
        self.last_fire = Some(now);
        payload
    }

    /// Forget the last fire time.
    pub fn reset(&mut self) {
        self.last_fire = None;
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_CURSOR_THROTTLE_MS))
    }
}
