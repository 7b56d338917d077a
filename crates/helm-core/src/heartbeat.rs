use std::time::{Duration, Instant};

use tracing::warn;

use crate::hal::Indicator;

/// Liveness blinker. Toggles on wall time, not on cycle count, so a hung
/// loop shows up as a frozen indicator.
#[derive(Debug)]
pub struct Heartbeat {
    interval: Duration,
    last: Instant,
    on: bool,
}

impl Heartbeat {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self { interval, last: now, on: false }
    }

    /// New level if the interval has elapsed since the last toggle.
    pub fn poll(&mut self, now: Instant) -> Option<bool> {
        if now.saturating_duration_since(self.last) < self.interval {
            return None;
        }
        self.last = now;
        self.on = !self.on;
        Some(self.on)
    }

    pub fn service(&mut self, now: Instant, indicator: &mut dyn Indicator) {
        if let Some(on) = self.poll(now) {
            if let Err(e) = indicator.set(on) {
                warn!("heartbeat indicator: {:#}", e);
            }
        }
    }
}
