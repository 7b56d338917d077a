use std::sync::atomic::{AtomicU64, Ordering};

use helm_core::hal::{Clock, MonotonicClock};

/// Virtual time moved by one `now_us` read.
pub const VIRTUAL_TICK_US: u64 = 1;

/// Wall time, or virtual time that advances one tick every time the poll
/// loop reads the counter.
#[derive(Debug)]
pub enum SimClock {
    Wall(MonotonicClock),
    Virtual(AtomicU64),
}

impl SimClock {
    pub fn wall() -> Self {
        SimClock::Wall(MonotonicClock::new())
    }

    pub fn simulated() -> Self {
        SimClock::Virtual(AtomicU64::new(0))
    }

    pub fn is_wall(&self) -> bool {
        matches!(self, SimClock::Wall(_))
    }

    /// Scenario time. Reading it never advances a virtual clock.
    pub fn elapsed_us(&self) -> u64 {
        match self {
            SimClock::Wall(c) => c.elapsed().as_micros() as u64,
            SimClock::Virtual(t) => t.load(Ordering::Acquire),
        }
    }
}

impl Clock for SimClock {
    fn now_us(&self) -> u32 {
        match self {
            SimClock::Wall(c) => c.now_us(),
            // truncation is the wrap
            SimClock::Virtual(t) => t.fetch_add(VIRTUAL_TICK_US, Ordering::AcqRel) as u32,
        }
    }
}
