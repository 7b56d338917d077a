//! Boundary to the hardware the core does not own: pulse acquisition,
//! actuator outputs, the liveness indicator and the diagnostics stream.

use std::sync::Arc;
use std::time::{Duration, Instant};

use helm_proto::diagnostics::DiagnosticFrame;

use crate::error::HalError;
use crate::pulse::PulseWidth;

/// Blocking measurement of a single high pulse on one line.
pub trait PulseReader {
    /// Returns `PulseWidth::NONE` if no complete pulse is seen within `timeout_us`.
    fn measure(&mut self, timeout_us: u32) -> PulseWidth;
}

/// Instantaneous level of a digital input.
pub trait LineLevel {
    fn is_high(&mut self) -> bool;
}

/// Free-running microsecond counter. Wraps at `u32::MAX`; callers subtract
/// with `wrapping_sub`.
pub trait Clock {
    fn now_us(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_us(&self) -> u32 {
        (**self).now_us()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }

    /// Untruncated time since construction.
    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> u32 {
        // truncation is the wrap
        self.origin.elapsed().as_micros() as u32
    }
}

/// One PWM output, commanded in microseconds.
pub trait Actuator {
    fn write_us(&mut self, width: PulseWidth) -> Result<(), HalError>;
}

pub trait Indicator {
    fn set(&mut self, on: bool) -> Result<(), HalError>;
}

/// Receives one frame per cycle. Implementations must not block the loop.
pub trait DiagnosticSink {
    fn emit(&mut self, frame: &DiagnosticFrame);
}

#[derive(Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&mut self, _frame: &DiagnosticFrame) {}
}
