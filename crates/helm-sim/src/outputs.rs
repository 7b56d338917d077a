use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use helm_core::error::HalError;
use helm_core::hal::{Actuator, Indicator};
use helm_core::pulse::PulseWidth;

/// Read side of a simulated output, kept by whoever wants to watch it.
#[derive(Debug, Clone, Default)]
pub struct OutputProbe {
    last: Arc<AtomicU32>,
    writes: Arc<AtomicU64>,
}

impl OutputProbe {
    fn record(&self, value: u32) {
        self.last.store(value, Ordering::Release);
        self.writes.fetch_add(1, Ordering::AcqRel);
    }

    pub fn last(&self) -> u32 {
        self.last.load(Ordering::Acquire)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct SimActuator {
    name: &'static str,
    probe: OutputProbe,
}

impl SimActuator {
    pub fn new(name: &'static str) -> Self {
        Self { name, probe: OutputProbe::default() }
    }

    pub fn probe(&self) -> OutputProbe {
        self.probe.clone()
    }
}

impl Actuator for SimActuator {
    fn write_us(&mut self, width: PulseWidth) -> Result<(), HalError> {
        if width.is_none() {
            return Err(HalError::Write { output: self.name, reason: "zero-width pulse".into() });
        }
        trace!("{} <- {}", self.name, width);
        self.probe.record(width.as_us());
        Ok(())
    }
}

/// Heartbeat LED. `last()` on its probe is 1 while lit.
#[derive(Debug, Default)]
pub struct SimIndicator {
    probe: OutputProbe,
}

impl SimIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> OutputProbe {
        self.probe.clone()
    }
}

impl Indicator for SimIndicator {
    fn set(&mut self, on: bool) -> Result<(), HalError> {
        debug!("heartbeat {}", if on { "on" } else { "off" });
        self.probe.record(on as u32);
        Ok(())
    }
}
