use serde::Deserialize;
use tracing::warn;

use crate::hal::Actuator;
use crate::pulse::PulseWidth;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Hard ceiling on throttle regardless of source
    pub throttle_cap_us: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { throttle_cap_us: 2000 }
    }
}

/// Last applied outputs. Doubles as next cycle's hold-last fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputState {
    pub steering: PulseWidth,
    pub throttle: PulseWidth,
}

impl OutputState {
    pub const STARTUP: Self = Self {
        steering: PulseWidth::from_us(1500),
        throttle: PulseWidth::from_us(900),
    };

    pub fn new(steering: PulseWidth, throttle: PulseWidth) -> Self {
        Self { steering, throttle }
    }
}

impl Default for OutputState {
    fn default() -> Self {
        Self::STARTUP
    }
}

pub struct ActuatorPair {
    pub steering: Box<dyn Actuator + Send>,
    pub throttle: Box<dyn Actuator + Send>,
}

impl ActuatorPair {
    pub fn new(steering: Box<dyn Actuator + Send>, throttle: Box<dyn Actuator + Send>) -> Self {
        Self { steering, throttle }
    }

    /// Writes both outputs. A failing output is logged; the other is still written.
    pub fn write(&mut self, out: &OutputState) {
        if let Err(e) = self.steering.write_us(out.steering) {
            warn!("steering output: {:#}", e);
        }
        if let Err(e) = self.throttle.write_us(out.throttle) {
            warn!("throttle output: {:#}", e);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OutputComposer {
    throttle_cap: PulseWidth,
}

impl OutputComposer {
    pub fn new(cfg: OutputConfig) -> Self {
        Self { throttle_cap: PulseWidth::from_us(cfg.throttle_cap_us) }
    }

    pub fn cap_throttle(&self, throttle: PulseWidth) -> PulseWidth {
        throttle.min(self.throttle_cap)
    }

    /// Cap, record as the new fallback, then command the actuators. No lower
    /// bound is applied here.
    pub fn compose(
        &self,
        state: &mut OutputState,
        steering: PulseWidth,
        throttle: PulseWidth,
        actuators: &mut ActuatorPair,
    ) -> OutputState {
        *state = OutputState { steering, throttle: self.cap_throttle(throttle) };
        actuators.write(state);
        *state
    }
}
