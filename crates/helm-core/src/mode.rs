use serde::Deserialize;
use tracing::info;

use crate::pulse::PulseWidth;

pub use helm_proto::diagnostics::Mode;

/// Mode-switch bands, exclusive on both ends. Anything outside both bands is
/// dead zone and leaves the mode alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SwitchBands {
    pub manual: (u32, u32),
    pub autopilot: (u32, u32),
}

impl Default for SwitchBands {
    fn default() -> Self {
        Self { manual: (900, 1100), autopilot: (1900, 2100) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchPosition {
    Low,
    High,
    DeadZone,
}

impl SwitchBands {
    pub fn classify(&self, width: PulseWidth) -> SwitchPosition {
        let w = width.as_us();
        let inside = |(lo, hi): (u32, u32)| w > lo && w < hi;
        if inside(self.manual) {
            SwitchPosition::Low
        } else if inside(self.autopilot) {
            SwitchPosition::High
        } else {
            SwitchPosition::DeadZone
        }
    }

    pub fn next_mode(&self, current: Mode, width: PulseWidth) -> Mode {
        match self.classify(width) {
            SwitchPosition::Low => Mode::Manual,
            SwitchPosition::High => Mode::Autopilot,
            SwitchPosition::DeadZone => current,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModeSelector {
    bands: SwitchBands,
}

impl ModeSelector {
    pub fn new(bands: SwitchBands) -> Self {
        Self { bands }
    }

    /// Returns true if the mode changed.
    pub fn update(&self, mode: &mut Mode, switch: PulseWidth) -> bool {
        let next = self.bands.next_mode(*mode, switch);
        if next == *mode {
            return false;
        }
        info!("mode: {} -> {} (switch={})", mode, next, switch);
        *mode = next;
        true
    }
}
