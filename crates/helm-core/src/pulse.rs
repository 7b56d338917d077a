use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of one PWM high pulse in microseconds. Zero means no pulse was seen
/// before the measurement timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PulseWidth(u32);

impl PulseWidth {
    pub const NONE: Self = Self(0);

    pub const fn from_us(us: u32) -> Self {
        Self(us)
    }

    pub const fn as_us(self) -> u32 {
        self.0
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for PulseWidth {
    fn from(us: u32) -> Self {
        Self(us)
    }
}

impl fmt::Display for PulseWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    ModeSwitch,
    ManualSteering,
    ManualThrottle,
    AutoSteering,
    AutoThrottle,
}

impl Channel {
    pub const COUNT: usize = 5;

    pub fn name(self) -> &'static str {
        match self {
            Channel::ModeSwitch => "mode_switch",
            Channel::ManualSteering => "manual_steering",
            Channel::ManualThrottle => "manual_throttle",
            Channel::AutoSteering => "auto_steering",
            Channel::AutoThrottle => "auto_throttle",
        }
    }

    /// Dense index for per-channel tables.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
