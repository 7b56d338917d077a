use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SignalFault;
use crate::pulse::{Channel, PulseWidth};

/// Inclusive range of widths accepted from any source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalRange {
    pub min_us: u32,
    pub max_us: u32,
}

impl Default for SignalRange {
    fn default() -> Self {
        Self { min_us: 900, max_us: 2000 }
    }
}

impl SignalRange {
    pub fn acceptable(&self, width: PulseWidth) -> bool {
        (self.min_us..=self.max_us).contains(&width.as_us())
    }

    pub fn check(&self, width: PulseWidth) -> Result<PulseWidth, SignalFault> {
        if width.is_none() {
            Err(SignalFault::Timeout)
        } else if self.acceptable(width) {
            Ok(width)
        } else {
            Err(SignalFault::OutOfRange { width })
        }
    }
}

/// `900 <= width <= 2000`
pub fn acceptable(width: PulseWidth) -> bool {
    SignalRange::default().acceptable(width)
}

/// What replaces a reading that cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailsafePolicy {
    /// Any unacceptable reading is replaced by the last applied output.
    #[default]
    HoldLast,
    /// Only a timeout (0) is replaced, by the fixed default. Other widths
    /// pass through unchecked, out-of-range ones included.
    ZeroDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validated {
    pub value: PulseWidth,
    pub fault: Option<SignalFault>,
}

impl Validated {
    pub fn is_ok(&self) -> bool {
        self.fault.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Validator {
    range: SignalRange,
    policy: FailsafePolicy,
}

impl Validator {
    pub fn new(range: SignalRange, policy: FailsafePolicy) -> Self {
        Self { range, policy }
    }

    pub fn policy(&self) -> FailsafePolicy {
        self.policy
    }

    /// `previous` is the last applied output for the channel, `default` the
    /// fixed failsafe value.
    pub fn select(&self, reading: PulseWidth, previous: PulseWidth, default: PulseWidth) -> Validated {
        let checked = self.range.check(reading);
        match self.policy {
            FailsafePolicy::HoldLast => match checked {
                Ok(value) => Validated { value, fault: None },
                Err(fault) => Validated { value: previous, fault: Some(fault) },
            },
            FailsafePolicy::ZeroDefault => {
                let value = if reading.is_none() { default } else { reading };
                Validated { value, fault: checked.err() }
            }
        }
    }
}

/// Tracks per-channel fault state so a sustained dropout logs once on entry
/// and once on recovery instead of every cycle.
#[derive(Debug, Default)]
pub struct ChannelHealth {
    faulted: bool,
    faulted_cycles: u64,
}

impl ChannelHealth {
    pub fn observe(&mut self, channel: Channel, v: &Validated) {
        match (self.faulted, v.fault) {
            (false, Some(fault)) => {
                warn!("{}: {}; substituting {}", channel, fault, v.value);
                self.faulted = true;
                self.faulted_cycles = 1;
            }
            (true, Some(fault)) => {
                self.faulted_cycles += 1;
                debug!("{}: {} (cycle {})", channel, fault, self.faulted_cycles);
            }
            (true, None) => {
                info!("{}: signal restored after {} cycles", channel, self.faulted_cycles);
                self.faulted = false;
                self.faulted_cycles = 0;
            }
            (false, None) => {}
        }
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub fn faulted_cycles(&self) -> u64 {
        self.faulted_cycles
    }
}
