use thiserror::Error;

use crate::pulse::PulseWidth;

/// Why a reading was not used. Handled inside the cycle by substitution,
/// never propagated.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalFault {
    #[error("no pulse within timeout")]
    Timeout,

    #[error("pulse width {width} outside accepted range")]
    OutOfRange { width: PulseWidth },
}

/// Failure reported by an external collaborator (actuator, indicator).
#[derive(Error, Debug)]
pub enum HalError {
    #[error("{output} write failed: {reason}")]
    Write { output: &'static str, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("signal range invalid: min {min_us} must be below max {max_us}")]
    InvalidRange { min_us: u32, max_us: u32 },

    #[error("mode.{name} band ({lo}, {hi}) is empty")]
    EmptyBand { name: &'static str, lo: u32, hi: u32 },

    #[error("mode.manual band must lie entirely below mode.autopilot band")]
    OverlappingBands,

    #[error("failsafe.{name}_default_us={width} outside signal range")]
    DefaultOutOfRange { name: &'static str, width: u32 },

    #[error("output.throttle_cap_us={cap} below signal.min_us={min_us}")]
    CapBelowRange { cap: u32, min_us: u32 },

    #[error("timing.pulse_timeout_us={0} shorter than one 50Hz frame")]
    TimeoutTooShort(u32),

    #[error("timing.heartbeat_ms must be > 0")]
    HeartbeatDisabled,

    #[error("timing.calibration is not supported")]
    CalibrationUnsupported,

    #[error("pin {pin} assigned to both {first} and {second}")]
    DuplicatePin { pin: u8, first: &'static str, second: &'static str },
}
