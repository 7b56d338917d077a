pub mod capture;
pub mod compose;
pub mod doctor;
pub mod error;
pub mod hal;
pub mod heartbeat;
pub mod mode;
pub mod poll;
pub mod pulse;
pub mod scheduler;
pub mod validate;

use serde::Deserialize;

use crate::compose::OutputConfig;
use crate::mode::SwitchBands;
use crate::pulse::PulseWidth;
use crate::validate::{FailsafePolicy, SignalRange};

pub use helm_proto::diagnostics::{DiagnosticFrame, Mode};

/// Everything the arbitration core needs to know, one TOML section per concern.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    pub signal: SignalRange,
    pub mode: SwitchBands,
    pub failsafe: FailsafeConfig,
    pub output: OutputConfig,
    pub timing: TimingConfig,
    pub pins: PinMap,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FailsafeConfig {
    /// `hold-last` (default) or `zero-default`. Applies to both channels.
    pub policy: FailsafePolicy,

    /// Startup output, and the substitute under `zero-default`.
    pub steering_default_us: u32,
    pub throttle_default_us: u32,
}

impl Default for FailsafeConfig {
    fn default() -> Self {
        Self {
            policy: FailsafePolicy::HoldLast,
            steering_default_us: 1500,
            throttle_default_us: 900,
        }
    }
}

impl FailsafeConfig {
    pub fn steering_default(&self) -> PulseWidth {
        PulseWidth::from_us(self.steering_default_us)
    }

    pub fn throttle_default(&self) -> PulseWidth {
        PulseWidth::from_us(self.throttle_default_us)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Bounded wait per receiver channel
    pub pulse_timeout_us: u32,

    /// Liveness indicator toggle interval
    pub heartbeat_ms: u64,

    /// Settle time after writing startup outputs. 0 skips it.
    pub startup_delay_ms: u64,

    /// ESC calibration on boot. Not supported; must stay false.
    pub calibration: bool,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            pulse_timeout_us: poll::DEFAULT_TIMEOUT_US,
            heartbeat_ms: 333,
            startup_delay_ms: 3000,
            calibration: false,
        }
    }
}

/// Wiring map. Informational on hosted targets, logged at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PinMap {
    pub mode_switch: u8,
    pub manual_steering: u8,
    pub manual_throttle: u8,
    pub auto_steering: u8,
    pub auto_throttle: u8,
    pub steering_out: u8,
    pub throttle_out: u8,
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            mode_switch: 4,
            manual_steering: 2,
            manual_throttle: 3,
            auto_steering: 6,
            auto_throttle: 5,
            steering_out: 8,
            throttle_out: 7,
        }
    }
}

impl PinMap {
    pub fn all(&self) -> [(&'static str, u8); 7] {
        [
            ("mode_switch", self.mode_switch),
            ("manual_steering", self.manual_steering),
            ("manual_throttle", self.manual_throttle),
            ("auto_steering", self.auto_steering),
            ("auto_throttle", self.auto_throttle),
            ("steering_out", self.steering_out),
            ("throttle_out", self.throttle_out),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg: ArbiterConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.signal.min_us, 900);
        assert_eq!(cfg.signal.max_us, 2000);
        assert_eq!(cfg.failsafe.policy, FailsafePolicy::HoldLast);
        assert_eq!(cfg.failsafe.steering_default_us, 1500);
        assert_eq!(cfg.failsafe.throttle_default_us, 900);
        assert_eq!(cfg.output.throttle_cap_us, 2000);
        assert_eq!(cfg.timing.pulse_timeout_us, 100_000);
        assert_eq!(cfg.timing.heartbeat_ms, 333);
        assert!(!cfg.timing.calibration);
    }

    #[test]
    fn test_partial_sections() {
        let cfg: ArbiterConfig = toml::from_str(
            r#"
            [failsafe]
            policy = "zero-default"

            [mode]
            autopilot = [1850, 2150]

            [timing]
            startup_delay_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.failsafe.policy, FailsafePolicy::ZeroDefault);
        assert_eq!(cfg.failsafe.throttle_default_us, 900);
        assert_eq!(cfg.mode.autopilot, (1850, 2150));
        assert_eq!(cfg.mode.manual, (900, 1100));
        assert_eq!(cfg.timing.startup_delay_ms, 0);
        assert_eq!(cfg.timing.heartbeat_ms, 333);
    }

    #[test]
    fn test_pin_map_lists_every_line() {
        let pins = PinMap::default();
        let all = pins.all();
        assert_eq!(all.len(), 7);
        assert!(all.iter().any(|(n, p)| *n == "auto_steering" && *p == 6));
    }
}
