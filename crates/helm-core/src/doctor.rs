use crate::error::ConfigError;
use crate::ArbiterConfig;

/// One 50 Hz frame plus margin; a shorter receiver timeout would miss pulses.
const MIN_PULSE_TIMEOUT_US: u32 = 25_000;

pub fn check_config(cfg: &ArbiterConfig) -> Result<(), ConfigError> {
    let r = cfg.signal;
    if r.min_us >= r.max_us {
        return Err(ConfigError::InvalidRange { min_us: r.min_us, max_us: r.max_us });
    }

    for (name, (lo, hi)) in [("manual", cfg.mode.manual), ("autopilot", cfg.mode.autopilot)] {
        // exclusive bounds: need at least one width strictly between
        if hi <= lo.saturating_add(1) {
            return Err(ConfigError::EmptyBand { name, lo, hi });
        }
    }
    if cfg.mode.manual.1 > cfg.mode.autopilot.0 {
        return Err(ConfigError::OverlappingBands);
    }

    for (name, width) in [
        ("steering", cfg.failsafe.steering_default_us),
        ("throttle", cfg.failsafe.throttle_default_us),
    ] {
        if !(r.min_us..=r.max_us).contains(&width) {
            return Err(ConfigError::DefaultOutOfRange { name, width });
        }
    }

    if cfg.output.throttle_cap_us < r.min_us {
        return Err(ConfigError::CapBelowRange { cap: cfg.output.throttle_cap_us, min_us: r.min_us });
    }

    if cfg.timing.pulse_timeout_us < MIN_PULSE_TIMEOUT_US {
        return Err(ConfigError::TimeoutTooShort(cfg.timing.pulse_timeout_us));
    }
    if cfg.timing.heartbeat_ms == 0 {
        return Err(ConfigError::HeartbeatDisabled);
    }
    if cfg.timing.calibration {
        return Err(ConfigError::CalibrationUnsupported);
    }

    let pins = cfg.pins.all();
    for (i, (first, pin)) in pins.iter().enumerate() {
        if let Some((second, _)) = pins[i + 1..].iter().find(|(_, p)| p == pin) {
            return Err(ConfigError::DuplicatePin { pin: *pin, first: *first, second: *second });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass() {
        assert_eq!(check_config(&ArbiterConfig::default()), Ok(()));
    }

    #[test]
    fn test_rejects_inverted_range() {
        let mut cfg = ArbiterConfig::default();
        cfg.signal.min_us = 2000;
        cfg.signal.max_us = 1000;
        assert!(matches!(check_config(&cfg), Err(ConfigError::InvalidRange { .. })));
    }

    #[test]
    fn test_rejects_overlapping_bands() {
        let mut cfg = ArbiterConfig::default();
        cfg.mode.manual = (900, 1600);
        cfg.mode.autopilot = (1500, 2100);
        assert_eq!(check_config(&cfg), Err(ConfigError::OverlappingBands));
    }

    #[test]
    fn test_rejects_empty_band() {
        let mut cfg = ArbiterConfig::default();
        cfg.mode.autopilot = (2000, 2001);
        assert!(matches!(check_config(&cfg), Err(ConfigError::EmptyBand { name: "autopilot", .. })));
    }

    #[test]
    fn test_rejects_default_outside_range() {
        let mut cfg = ArbiterConfig::default();
        cfg.failsafe.throttle_default_us = 800;
        assert_eq!(
            check_config(&cfg),
            Err(ConfigError::DefaultOutOfRange { name: "throttle", width: 800 })
        );
    }

    #[test]
    fn test_rejects_calibration() {
        let mut cfg = ArbiterConfig::default();
        cfg.timing.calibration = true;
        assert_eq!(check_config(&cfg), Err(ConfigError::CalibrationUnsupported));
    }

    #[test]
    fn test_rejects_short_timeout() {
        let mut cfg = ArbiterConfig::default();
        cfg.timing.pulse_timeout_us = 10_000;
        assert_eq!(check_config(&cfg), Err(ConfigError::TimeoutTooShort(10_000)));
    }

    #[test]
    fn test_rejects_duplicate_pin() {
        let mut cfg = ArbiterConfig::default();
        cfg.pins.throttle_out = cfg.pins.steering_out;
        assert_eq!(
            check_config(&cfg),
            Err(ConfigError::DuplicatePin { pin: 8, first: "steering_out", second: "throttle_out" })
        );
    }
}
