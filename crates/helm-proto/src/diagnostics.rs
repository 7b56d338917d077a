use serde::{Deserialize, Serialize};
use std::fmt;

/// Which source drives the actuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Manual,
    Autopilot,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Manual => f.write_str("manual"),
            Mode::Autopilot => f.write_str("autopilot"),
        }
    }
}

/// One control cycle as seen from the outside: outputs, every raw input and
/// the acceptability of the readings consulted for the active mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticFrame {
    pub ts_unix_ms: i64,
    pub cycle: u64,
    pub mode: Mode,
    pub steering_out: u32,
    pub throttle_out: u32,
    pub auto_steering_raw: u32,
    pub auto_throttle_raw: u32,
    pub manual_steering_raw: u32,
    pub manual_throttle_raw: u32,
    pub mode_switch_raw: u32,
    pub steering_ok: bool,
    pub throttle_ok: bool,
}

impl DiagnosticFrame {
    /// Field-debugging line: `so to | as at | ms mt sw | s_ok t_ok | mode`
    pub fn to_line(&self) -> String {
        format!(
            "{} {} | {} {} | {} {} {} | {} {} | {}",
            self.steering_out,
            self.throttle_out,
            self.auto_steering_raw,
            self.auto_throttle_raw,
            self.manual_steering_raw,
            self.manual_throttle_raw,
            self.mode_switch_raw,
            self.steering_ok as u8,
            self.throttle_ok as u8,
            self.mode,
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DiagnosticFrame {
        DiagnosticFrame {
            ts_unix_ms: 1_700_000_000_000,
            cycle: 7,
            mode: Mode::Manual,
            steering_out: 1450,
            throttle_out: 1600,
            auto_steering_raw: 0,
            auto_throttle_raw: 1520,
            manual_steering_raw: 1450,
            manual_throttle_raw: 1600,
            mode_switch_raw: 1004,
            steering_ok: true,
            throttle_ok: false,
        }
    }

    #[test]
    fn test_line_field_order() {
        assert_eq!(frame().to_line(), "1450 1600 | 0 1520 | 1450 1600 1004 | 1 0 | manual");
    }

    #[test]
    fn test_json_uses_lowercase_mode() {
        let mut f = frame();
        f.mode = Mode::Autopilot;
        let js = f.to_json().unwrap();
        assert!(js.contains("\"mode\":\"autopilot\""));
        assert!(js.contains("\"steering_ok\":true"));
        let back: DiagnosticFrame = serde_json::from_str(&js).unwrap();
        assert_eq!(back, f);
    }

    #[test]
    fn test_mode_defaults_to_manual() {
        assert_eq!(Mode::default(), Mode::Manual);
    }
}
