use anyhow::Result;
use serde::Deserialize;

use helm_core::pulse::{Channel, PulseWidth};

/// A stretch of time with fixed scripted widths on all five inputs.
/// A width of 0 means the line is silent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Segment {
    pub duration_ms: u64,
    pub switch: u32,
    pub manual_steering: u32,
    pub manual_throttle: u32,
    pub auto_steering: u32,
    pub auto_throttle: u32,
}

impl Default for Segment {
    fn default() -> Self {
        Self {
            duration_ms: 1000,
            switch: 1000,
            manual_steering: 1500,
            manual_throttle: 900,
            auto_steering: 1500,
            auto_throttle: 900,
        }
    }
}

impl Segment {
    pub fn width(&self, ch: Channel) -> PulseWidth {
        let us = match ch {
            Channel::ModeSwitch => self.switch,
            Channel::ManualSteering => self.manual_steering,
            Channel::ManualThrottle => self.manual_throttle,
            Channel::AutoSteering => self.auto_steering,
            Channel::AutoThrottle => self.auto_throttle,
        };
        PulseWidth::from_us(us)
    }
}

/// Segments back to back; the last one holds forever.
#[derive(Debug, Clone)]
pub struct Timeline {
    segments: Vec<Segment>,
    ends_us: Vec<u64>,
}

impl Timeline {
    pub fn new(segments: Vec<Segment>) -> Result<Self> {
        anyhow::ensure!(!segments.is_empty(), "sim scenario needs at least one segment");
        let mut ends_us = Vec::with_capacity(segments.len());
        let mut t = 0u64;
        for (i, s) in segments.iter().enumerate() {
            anyhow::ensure!(s.duration_ms > 0, "sim.segment[{}].duration_ms must be > 0", i);
            t = s
                .duration_ms
                .checked_mul(1000)
                .and_then(|us| t.checked_add(us))
                .ok_or_else(|| anyhow::anyhow!("sim.segment[{}].duration_ms overflows the scenario clock", i))?;
            ends_us.push(t);
        }
        Ok(Self { segments, ends_us })
    }

    pub fn at(&self, t_us: u64) -> &Segment {
        let i = self.ends_us.partition_point(|&end| end <= t_us);
        &self.segments[i.min(self.segments.len() - 1)]
    }

    pub fn total_us(&self) -> u64 {
        self.ends_us.last().copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(duration_ms: u64, switch: u32) -> Segment {
        Segment { duration_ms, switch, ..Segment::default() }
    }

    #[test]
    fn test_lookup_by_time() {
        let tl = Timeline::new(vec![seg(100, 1000), seg(50, 2000), seg(10, 1500)]).unwrap();
        assert_eq!(tl.total_us(), 160_000);
        assert_eq!(tl.at(0).switch, 1000);
        assert_eq!(tl.at(99_999).switch, 1000);
        assert_eq!(tl.at(100_000).switch, 2000);
        assert_eq!(tl.at(149_999).switch, 2000);
        assert_eq!(tl.at(150_000).switch, 1500);
        // last segment holds
        assert_eq!(tl.at(10_000_000).switch, 1500);
    }

    #[test]
    fn test_rejects_empty_and_zero_length() {
        assert!(Timeline::new(vec![]).is_err());
        assert!(Timeline::new(vec![seg(0, 1000)]).is_err());
    }

    #[test]
    fn test_rejects_overflowing_duration() {
        assert!(Timeline::new(vec![seg(u64::MAX, 1000)]).is_err());
        let half = u64::MAX / 1000 / 2 + 1;
        assert!(Timeline::new(vec![seg(half, 1000), seg(half, 2000)]).is_err());
        assert!(Timeline::new(vec![seg(half, 1000)]).is_ok());
    }

    #[test]
    fn test_segment_from_toml() {
        let s: Segment = toml::from_str("duration_ms = 250\nauto_throttle = 2100").unwrap();
        assert_eq!(s.duration_ms, 250);
        assert_eq!(s.width(Channel::AutoThrottle).as_us(), 2100);
        assert_eq!(s.width(Channel::ModeSwitch).as_us(), 1000);
    }
}
