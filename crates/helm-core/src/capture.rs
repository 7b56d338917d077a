//! Edge-driven measurement of the autopilot lines.
//!
//! Each line has one `EdgeCapture` cell. The edge source (an interrupt
//! handler on bare metal, a dedicated thread on hosted targets) is the only
//! writer; the control loop is the only reader. Every shared field is a
//! single atomic word, so the reader sees some complete past value and never
//! a torn one. It may be stale, which the validator deals with.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::pulse::PulseWidth;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Edge {
    Rising = 0,
    Falling = 1,
}

impl Edge {
    fn from_u8(v: u8) -> Self {
        if v == Edge::Falling as u8 { Edge::Falling } else { Edge::Rising }
    }
}

#[derive(Debug)]
pub struct EdgeCapture {
    rising_at_us: AtomicU32,
    latest_us: AtomicU32,
    waiting: AtomicU8,
}

impl EdgeCapture {
    pub const fn new() -> Self {
        Self {
            rising_at_us: AtomicU32::new(0),
            latest_us: AtomicU32::new(0),
            waiting: AtomicU8::new(Edge::Rising as u8),
        }
    }

    /// Edge handler. Never blocks. Edges other than the awaited one are
    /// dropped, matching a pin interrupt armed for one edge only.
    pub fn on_edge(&self, edge: Edge, now_us: u32) {
        if edge != self.waiting() {
            return;
        }
        match edge {
            Edge::Rising => {
                self.rising_at_us.store(now_us, Ordering::Relaxed);
                self.waiting.store(Edge::Falling as u8, Ordering::Release);
            }
            Edge::Falling => {
                let rose = self.rising_at_us.load(Ordering::Relaxed);
                self.latest_us.store(now_us.wrapping_sub(rose), Ordering::Release);
                self.waiting.store(Edge::Rising as u8, Ordering::Release);
            }
        }
    }

    /// Level-change notification, for sources that report the new level
    /// rather than the edge.
    pub fn on_level(&self, high: bool, now_us: u32) {
        let edge = if high { Edge::Rising } else { Edge::Falling };
        self.on_edge(edge, now_us);
    }

    /// Last completed pulse width. Zero until the first full pulse.
    pub fn latest(&self) -> PulseWidth {
        PulseWidth::from_us(self.latest_us.load(Ordering::Acquire))
    }

    pub fn waiting(&self) -> Edge {
        Edge::from_u8(self.waiting.load(Ordering::Acquire))
    }
}

impl Default for EdgeCapture {
    fn default() -> Self {
        Self::new()
    }
}

/// The two autopilot lines.
#[derive(Debug, Default)]
pub struct AutopilotCapture {
    pub steering: EdgeCapture,
    pub throttle: EdgeCapture,
}

impl AutopilotCapture {
    pub const fn new() -> Self {
        Self { steering: EdgeCapture::new(), throttle: EdgeCapture::new() }
    }

    /// (steering, throttle). The two loads are independent; the pair may
    /// come from different capture cycles.
    pub fn snapshot(&self) -> (PulseWidth, PulseWidth) {
        (self.steering.latest(), self.throttle.latest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn test_width_is_falling_minus_rising() {
        let cap = EdgeCapture::new();
        assert_eq!(cap.latest(), PulseWidth::NONE);
        assert_eq!(cap.waiting(), Edge::Rising);

        cap.on_edge(Edge::Rising, 10_000);
        assert_eq!(cap.waiting(), Edge::Falling);
        // still the previous value mid-pulse
        assert_eq!(cap.latest(), PulseWidth::NONE);

        cap.on_edge(Edge::Falling, 11_523);
        assert_eq!(cap.latest().as_us(), 1523);
        assert_eq!(cap.waiting(), Edge::Rising);
    }

    #[test]
    fn test_second_pulse_overwrites() {
        let cap = EdgeCapture::new();
        cap.on_edge(Edge::Rising, 0);
        cap.on_edge(Edge::Falling, 1200);
        cap.on_edge(Edge::Rising, 20_000);
        cap.on_edge(Edge::Falling, 21_850);
        assert_eq!(cap.latest().as_us(), 1850);
    }

    #[test]
    fn test_unexpected_edges_ignored() {
        let cap = EdgeCapture::new();
        // falling while waiting for rising
        cap.on_edge(Edge::Falling, 500);
        assert_eq!(cap.waiting(), Edge::Rising);
        assert_eq!(cap.latest(), PulseWidth::NONE);

        cap.on_edge(Edge::Rising, 1000);
        // a second rising must not restart the measurement
        cap.on_edge(Edge::Rising, 1400);
        cap.on_edge(Edge::Falling, 2500);
        assert_eq!(cap.latest().as_us(), 1500);
    }

    #[test]
    fn test_counter_wraparound() {
        let cap = EdgeCapture::new();
        cap.on_edge(Edge::Rising, u32::MAX - 499);
        cap.on_edge(Edge::Falling, 1000);
        assert_eq!(cap.latest().as_us(), 1500);
    }

    #[test]
    fn test_stale_value_kept_without_edges() {
        let cap = EdgeCapture::new();
        cap.on_level(true, 0);
        cap.on_level(false, 1700);
        cap.on_level(true, 20_000);
        // pulse never completes
        assert_eq!(cap.latest().as_us(), 1700);
    }

    #[test]
    fn test_concurrent_reader_sees_whole_values() {
        let caps = Arc::new(AutopilotCapture::new());
        let done = Arc::new(AtomicBool::new(false));
        let widths = [1100u32, 1500, 1900];

        let producer = {
            let caps = caps.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                let mut t = 0u32;
                for i in 0..20_000 {
                    let w = widths[i % widths.len()];
                    caps.steering.on_edge(Edge::Rising, t);
                    caps.steering.on_edge(Edge::Falling, t.wrapping_add(w));
                    t = t.wrapping_add(20_000);
                }
                done.store(true, Ordering::Release);
            })
        };

        while !done.load(Ordering::Acquire) {
            let (s, t) = caps.snapshot();
            assert!(s.is_none() || widths.contains(&s.as_us()), "torn read {}", s);
            assert!(t.is_none());
        }
        producer.join().unwrap();
        assert!(widths.contains(&caps.steering.latest().as_us()));
    }
}
