//! Synchronous receiver polling.

use tracing::trace;

use crate::hal::{Clock, LineLevel, PulseReader};
use crate::pulse::PulseWidth;

/// 100 ms, enough for several 50 Hz frames.
pub const DEFAULT_TIMEOUT_US: u32 = 100_000;

/// Busy-waits for one complete high pulse on `line` and returns its width.
///
/// A pulse already in progress at the call is skipped, since its start was
/// missed. The whole wait, including the pulse itself, is bounded by
/// `timeout_us` from the call; on expiry the result is `PulseWidth::NONE`.
pub fn pulse_in<L, C>(line: &mut L, clock: &C, timeout_us: u32) -> PulseWidth
where
    L: LineLevel + ?Sized,
    C: Clock + ?Sized,
{
    let start = clock.now_us();
    let expired = |c: &C| c.now_us().wrapping_sub(start) >= timeout_us;

    while line.is_high() {
        if expired(clock) {
            return PulseWidth::NONE;
        }
    }
    while !line.is_high() {
        if expired(clock) {
            return PulseWidth::NONE;
        }
    }
    let rose = clock.now_us();
    while line.is_high() {
        if expired(clock) {
            return PulseWidth::NONE;
        }
    }
    PulseWidth::from_us(clock.now_us().wrapping_sub(rose))
}

/// `PulseReader` over a raw input line and a clock.
pub struct LinePulseReader<L, C> {
    line: L,
    clock: C,
}

impl<L: LineLevel, C: Clock> LinePulseReader<L, C> {
    pub fn new(line: L, clock: C) -> Self {
        Self { line, clock }
    }
}

impl<L: LineLevel, C: Clock> PulseReader for LinePulseReader<L, C> {
    fn measure(&mut self, timeout_us: u32) -> PulseWidth {
        pulse_in(&mut self.line, &self.clock, timeout_us)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverFrame {
    pub mode_switch: PulseWidth,
    pub steering: PulseWidth,
    pub throttle: PulseWidth,
}

/// The three operator receiver lines, read back-to-back. Worst case one
/// cycle spends three timeouts here.
pub struct ReceiverPoll {
    mode_switch: Box<dyn PulseReader + Send>,
    steering: Box<dyn PulseReader + Send>,
    throttle: Box<dyn PulseReader + Send>,
    timeout_us: u32,
}

impl ReceiverPoll {
    pub fn new(
        mode_switch: Box<dyn PulseReader + Send>,
        steering: Box<dyn PulseReader + Send>,
        throttle: Box<dyn PulseReader + Send>,
        timeout_us: u32,
    ) -> Self {
        Self { mode_switch, steering, throttle, timeout_us }
    }

    pub fn read_switch(&mut self) -> PulseWidth {
        self.mode_switch.measure(self.timeout_us)
    }

    /// (steering, throttle)
    pub fn read_sticks(&mut self) -> (PulseWidth, PulseWidth) {
        let s = self.steering.measure(self.timeout_us);
        let t = self.throttle.measure(self.timeout_us);
        (s, t)
    }

    pub fn read(&mut self) -> ReceiverFrame {
        let mode_switch = self.read_switch();
        let (steering, throttle) = self.read_sticks();
        trace!(%mode_switch, %steering, %throttle, "receiver frame");
        ReceiverFrame { mode_switch, steering, throttle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    /// Advances 1 us every time it is read.
    struct TickClock(Rc<Cell<u32>>);

    impl Clock for TickClock {
        fn now_us(&self) -> u32 {
            let t = self.0.get();
            self.0.set(t.wrapping_add(1));
            t
        }
    }

    /// 50 Hz frame, high from `rise` to `rise + width` within each frame.
    struct FrameLine {
        t: Rc<Cell<u32>>,
        rise: u32,
        width: u32,
    }

    impl LineLevel for FrameLine {
        fn is_high(&mut self) -> bool {
            let phase = self.t.get() % 20_000;
            self.width > 0 && phase >= self.rise && phase < self.rise + self.width
        }
    }

    fn setup(start: u32, rise: u32, width: u32) -> (FrameLine, TickClock) {
        let t = Rc::new(Cell::new(start));
        (FrameLine { t: t.clone(), rise, width }, TickClock(t))
    }

    fn near(w: PulseWidth, expect: u32) -> bool {
        (w.as_us() as i64 - expect as i64).abs() <= 2
    }

    #[test]
    fn test_measures_pulse_from_low() {
        let (mut line, clock) = setup(0, 100, 1500);
        let w = pulse_in(&mut line, &clock, DEFAULT_TIMEOUT_US);
        assert!(near(w, 1500), "got {}", w);
    }

    #[test]
    fn test_skips_pulse_in_progress() {
        // start halfway through a 1800 us pulse
        let (mut line, clock) = setup(1000, 100, 1800);
        let w = pulse_in(&mut line, &clock, DEFAULT_TIMEOUT_US);
        assert!(near(w, 1800), "got {}", w);
        // measured the next frame's pulse
        assert!(clock.0.get() > 20_000);
    }

    #[test]
    fn test_no_signal_times_out() {
        let (mut line, clock) = setup(0, 100, 0);
        assert_eq!(pulse_in(&mut line, &clock, 5_000), PulseWidth::NONE);
        assert!(clock.0.get() >= 5_000 && clock.0.get() < 5_010);
    }

    #[test]
    fn test_stuck_high_times_out() {
        let (mut line, clock) = setup(0, 0, 20_000);
        assert_eq!(pulse_in(&mut line, &clock, 5_000), PulseWidth::NONE);
    }

    #[test]
    fn test_timeout_shorter_than_gap() {
        // next rise is 19 ms away
        let (mut line, clock) = setup(1000, 100, 800);
        assert_eq!(pulse_in(&mut line, &clock, 10_000), PulseWidth::NONE);
    }

    struct Fixed(u32, Arc<Mutex<Vec<&'static str>>>, &'static str);

    impl PulseReader for Fixed {
        fn measure(&mut self, timeout_us: u32) -> PulseWidth {
            assert_eq!(timeout_us, DEFAULT_TIMEOUT_US);
            self.1.lock().unwrap().push(self.2);
            PulseWidth::from_us(self.0)
        }
    }

    #[test]
    fn test_receiver_reads_switch_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut rx = ReceiverPoll::new(
            Box::new(Fixed(2000, log.clone(), "switch")),
            Box::new(Fixed(1450, log.clone(), "steering")),
            Box::new(Fixed(1600, log.clone(), "throttle")),
            DEFAULT_TIMEOUT_US,
        );
        let frame = rx.read();
        assert_eq!(frame.mode_switch.as_us(), 2000);
        assert_eq!(frame.steering.as_us(), 1450);
        assert_eq!(frame.throttle.as_us(), 1600);
        assert_eq!(*log.lock().unwrap(), vec!["switch", "steering", "throttle"]);
    }
}
