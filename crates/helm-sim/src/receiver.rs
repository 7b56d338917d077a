use std::sync::Arc;

use tracing::trace;

use helm_core::hal::LineLevel;
use helm_core::poll::LinePulseReader;
use helm_core::pulse::{Channel, PulseWidth};

use crate::clock::SimClock;
use crate::SimWorld;

/// One operator receiver line. Every frame starts with a high pulse of the
/// scripted width; the level is derived from the scenario clock, so the
/// core's `pulse_in` times it like a real pin.
pub struct SimLine {
    channel: Channel,
    world: Arc<SimWorld>,
    frame: Option<u64>,
    width: PulseWidth,
}

impl SimLine {
    pub fn new(channel: Channel, world: Arc<SimWorld>) -> Self {
        Self { channel, world, frame: None, width: PulseWidth::NONE }
    }

    /// The line wrapped in the core's polling reader, timed by the world clock.
    pub fn reader(channel: Channel, world: Arc<SimWorld>) -> LinePulseReader<SimLine, Arc<SimClock>> {
        let clock = world.clock.clone();
        LinePulseReader::new(SimLine::new(channel, world), clock)
    }

    fn enter_frame(&mut self, frame: u64) {
        let world = &self.world;
        // no edge thread in virtual time; catch the autopilot up here
        if !world.clock.is_wall() {
            world.pump_edges();
        }
        let start = frame * world.frame_us as u64;
        let scripted = world.timeline.at(start).width(self.channel);
        self.width = world.with_noise(|n| n.perturb(scripted)).unwrap_or(PulseWidth::NONE);
        self.frame = Some(frame);
        trace!("{} frame at {}us: {}", self.channel, start, self.width);
    }
}

impl LineLevel for SimLine {
    fn is_high(&mut self) -> bool {
        let now = self.world.clock.elapsed_us();
        let frame_us = self.world.frame_us as u64;
        let frame = now / frame_us;
        if self.frame != Some(frame) {
            self.enter_frame(frame);
        }
        now % frame_us < self.width.as_us() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Segment;
    use crate::SimConfig;
    use helm_core::capture::AutopilotCapture;
    use helm_core::hal::{Clock, PulseReader};

    fn world_with_capture(segments: Vec<Segment>) -> (Arc<SimWorld>, Arc<AutopilotCapture>) {
        let cfg = SimConfig { realtime: false, segments, ..SimConfig::default() };
        let capture = Arc::new(AutopilotCapture::new());
        (Arc::new(SimWorld::new(&cfg, capture.clone()).unwrap()), capture)
    }

    fn world(segments: Vec<Segment>) -> Arc<SimWorld> {
        world_with_capture(segments).0
    }

    #[test]
    fn test_level_follows_frame_phase() {
        let w = world(vec![Segment { manual_steering: 1450, ..Segment::default() }]);
        let mut line = SimLine::new(Channel::ManualSteering, w.clone());
        assert!(line.is_high());
        while w.clock.elapsed_us() < 1449 {
            w.clock.now_us();
        }
        assert!(line.is_high());
        w.clock.now_us();
        assert!(!line.is_high());
    }

    #[test]
    fn test_poll_loop_times_scripted_width() {
        let w = world(vec![Segment { switch: 1980, ..Segment::default() }]);
        let mut reader = SimLine::reader(Channel::ModeSwitch, w.clone());
        // the pulse at t=0 is already in progress, so the next frame is measured
        assert_eq!(reader.measure(100_000).as_us(), 1980);
        assert!(w.clock.elapsed_us() > 20_000);
    }

    #[test]
    fn test_silent_line_costs_full_timeout() {
        let w = world(vec![Segment { manual_throttle: 0, ..Segment::default() }]);
        let mut reader = SimLine::reader(Channel::ManualThrottle, w.clone());
        assert_eq!(reader.measure(100_000), PulseWidth::NONE);
        let spent = w.clock.elapsed_us();
        assert!((100_000..100_010).contains(&spent), "spent {}", spent);
    }

    #[test]
    fn test_reading_pumps_autopilot_edges() {
        let (w, cap) = world_with_capture(vec![Segment { auto_steering: 1320, auto_throttle: 1180, ..Segment::default() }]);
        let mut reader = SimLine::reader(Channel::ModeSwitch, w);
        reader.measure(100_000);
        assert_eq!(cap.snapshot(), (PulseWidth::from_us(1320), PulseWidth::from_us(1180)));
    }
}
