//! Autopilot PWM generator. Plays the part of the pin-change interrupt:
//! the only writer of the capture cells.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, trace};

use helm_core::capture::AutopilotCapture;
use helm_core::pulse::Channel;

use crate::noise::Noise;
use crate::scenario::Timeline;
use crate::SimWorld;

#[derive(Debug)]
pub struct EdgeDriver {
    capture: Arc<AutopilotCapture>,
    frame_us: u32,
    next_frame_us: u64,
}

impl EdgeDriver {
    pub fn new(capture: Arc<AutopilotCapture>, frame_us: u32) -> Self {
        Self { capture, frame_us, next_frame_us: 0 }
    }

    /// Reports a high then a low level per line for every frame that has
    /// started by `now_us`. A silent or dropped pulse emits nothing, leaving
    /// the previous width in place.
    pub fn pump_to(&mut self, now_us: u64, timeline: &Timeline, noise: &mut Noise) {
        while self.next_frame_us <= now_us {
            let seg = timeline.at(self.next_frame_us);
            let rise = self.next_frame_us as u32;
            for (cell, ch) in [
                (&self.capture.steering, Channel::AutoSteering),
                (&self.capture.throttle, Channel::AutoThrottle),
            ] {
                let w = noise.perturb(seg.width(ch));
                if w.is_none() {
                    continue;
                }
                // the pin-change source reports levels, not edges
                cell.on_level(true, rise);
                cell.on_level(false, rise.wrapping_add(w.as_us()));
                trace!("{} pulse {} at {}", ch, w, rise);
            }
            self.next_frame_us += self.frame_us as u64;
        }
    }
}

/// Background edge source for wall-clock rigs.
pub fn spawn(world: Arc<SimWorld>, stop: Arc<AtomicBool>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        debug!("autopilot edge source: {}us frames", world.frame_us);
        let period = Duration::from_micros(world.frame_us as u64);
        while !stop.load(Ordering::Relaxed) {
            world.pump_edges();
            std::thread::sleep(period);
        }
        debug!("autopilot edge source stopped");
    })
}
