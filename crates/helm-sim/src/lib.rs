//! Hosted stand-ins for the boat's wiring: scripted receiver and autopilot
//! signals, recording actuators and a logging heartbeat LED.

pub mod clock;
pub mod edges;
pub mod noise;
pub mod outputs;
pub mod receiver;
pub mod scenario;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::Result;
use serde::Deserialize;

use helm_core::capture::AutopilotCapture;
use helm_core::compose::ActuatorPair;
use helm_core::hal::DiagnosticSink;
use helm_core::poll::ReceiverPoll;
use helm_core::pulse::Channel;
use helm_core::scheduler::Backend;
use helm_core::ArbiterConfig;

use crate::clock::SimClock;
use crate::edges::EdgeDriver;
use crate::noise::Noise;
use crate::outputs::{OutputProbe, SimActuator, SimIndicator};
use crate::receiver::SimLine;
use crate::scenario::{Segment, Timeline};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Wall-clock pacing and a background edge thread. When false, time is
    /// virtual and advances one microsecond per clock read of the poll loop.
    pub realtime: bool,

    pub frame_hz: u32,

    /// Uniform +/- jitter added to every pulse
    pub jitter_us: u32,

    /// Chance in percent that a pulse goes missing
    pub dropout_pct: f64,

    pub seed: u64,

    #[serde(rename = "segment")]
    pub segments: Vec<Segment>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            realtime: true,
            frame_hz: 50,
            jitter_us: 0,
            dropout_pct: 0.0,
            seed: 1,
            segments: vec![Segment::default()],
        }
    }
}

/// Shared by the simulated lines and the edge driver.
pub struct SimWorld {
    pub timeline: Timeline,
    pub clock: Arc<SimClock>,
    pub frame_us: u32,
    noise: Mutex<Noise>,
    driver: Mutex<EdgeDriver>,
}

impl SimWorld {
    pub fn new(cfg: &SimConfig, capture: Arc<AutopilotCapture>) -> Result<Self> {
        anyhow::ensure!(cfg.frame_hz >= 10 && cfg.frame_hz <= 400, "sim.frame_hz should be 10..400");
        anyhow::ensure!((0.0..=100.0).contains(&cfg.dropout_pct), "sim.dropout_pct should be 0..100");
        let frame_us = 1_000_000 / cfg.frame_hz;
        for (i, s) in cfg.segments.iter().enumerate() {
            let widest = [s.switch, s.manual_steering, s.manual_throttle, s.auto_steering, s.auto_throttle]
                .into_iter()
                .max()
                .unwrap_or(0);
            anyhow::ensure!(
                widest < frame_us,
                "sim.segment[{}] has a {}us pulse, longer than the {}us frame",
                i,
                widest,
                frame_us
            );
        }
        let timeline = Timeline::new(cfg.segments.clone())?;
        let clock = Arc::new(if cfg.realtime { SimClock::wall() } else { SimClock::simulated() });
        Ok(Self {
            timeline,
            clock,
            frame_us,
            noise: Mutex::new(Noise::new(cfg.seed, cfg.jitter_us, cfg.dropout_pct)),
            driver: Mutex::new(EdgeDriver::new(capture, frame_us)),
        })
    }

    /// Emits every autopilot frame due up to now.
    pub fn pump_edges(&self) {
        let now = self.clock.elapsed_us();
        if let (Ok(mut driver), Ok(mut noise)) = (self.driver.lock(), self.noise.lock()) {
            driver.pump_to(now, &self.timeline, &mut noise);
        }
    }

    pub(crate) fn with_noise<T>(&self, f: impl FnOnce(&mut Noise) -> T) -> Option<T> {
        self.noise.lock().ok().map(|mut n| f(&mut n))
    }
}

/// What stays observable after the rig is handed to the scheduler.
#[derive(Clone)]
pub struct SimHandles {
    pub world: Arc<SimWorld>,
    pub capture: Arc<AutopilotCapture>,
    pub steering: OutputProbe,
    pub throttle: OutputProbe,
    pub led: OutputProbe,
}

impl SimHandles {
    /// Starts the background edge source. Virtual-time rigs need none: their
    /// lines pump edges as they are read.
    pub fn spawn_edge_source(&self, stop: Arc<AtomicBool>) -> Option<JoinHandle<()>> {
        if !self.world.clock.is_wall() {
            return None;
        }
        Some(edges::spawn(self.world.clone(), stop))
    }
}

/// A ready-to-run simulated boat.
pub struct SimRig {
    pub handles: SimHandles,
    receiver: ReceiverPoll,
    actuators: ActuatorPair,
    indicator: SimIndicator,
}

impl SimRig {
    pub fn build(sim: &SimConfig, arbiter: &ArbiterConfig) -> Result<Self> {
        let capture = Arc::new(AutopilotCapture::new());
        let world = Arc::new(SimWorld::new(sim, capture.clone())?);

        let line = |ch| Box::new(SimLine::reader(ch, world.clone()));
        let receiver = ReceiverPoll::new(
            line(Channel::ModeSwitch),
            line(Channel::ManualSteering),
            line(Channel::ManualThrottle),
            arbiter.timing.pulse_timeout_us,
        );

        let steer = SimActuator::new("steering");
        let thr = SimActuator::new("throttle");
        let indicator = SimIndicator::new();
        let handles = SimHandles {
            steering: steer.probe(),
            throttle: thr.probe(),
            led: indicator.probe(),
            capture,
            world,
        };
        Ok(Self {
            handles,
            receiver,
            actuators: ActuatorPair::new(Box::new(steer), Box::new(thr)),
            indicator,
        })
    }

    pub fn into_backend(self, sink: Box<dyn DiagnosticSink + Send>) -> Backend {
        Backend {
            receiver: self.receiver,
            actuators: self.actuators,
            indicator: Box::new(self.indicator),
            sink,
        }
    }
}
