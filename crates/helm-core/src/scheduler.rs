//! The control cycle.
//!
//! Order per cycle is fixed: read switch, update mode, read sources,
//! validate, cap, write outputs, emit diagnostics, service heartbeat.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use helm_proto::diagnostics::DiagnosticFrame;
use tracing::{debug, info};

use crate::capture::AutopilotCapture;
use crate::compose::{ActuatorPair, OutputComposer, OutputState};
use crate::hal::{DiagnosticSink, Indicator};
use crate::heartbeat::Heartbeat;
use crate::mode::{Mode, ModeSelector};
use crate::poll::{ReceiverFrame, ReceiverPoll};
use crate::pulse::{Channel, PulseWidth};
use crate::validate::{ChannelHealth, Validated, Validator};
use crate::{ArbiterConfig, FailsafeConfig};

/// All state that outlives a cycle. Owned by the scheduler; the capture
/// cells are the only part shared, and only as a reader.
#[derive(Debug)]
pub struct ControlContext {
    pub mode: Mode,
    pub outputs: OutputState,
    pub capture: Arc<AutopilotCapture>,
    pub cycle: u64,
}

impl ControlContext {
    pub fn new(capture: Arc<AutopilotCapture>, failsafe: &FailsafeConfig) -> Self {
        Self {
            mode: Mode::Manual,
            outputs: OutputState::new(failsafe.steering_default(), failsafe.throttle_default()),
            capture,
            cycle: 0,
        }
    }
}

/// The collaborators the loop talks to.
pub struct Backend {
    pub receiver: ReceiverPoll,
    pub actuators: ActuatorPair,
    pub indicator: Box<dyn Indicator + Send>,
    pub sink: Box<dyn DiagnosticSink + Send>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u64,
    pub mode: Mode,
    pub mode_changed: bool,
    pub receiver: ReceiverFrame,
    pub auto_steering: PulseWidth,
    pub auto_throttle: PulseWidth,
    pub steering: Validated,
    pub throttle: Validated,
    pub outputs: OutputState,
}

impl CycleReport {
    pub fn frame(&self, ts_unix_ms: i64) -> DiagnosticFrame {
        DiagnosticFrame {
            ts_unix_ms,
            cycle: self.cycle,
            mode: self.mode,
            steering_out: self.outputs.steering.as_us(),
            throttle_out: self.outputs.throttle.as_us(),
            auto_steering_raw: self.auto_steering.as_us(),
            auto_throttle_raw: self.auto_throttle.as_us(),
            manual_steering_raw: self.receiver.steering.as_us(),
            manual_throttle_raw: self.receiver.throttle.as_us(),
            mode_switch_raw: self.receiver.mode_switch.as_us(),
            steering_ok: self.steering.is_ok(),
            throttle_ok: self.throttle.is_ok(),
        }
    }
}

pub struct Scheduler {
    cfg: ArbiterConfig,
    ctx: ControlContext,
    backend: Backend,
    selector: ModeSelector,
    validator: Validator,
    composer: OutputComposer,
    heartbeat: Heartbeat,
    health: [ChannelHealth; Channel::COUNT],
}

impl Scheduler {
    pub fn new(cfg: ArbiterConfig, capture: Arc<AutopilotCapture>, backend: Backend) -> Self {
        let ctx = ControlContext::new(capture, &cfg.failsafe);
        Self {
            selector: ModeSelector::new(cfg.mode),
            validator: Validator::new(cfg.signal, cfg.failsafe.policy),
            composer: OutputComposer::new(cfg.output),
            heartbeat: Heartbeat::new(Duration::from_millis(cfg.timing.heartbeat_ms), Instant::now()),
            health: Default::default(),
            ctx,
            backend,
            cfg,
        }
    }

    pub fn context(&self) -> &ControlContext {
        &self.ctx
    }

    /// Fault run of one input line. Only the lines feeding the outputs are
    /// observed, so an inactive line keeps its state until selected again.
    pub fn health(&self, channel: Channel) -> &ChannelHealth {
        &self.health[channel.index()]
    }

    /// Puts the startup defaults on both outputs, then waits for the
    /// actuators to settle.
    pub fn startup(&mut self) {
        let pins = self.cfg.pins.all();
        for (name, pin) in pins {
            debug!("pin {:>2} = {}", pin, name);
        }
        info!(
            "startup: steering={} throttle={} policy={:?} delay={}ms",
            self.ctx.outputs.steering,
            self.ctx.outputs.throttle,
            self.validator.policy(),
            self.cfg.timing.startup_delay_ms,
        );
        self.backend.actuators.write(&self.ctx.outputs);
        if self.cfg.timing.startup_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.cfg.timing.startup_delay_ms));
        }
    }

    pub fn step(&mut self) -> CycleReport {
        let switch = self.backend.receiver.read_switch();
        let mode_changed = self.selector.update(&mut self.ctx.mode, switch);

        // manual lines are read every cycle so diagnostics always show them
        let (manual_steering, manual_throttle) = self.backend.receiver.read_sticks();
        let (auto_steering, auto_throttle) = self.ctx.capture.snapshot();

        let (steer_in, thr_in, steer_ch, thr_ch) = match self.ctx.mode {
            Mode::Manual => (manual_steering, manual_throttle, Channel::ManualSteering, Channel::ManualThrottle),
            Mode::Autopilot => (auto_steering, auto_throttle, Channel::AutoSteering, Channel::AutoThrottle),
        };

        let prev = self.ctx.outputs;
        let fs = &self.cfg.failsafe;
        let steering = self.validator.select(steer_in, prev.steering, fs.steering_default());
        let throttle = self.validator.select(thr_in, prev.throttle, fs.throttle_default());
        self.health[steer_ch.index()].observe(steer_ch, &steering);
        self.health[thr_ch.index()].observe(thr_ch, &throttle);

        let outputs = self.composer.compose(
            &mut self.ctx.outputs,
            steering.value,
            throttle.value,
            &mut self.backend.actuators,
        );

        self.ctx.cycle += 1;
        let report = CycleReport {
            cycle: self.ctx.cycle,
            mode: self.ctx.mode,
            mode_changed,
            receiver: ReceiverFrame { mode_switch: switch, steering: manual_steering, throttle: manual_throttle },
            auto_steering,
            auto_throttle,
            steering,
            throttle,
            outputs,
        };

        let ts = (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
        self.backend.sink.emit(&report.frame(ts));
        self.heartbeat.service(Instant::now(), self.backend.indicator.as_mut());

        report
    }

    /// Cycles until `stop` is set or `max_cycles` have run. Returns the
    /// number of cycles executed.
    pub fn run(&mut self, stop: &AtomicBool, max_cycles: Option<u64>) -> u64 {
        let mut n = 0u64;
        while !stop.load(Ordering::Relaxed) {
            if max_cycles.is_some_and(|m| n >= m) {
                break;
            }
            self.step();
            n += 1;
        }
        info!("control loop stopped after {} cycles (mode={})", n, self.ctx.mode);
        n
    }
}
