mod diag;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use helm_core::doctor as core_doctor;
use helm_core::hal::{DiagnosticSink, NullSink};
use helm_core::scheduler::Scheduler;
use helm_core::ArbiterConfig;
use helm_proto::diagnostics::DiagnosticFrame;
use helm_sim::{SimConfig, SimRig};

use crate::diag::{ChannelSink, DiagnosticsCfg};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Parser)]
#[command(name = "helm", version, about = "helm - manual/autopilot PWM arbiter for RC boats")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check the config without touching any outputs.
    Doctor,
    /// Run the control loop until Ctrl-C.
    Run {
        /// Stop after this many cycles.
        #[arg(long)]
        cycles: Option<u64>,
        /// Skip the actuator settle delay.
        #[arg(long)]
        no_startup_delay: bool,
    },
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct Config {
    #[serde(flatten)]
    arbiter: ArbiterConfig,
    diagnostics: DiagnosticsCfg,
    sim: SimConfig,
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path))?;
    toml::from_str(&s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Run { cycles, no_startup_delay } => {
            if no_startup_delay {
                cfg.arbiter.timing.startup_delay_ms = 0;
            }
            run(cfg, cycles).await?
        }
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    core_doctor::check_config(&cfg.arbiter).context("arbiter config")?;
    let a = &cfg.arbiter;
    info!(
        "doctor: accept {}..={}us, manual band {:?}, autopilot band {:?}, throttle cap {}us, policy {:?}",
        a.signal.min_us, a.signal.max_us, a.mode.manual, a.mode.autopilot, a.output.throttle_cap_us, a.failsafe.policy,
    );

    let rig = SimRig::build(&cfg.sim, &cfg.arbiter).context("sim backend")?;
    info!(
        "doctor: sim {} segment(s) over {}ms, realtime={}, jitter={}us, dropout={}%",
        cfg.sim.segments.len(),
        rig.handles.world.timeline.total_us() / 1000,
        cfg.sim.realtime,
        cfg.sim.jitter_us,
        cfg.sim.dropout_pct,
    );

    anyhow::ensure!(cfg.diagnostics.queue >= 1, "diagnostics.queue must be >= 1");
    if let Some(p) = &cfg.diagnostics.path {
        let parent = std::path::Path::new(p).parent().filter(|d| !d.as_os_str().is_empty());
        if let Some(dir) = parent {
            anyhow::ensure!(dir.is_dir(), "diagnostics.path directory missing: {}", dir.display());
        }
    }

    info!("doctor: OK");
    Ok(())
}

async fn run(cfg: Config, cycles: Option<u64>) -> Result<()> {
    info!("run: starting");
    core_doctor::check_config(&cfg.arbiter).context("arbiter config")?;

    let rig = SimRig::build(&cfg.sim, &cfg.arbiter).context("sim backend")?;
    let handles = rig.handles.clone();
    let stop = Arc::new(AtomicBool::new(false));

    // Diagnostics: bounded queue to an async writer so the loop never waits on I/O
    let mut writer = None;
    let sink: Box<dyn DiagnosticSink + Send> = if cfg.diagnostics.enable {
        let (tx, rx) = mpsc::channel::<DiagnosticFrame>(cfg.diagnostics.queue.max(1));
        writer = Some(tokio::spawn(diag::write_diagnostics(rx, cfg.diagnostics.clone())));
        Box::new(ChannelSink::new(tx))
    } else {
        Box::new(NullSink)
    };

    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("ctrl-c: stopping control loop");
                stop.store(true, Ordering::Relaxed);
            }
        });
    }

    let edge_source = handles.spawn_edge_source(stop.clone());

    // The control loop is synchronous and blocking by construction.
    let arbiter = cfg.arbiter.clone();
    let capture = handles.capture.clone();
    let loop_stop = stop.clone();
    let control = tokio::task::spawn_blocking(move || {
        let mut sched = Scheduler::new(arbiter, capture, rig.into_backend(sink));
        sched.startup();
        sched.run(&loop_stop, cycles)
    });
    let n = control.await.context("control loop task")?;

    stop.store(true, Ordering::Relaxed);
    if let Some(h) = edge_source {
        if !matches!(tokio::task::spawn_blocking(move || h.join()).await, Ok(Ok(()))) {
            warn!("edge source thread did not shut down cleanly");
        }
    }
    if let Some(w) = writer {
        match w.await {
            Ok(Ok(frames)) => info!("run: {} diagnostics frames written", frames),
            Ok(Err(e)) => warn!("diagnostics writer failed: {:#}", e),
            Err(e) => warn!("diagnostics writer task: {}", e),
        }
    }

    info!(
        "run: done after {} cycles; last outputs steering={}us throttle={}us",
        n,
        handles.steering.last(),
        handles.throttle.last(),
    );
    Ok(())
}
