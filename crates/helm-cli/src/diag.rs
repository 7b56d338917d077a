use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use helm_core::hal::DiagnosticSink;
use helm_proto::diagnostics::DiagnosticFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiagnosticsCfg {
    pub enable: bool,
    pub format: DiagFormat,
    /// File to append to; stdout when unset
    pub path: Option<String>,
    /// Frames buffered between the control loop and the writer
    pub queue: usize,
}

impl Default for DiagnosticsCfg {
    fn default() -> Self {
        Self { enable: true, format: DiagFormat::Text, path: None, queue: 64 }
    }
}

/// Control-loop side. Never blocks: a full queue drops the frame.
pub struct ChannelSink {
    tx: mpsc::Sender<DiagnosticFrame>,
    dropped: u64,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<DiagnosticFrame>) -> Self {
        Self { tx, dropped: 0 }
    }
}

impl DiagnosticSink for ChannelSink {
    fn emit(&mut self, frame: &DiagnosticFrame) {
        match self.tx.try_send(frame.clone()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped += 1;
                if self.dropped.is_power_of_two() {
                    warn!("diagnostics writer behind; {} frames dropped", self.dropped);
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

pub fn render(frame: &DiagnosticFrame, format: DiagFormat) -> Result<String> {
    Ok(match format {
        DiagFormat::Text => frame.to_line(),
        DiagFormat::Json => frame.to_json().context("encode diagnostics frame")?,
    })
}

/// Drains frames until every sender is gone.
pub async fn write_diagnostics(mut rx: mpsc::Receiver<DiagnosticFrame>, cfg: DiagnosticsCfg) -> Result<u64> {
    let out: Box<dyn AsyncWrite + Unpin + Send> = match &cfg.path {
        Some(p) => {
            let f = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(p)
                .await
                .with_context(|| format!("open diagnostics file {}", p))?;
            Box::new(f)
        }
        None => Box::new(tokio::io::stdout()),
    };
    let mut out = BufWriter::new(out);

    let mut n = 0u64;
    while let Some(frame) = rx.recv().await {
        let mut line = render(&frame, cfg.format)?;
        line.push('\n');
        out.write_all(line.as_bytes()).await?;
        n += 1;
        // keep the stream live for a watching operator
        if rx.is_empty() {
            out.flush().await?;
        }
    }
    out.flush().await?;
    debug!("diagnostics writer done after {} frames", n);
    Ok(n)
}
