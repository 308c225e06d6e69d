use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Pipeline phase reported to progress sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Proposal,
    Classification,
    Finalizing,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Proposal => "proposal",
            Phase::Classification => "classification",
            Phase::Finalizing => "finalizing",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    /// 0..=100
    pub percent: u8,
    pub message: String,
}

/// Receives progress updates during a run.
///
/// Delivery is best-effort: an `Err` is logged by the pipeline and otherwise
/// ignored. Implementations may block, but must not reorder events.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent) -> anyhow::Result<()>;
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn report(&self, event: ProgressEvent) -> anyhow::Result<()> {
        self(event)
    }
}

/// Forwards events into a tokio channel drained by a separate reporting task
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressSink for ChannelSink {
    fn report(&self, event: ProgressEvent) -> anyhow::Result<()> {
        self.sender
            .send(event)
            .map_err(|e| anyhow::anyhow!("progress receiver dropped: {}", e))
    }
}

/// Per-run wrapper that keeps percent values monotonic and swallows sink errors
pub(crate) struct ProgressReporter<'a> {
    sink: Option<&'a dyn ProgressSink>,
    last_percent: u8,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(sink: Option<&'a dyn ProgressSink>) -> Self {
        Self {
            sink,
            last_percent: 0,
        }
    }

    pub(crate) fn emit(&mut self, phase: Phase, percent: u8, message: impl Into<String>) {
        let Some(sink) = self.sink else {
            return;
        };

        let percent = percent.min(100).max(self.last_percent);
        self.last_percent = percent;

        let event = ProgressEvent {
            phase,
            percent,
            message: message.into(),
        };
        if let Err(e) = sink.report(event) {
            tracing::warn!(%phase, percent, error = %e, "progress delivery failed");
        }
    }
}

/// Percent reported after segment `index` (1-based) of `total`
pub fn segment_percent(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 50;
    }
    let index = index.min(total);
    (50 + (40 * index) / total) as u8
}
