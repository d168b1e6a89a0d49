//! Fact-check workflow: observer protocol, orchestrator and event bridge
//!
//! A run moves through `Research → Audit → (Research → Audit)* → Challenge →
//! Adjudicate → Done`, one stage at a time. Progress is reported to an
//! [`Observer`] as per-stage lifecycle events:
//! - `start` when a stage begins
//! - `log` / `stream` while it works (status lines, generated text chunks)
//! - `handover` with the summary passed to the next stage
//! - `done` when it finishes

pub mod event_bridge;
pub mod orchestrator;

pub use event_bridge::EventBusObserver;
pub use factcheck_common::events::{EventKind, StageName};
pub use orchestrator::{PipelineConfig, PipelineError, PipelineOrchestrator};

use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

/// One lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    Start,
    Log(String),
    Stream(String),
    Handover(String),
    Done,
}

impl PipelineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PipelineEvent::Start => EventKind::Start,
            PipelineEvent::Log(_) => EventKind::Log,
            PipelineEvent::Stream(_) => EventKind::Stream,
            PipelineEvent::Handover(_) => EventKind::Handover,
            PipelineEvent::Done => EventKind::Done,
        }
    }

    /// Text payload; empty for start/done
    pub fn payload(&self) -> &str {
        match self {
            PipelineEvent::Log(s) | PipelineEvent::Stream(s) | PipelineEvent::Handover(s) => s,
            PipelineEvent::Start | PipelineEvent::Done => "",
        }
    }
}

/// Receiver of pipeline progress
///
/// Called synchronously from the pipeline; implementations must return
/// promptly. Errors (and panics) are logged and otherwise ignored, so an
/// observer cannot change the outcome of a run.
pub trait Observer: Send + Sync {
    fn notify(&self, stage: StageName, event: &PipelineEvent) -> anyhow::Result<()>;

    /// Whether generated text should be streamed to this observer
    fn wants_stream(&self) -> bool {
        true
    }
}

/// Observer that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn notify(&self, _stage: StageName, _event: &PipelineEvent) -> anyhow::Result<()> {
        Ok(())
    }

    fn wants_stream(&self) -> bool {
        false
    }
}

/// Observer handle bound to one stage
#[derive(Clone, Copy)]
pub struct StageEmitter<'a> {
    observer: &'a dyn Observer,
    stage: StageName,
}

impl<'a> StageEmitter<'a> {
    pub fn new(observer: &'a dyn Observer, stage: StageName) -> Self {
        Self { observer, stage }
    }

    pub fn stage(&self) -> StageName {
        self.stage
    }

    pub fn wants_stream(&self) -> bool {
        self.observer.wants_stream()
    }

    /// Deliver an event, containing observer failures
    pub fn emit(&self, event: PipelineEvent) {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.observer.notify(self.stage, &event)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(stage = %self.stage, kind = event.kind().as_str(), error = %e, "Observer failed"),
            Err(_) => warn!(stage = %self.stage, kind = event.kind().as_str(), "Observer panicked"),
        }
    }

    pub fn log(&self, message: impl Into<String>) {
        self.emit(PipelineEvent::Log(message.into()));
    }

    pub fn stream(&self, chunk: &str) {
        self.emit(PipelineEvent::Stream(chunk.to_string()));
    }
}
