//! Event types for the fact-checking event system
//!
//! Pipeline runs publish lifecycle events on an [`EventBus`]; SSE clients
//! and the CLI subscribe to it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

/// The four pipeline roles, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Evidence gathering
    Research,
    /// Credibility auditing
    Audit,
    /// Adversarial challenge
    Challenge,
    /// Final verdict
    Adjudicate,
}

impl StageName {
    /// All stages in pipeline order
    pub const ALL: [StageName; 4] = [
        StageName::Research,
        StageName::Audit,
        StageName::Challenge,
        StageName::Adjudicate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Research => "research",
            StageName::Audit => "audit",
            StageName::Challenge => "challenge",
            StageName::Adjudicate => "adjudicate",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a per-stage lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    Log,
    Stream,
    Handover,
    Done,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Log => "log",
            EventKind::Stream => "stream",
            EventKind::Handover => "handover",
            EventKind::Done => "done",
        }
    }
}

/// Events broadcast on the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FactCheckEvent {
    /// A pipeline run was accepted
    RunStarted {
        run_id: Uuid,
        claim: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Stage lifecycle event (start/log/stream/handover/done)
    StageEvent {
        run_id: Uuid,
        stage: StageName,
        kind: EventKind,
        /// Log line, streamed chunk or handover summary; empty for start/done
        payload: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A pipeline run produced a verdict
    RunCompleted {
        run_id: Uuid,
        overall_verdict: String,
        overall_confidence: u8,
        retries: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A pipeline run aborted
    RunFailed {
        run_id: Uuid,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl FactCheckEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            FactCheckEvent::RunStarted { .. } => "RunStarted",
            FactCheckEvent::StageEvent { .. } => "StageEvent",
            FactCheckEvent::RunCompleted { .. } => "RunCompleted",
            FactCheckEvent::RunFailed { .. } => "RunFailed",
        }
    }

    /// Run the event belongs to
    pub fn run_id(&self) -> Uuid {
        match self {
            FactCheckEvent::RunStarted { run_id, .. }
            | FactCheckEvent::StageEvent { run_id, .. }
            | FactCheckEvent::RunCompleted { run_id, .. }
            | FactCheckEvent::RunFailed { run_id, .. } => *run_id,
        }
    }
}

/// Broadcast bus for [`FactCheckEvent`]s
///
/// Cloning shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FactCheckEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lag and lose the oldest events once `capacity`
    /// events are buffered.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<FactCheckEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: FactCheckEvent,
    ) -> Result<usize, broadcast::error::SendError<FactCheckEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: FactCheckEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
