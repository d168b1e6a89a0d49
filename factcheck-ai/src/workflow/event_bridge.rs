//! Bridge from pipeline observer events to the broadcast [`EventBus`]
//!
//! Every event is tagged with the run id so SSE clients can follow one run
//! among several concurrent ones.

use super::{Observer, PipelineError, PipelineEvent, StageName};
use crate::models::PipelineResult;
use chrono::Utc;
use factcheck_common::events::{EventBus, FactCheckEvent};
use tracing::debug;
use uuid::Uuid;

/// Observer publishing a run's events on the event bus
#[derive(Clone)]
pub struct EventBusObserver {
    run_id: Uuid,
    event_bus: EventBus,
}

impl EventBusObserver {
    pub fn new(run_id: Uuid, event_bus: EventBus) -> Self {
        Self { run_id, event_bus }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn run_started(&self, claim: &str) {
        self.event_bus.emit_lossy(FactCheckEvent::RunStarted {
            run_id: self.run_id,
            claim: claim.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn run_completed(&self, result: &PipelineResult) {
        self.event_bus.emit_lossy(FactCheckEvent::RunCompleted {
            run_id: self.run_id,
            overall_verdict: result.judge.overall_verdict.to_string(),
            overall_confidence: result.judge.overall_confidence,
            retries: result.retries,
            timestamp: Utc::now(),
        });
    }

    pub fn run_failed(&self, error: &PipelineError) {
        self.event_bus.emit_lossy(FactCheckEvent::RunFailed {
            run_id: self.run_id,
            error: error.to_string(),
            timestamp: Utc::now(),
        });
    }
}

impl Observer for EventBusObserver {
    fn notify(&self, stage: StageName, event: &PipelineEvent) -> anyhow::Result<()> {
        if self.event_bus.subscriber_count() == 0 {
            return Ok(());
        }
        debug!(run_id = %self.run_id, stage = %stage, kind = event.kind().as_str(), "Publishing stage event");

        self.event_bus.emit_lossy(FactCheckEvent::StageEvent {
            run_id: self.run_id,
            stage,
            kind: event.kind(),
            payload: event.payload().to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }
}
