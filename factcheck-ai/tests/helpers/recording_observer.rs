//! Observers that record or misbehave

use factcheck_ai::workflow::{EventKind, Observer, PipelineEvent, StageName};
use std::sync::Mutex;

/// Records every event in arrival order
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(StageName, PipelineEvent)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(StageName, PipelineEvent)> {
        self.events.lock().unwrap().clone()
    }

    /// Stage of every `start` event, in order
    pub fn started_stages(&self) -> Vec<StageName> {
        self.events()
            .into_iter()
            .filter(|(_, e)| e.kind() == EventKind::Start)
            .map(|(stage, _)| stage)
            .collect()
    }

    /// Payloads of one kind for one stage
    pub fn payloads(&self, stage: StageName, kind: EventKind) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(s, e)| *s == stage && e.kind() == kind)
            .map(|(_, e)| e.payload().to_string())
            .collect()
    }
}

impl Observer for RecordingObserver {
    fn notify(&self, stage: StageName, event: &PipelineEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push((stage, event.clone()));
        Ok(())
    }
}

/// Fails every notification; panics on `done`
pub struct FailingObserver;

impl Observer for FailingObserver {
    fn notify(&self, _stage: StageName, event: &PipelineEvent) -> anyhow::Result<()> {
        if matches!(event, PipelineEvent::Done) {
            panic!("observer crashed");
        }
        anyhow::bail!("display disconnected")
    }
}
