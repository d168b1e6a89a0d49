//! Stage builders for the four pipeline roles
//!
//! Each stage builds a prompt pair from the claim and prior-stage output,
//! calls the generation client (streaming when the observer wants live
//! text), and threads the reply through the response parser. A reply that
//! holds no structured record degrades to the stage's `unparsed` record;
//! only generation errors abort a stage.

pub mod adjudicate;
pub mod audit;
pub mod challenge;
pub mod research;

use crate::services::{parse_response, EvidenceSource, GenerationClient, GenerationError, Parsed};
use crate::workflow::{Observer, PipelineConfig, StageEmitter, StageName};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Fixed role instructions plus the per-run user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: &'static str,
    pub user: String,
}

/// Collaborators shared by every stage of one run
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub client: &'a GenerationClient,
    pub evidence_source: &'a dyn EvidenceSource,
    pub config: &'a PipelineConfig,
    pub observer: &'a dyn Observer,
}

impl<'a> StageContext<'a> {
    pub fn emitter(&self, stage: StageName) -> StageEmitter<'a> {
        StageEmitter::new(self.observer, stage)
    }

    /// Generate a reply, streaming chunks to the observer if it wants them
    pub async fn generate(&self, stage: StageName, prompt: &PromptPair) -> Result<String, GenerationError> {
        let emitter = self.emitter(stage);
        if !emitter.wants_stream() {
            return self.client.call(prompt.system, &prompt.user).await;
        }

        let mut sink = move |chunk: &str| emitter.stream(chunk);
        self.client
            .call_streaming(prompt.system, &prompt.user, Some(&mut sink))
            .await
    }
}

/// Parse a stage reply, logging the degraded path
pub(crate) fn parse_reply(stage: StageName, reply: &str) -> Parsed {
    let parsed = parse_response(reply);
    match &parsed {
        Parsed::Structured(_) => debug!(stage = %stage, "Parsed structured reply"),
        Parsed::Raw(text) => warn!(stage = %stage, len = text.len(), "Reply held no structured record, keeping raw text"),
    }
    parsed
}

/// Build a stage record from a parsed reply
pub(crate) fn into_record<T>(parsed: Parsed, structured: impl FnOnce(&Value) -> T, raw: impl FnOnce(String) -> T) -> T {
    match parsed {
        Parsed::Structured(value) => structured(&value),
        Parsed::Raw(text) => raw(text),
    }
}

/// First `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Pretty JSON of `value`, truncated to the stage budget
pub fn prompt_json<T: Serialize + ?Sized>(value: &T, max_chars: usize) -> String {
    let json = serde_json::to_string_pretty(value).unwrap_or_default();
    truncate_chars(&json, max_chars)
}
