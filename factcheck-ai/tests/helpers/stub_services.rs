//! Scripted generation service and canned evidence source

use async_trait::async_trait;
use factcheck_ai::services::{
    ChunkSink, EvidenceSource, GenerationClient, GenerationError, GenerationService, RateLimiter,
    RetryPolicy, SearchResult,
};
use factcheck_ai::stages::{adjudicate, audit, challenge, research};
use factcheck_ai::workflow::{PipelineConfig, PipelineOrchestrator};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Which prompt a generation request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Decompose,
    Research,
    Audit,
    Challenge,
    Adjudicate,
}

impl Role {
    fn from_system_prompt(system: &str) -> Self {
        if system == research::DECOMPOSE_SYSTEM_PROMPT {
            Role::Decompose
        } else if system == research::SYSTEM_PROMPT {
            Role::Research
        } else if system == audit::SYSTEM_PROMPT {
            Role::Audit
        } else if system == challenge::SYSTEM_PROMPT {
            Role::Challenge
        } else if system == adjudicate::SYSTEM_PROMPT {
            Role::Adjudicate
        } else {
            panic!("unexpected system prompt: {}", system)
        }
    }
}

/// Replies scripted per role
///
/// Each role answers from its queue in order; the last reply repeats once
/// the queue is down to one entry. Roles without a script reply "{}".
#[derive(Default)]
pub struct ScriptedService {
    replies: Mutex<HashMap<Role, VecDeque<Result<String, GenerationError>>>>,
    calls: Mutex<Vec<(Role, String)>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, role: Role, text: impl Into<String>) -> Self {
        self.push(role, Ok(text.into()))
    }

    pub fn fail(self, role: Role, error: GenerationError) -> Self {
        self.push(role, Err(error))
    }

    fn push(self, role: Role, reply: Result<String, GenerationError>) -> Self {
        self.replies.lock().unwrap().entry(role).or_default().push_back(reply);
        self
    }

    /// Recorded (role, user prompt) pairs in call order
    pub fn calls(&self) -> Vec<(Role, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, role: Role) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(r, _)| *r == role)
            .map(|(_, user)| user)
            .collect()
    }

    fn next(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let role = Role::from_system_prompt(system);
        self.calls.lock().unwrap().push((role, user.to_string()));

        let mut replies = self.replies.lock().unwrap();
        match replies.get_mut(&role) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| Ok("{}".to_string())),
            None => Ok("{}".to_string()),
        }
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn request(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        self.next(system, user)
    }

    async fn request_streaming(
        &self,
        system: &str,
        user: &str,
        sink: ChunkSink<'_>,
    ) -> Result<String, GenerationError> {
        let text = self.next(system, user)?;
        let mid = text.char_indices().nth(text.chars().count() / 2).map_or(0, |(i, _)| i);
        let (head, tail) = text.split_at(mid);
        for chunk in [head, tail].into_iter().filter(|c| !c.is_empty()) {
            sink(chunk);
        }
        Ok(text)
    }
}

/// Evidence source answering every query with the same results
pub struct StubEvidenceSource {
    results: Vec<SearchResult>,
    page_text: String,
    queries: Mutex<Vec<String>>,
    fetched: Mutex<Vec<String>>,
}

impl StubEvidenceSource {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            page_text: "Page text about the Great Wall of China.".to_string(),
            queries: Mutex::new(Vec::new()),
            fetched: Mutex::new(Vec::new()),
        }
    }

    /// A source whose search always fails
    pub fn failing() -> Self {
        Self::new(vec![SearchResult::error("connection refused")])
    }

    pub fn great_wall() -> Self {
        Self::new(vec![
            SearchResult {
                title: "Great Wall myths".to_string(),
                url: "https://randomblog.example/great-wall".to_string(),
                snippet: "You can see it from the Moon!".to_string(),
            },
            SearchResult {
                title: "Can you see the Great Wall from space?".to_string(),
                url: "https://www.nasa.gov/great-wall".to_string(),
                snippet: "The wall is not visible to the naked eye from the Moon.".to_string(),
            },
        ])
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl EvidenceSource for StubEvidenceSource {
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        self.queries.lock().unwrap().push(query.to_string());
        self.results.iter().take(max_results.max(1)).cloned().collect()
    }

    async fn fetch(&self, url: &str) -> String {
        self.fetched.lock().unwrap().push(url.to_string());
        self.page_text.clone()
    }
}

/// Orchestrator over the stubs with no pacing and millisecond backoff
pub fn test_orchestrator(
    service: Arc<ScriptedService>,
    evidence: Arc<StubEvidenceSource>,
    config: PipelineConfig,
) -> PipelineOrchestrator {
    paced_orchestrator(service, evidence, config, Arc::new(RateLimiter::unlimited()))
}

/// Orchestrator over the stubs sharing the given limiter
pub fn paced_orchestrator(
    service: Arc<ScriptedService>,
    evidence: Arc<StubEvidenceSource>,
    config: PipelineConfig,
    limiter: Arc<RateLimiter>,
) -> PipelineOrchestrator {
    let client = GenerationClient::new(
        service,
        limiter,
        RetryPolicy {
            base_delay: Duration::from_millis(1),
            max_attempts: 3,
        },
    );
    PipelineOrchestrator::new(client, evidence, config)
}
