//! Generation client: pacing and bounded retry around a text-generation service
//!
//! Every attempt, retries included, first passes through the shared
//! [`RateLimiter`]. Throttling errors are retried with linearly increasing
//! backoff (`base_delay * (attempt + 1)`); any other error is returned
//! immediately.

use super::rate_limiter::RateLimiter;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Generation errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    /// Rate-limit rejection from the service; retryable
    #[error("Generation service throttled the request: {0}")]
    Throttled(String),

    /// Any other service failure; not retryable
    #[error("Generation service error: {0}")]
    Service(String),

    /// Throttled on every allowed attempt
    #[error("Rate limit exceeded after {attempts} attempts")]
    RateLimitExceeded { attempts: u32 },
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::Throttled(_))
    }
}

/// Sink receiving streamed chunks in arrival order
pub type ChunkSink<'a> = &'a mut (dyn FnMut(&str) + Send);

/// External text-generation service
///
/// Implementations report rate-limit rejections as
/// [`GenerationError::Throttled`] and everything else as
/// [`GenerationError::Service`].
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// One blocking round trip
    async fn request(&self, system_instruction: &str, user_content: &str) -> Result<String, GenerationError>;

    /// Streaming round trip; every chunk goes to `sink` before the
    /// concatenated text is returned
    async fn request_streaming(
        &self,
        system_instruction: &str,
        user_content: &str,
        sink: ChunkSink<'_>,
    ) -> Result<String, GenerationError>;
}

/// Retry policy for throttled calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    /// Total attempts per call, including the first
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Backoff after the given 0-based failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * (attempt + 1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(15),
            max_attempts: 3,
        }
    }
}

/// Paced, retrying front end to a [`GenerationService`]
#[derive(Clone)]
pub struct GenerationClient {
    service: Arc<dyn GenerationService>,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
}

impl GenerationClient {
    pub fn new(service: Arc<dyn GenerationService>, limiter: Arc<RateLimiter>, policy: RetryPolicy) -> Self {
        Self {
            service,
            limiter,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Single round trip
    pub async fn call(&self, system_prompt: &str, user_prompt: &str) -> Result<String, GenerationError> {
        self.run(system_prompt, user_prompt, None).await
    }

    /// Streaming round trip; without a sink this behaves like [`call`](Self::call)
    pub async fn call_streaming(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        on_chunk: Option<ChunkSink<'_>>,
    ) -> Result<String, GenerationError> {
        self.run(system_prompt, user_prompt, on_chunk).await
    }

    async fn run(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        mut sink: Option<ChunkSink<'_>>,
    ) -> Result<String, GenerationError> {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 0..max_attempts {
            self.limiter.acquire().await;
            debug!(attempt = attempt + 1, max_attempts, streaming = sink.is_some(), "Generation call");

            let result = match sink.as_deref_mut() {
                Some(sink) => self.service.request_streaming(system_prompt, user_prompt, sink).await,
                None => self.service.request(system_prompt, user_prompt).await,
            };

            match result {
                Ok(text) => return Ok(text),
                Err(GenerationError::Throttled(reason)) => {
                    if attempt + 1 < max_attempts {
                        let delay = self.policy.delay_for(attempt);
                        warn!(
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            reason = %reason,
                            "Generation service throttled, backing off"
                        );
                        sleep(delay).await;
                    } else {
                        warn!(attempts = max_attempts, reason = %reason, "Generation retries exhausted");
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(GenerationError::RateLimitExceeded {
            attempts: max_attempts,
        })
    }
}
