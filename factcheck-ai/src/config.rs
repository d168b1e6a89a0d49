//! Configuration resolution for factcheck-ai
//!
//! Turns the TOML model from `factcheck_common::config` into the plain
//! values the core consumes, and resolves the generation API key with
//! ENV → TOML priority.

use crate::services::{RateLimiter, RetryPolicy};
use crate::workflow::PipelineConfig;
use factcheck_common::config::TomlConfig;
use factcheck_common::{Error, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Primary API key variable
pub const API_KEY_ENV: &str = "FACTCHECK_GEMINI_API_KEY";
/// Fallback API key variable
pub const API_KEY_FALLBACK_ENV: &str = "GEMINI_API_KEY";

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve the generation API key
///
/// **Priority:** `FACTCHECK_GEMINI_API_KEY` → `GEMINI_API_KEY` → TOML `generation.api_key`
pub fn resolve_api_key(toml_config: &TomlConfig) -> Result<String> {
    let candidates = [
        (API_KEY_ENV, std::env::var(API_KEY_ENV).ok()),
        (API_KEY_FALLBACK_ENV, std::env::var(API_KEY_FALLBACK_ENV).ok()),
        ("TOML config", toml_config.generation.api_key.clone()),
    ];

    let mut valid = candidates
        .into_iter()
        .filter_map(|(source, key)| key.filter(|k| is_valid_key(k)).map(|k| (source, k)));

    let Some((source, key)) = valid.next() else {
        return Err(Error::Config(format!(
            "Gemini API key not configured. Set one of:\n\
             1. Environment: {}=your-key\n\
             2. Environment: {}=your-key\n\
             3. TOML config: [generation] api_key = \"your-key\"",
            API_KEY_ENV, API_KEY_FALLBACK_ENV
        )));
    };

    let shadowed: Vec<&str> = valid.map(|(s, _)| s).collect();
    if !shadowed.is_empty() {
        warn!(
            "Gemini API key also set in {}; using {} (highest priority)",
            shadowed.join(", "),
            source
        );
    }
    info!("Gemini API key loaded from {}", source);
    Ok(key.trim().to_string())
}

/// Core pipeline settings from the TOML model
pub fn pipeline_config(toml_config: &TomlConfig) -> PipelineConfig {
    PipelineConfig {
        results_per_query: toml_config.search.results_per_query,
        fetch_top_n: toml_config.search.fetch_top_n,
        score_threshold: toml_config.pipeline.score_threshold,
        max_research_retries: toml_config.pipeline.max_research_retries,
        max_sub_claims: toml_config.pipeline.max_sub_claims,
    }
}

/// Throttling retry policy from the TOML model
pub fn retry_policy(toml_config: &TomlConfig) -> RetryPolicy {
    RetryPolicy {
        base_delay: Duration::from_millis(toml_config.generation.retry_base_delay_ms),
        max_attempts: toml_config.generation.max_attempts,
    }
}

/// Process-wide limiter for the generation quota
pub fn rate_limiter(toml_config: &TomlConfig) -> RateLimiter {
    RateLimiter::new(Duration::from_millis(toml_config.generation.min_interval_ms))
}
