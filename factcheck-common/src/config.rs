//! Configuration file loading and path resolution
//!
//! The configuration file is TOML. Every section and field is optional;
//! missing values fall back to the defaults below.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "FACTCHECK_CONFIG";

/// Default generation model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub generation: GenerationSection,
    pub search: SearchSection,
    pub pipeline: PipelineSection,
    pub server: ServerSection,
    pub logging: LoggingSection,
}

/// `[generation]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationSection {
    /// Model identifier passed to the generation service
    pub model: String,
    /// API key (environment variables take priority)
    pub api_key: Option<String>,
    /// Minimum spacing between outbound generation calls
    pub min_interval_ms: u64,
    /// Backoff base; attempt N sleeps `base * (N + 1)` after throttling
    pub retry_base_delay_ms: u64,
    /// Attempts per call before giving up on throttling
    pub max_attempts: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            // 5 requests per minute
            min_interval_ms: 12_000,
            retry_base_delay_ms: 15_000,
            max_attempts: 3,
            temperature: 0.3,
        }
    }
}

/// `[search]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchSection {
    pub results_per_query: usize,
    /// Number of top results whose page text is fetched
    pub fetch_top_n: usize,
    /// Cap on fetched page text
    pub fetch_max_chars: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            results_per_query: 5,
            fetch_top_n: 3,
            fetch_max_chars: 3000,
        }
    }
}

/// `[pipeline]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSection {
    /// Minimum credibility score (0-10) for a source to be accepted
    pub score_threshold: u8,
    /// Maximum audit → research loops
    pub max_research_retries: u32,
    pub max_sub_claims: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            score_threshold: 5,
            max_research_retries: 2,
            max_sub_claims: 3,
        }
    }
}

/// `[server]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5740,
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSection {
    /// Default tracing filter directive (overridden by RUST_LOG)
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.score_threshold > 10 {
            return Err(Error::Config(format!(
                "pipeline.score_threshold must be 0-10, got {}",
                self.pipeline.score_threshold
            )));
        }
        if self.generation.max_attempts == 0 {
            return Err(Error::Config(
                "generation.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.generation.model.trim().is_empty() {
            return Err(Error::Config("generation.model must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Parse and validate a TOML config document
pub fn parse_config(content: &str) -> Result<TomlConfig> {
    let config: TomlConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file path
pub fn load_config_file(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    parse_config(&content)
}

/// Resolve which config file to use, following priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable `FACTCHECK_CONFIG`
/// 3. `<config_dir>/factcheck/config.toml` if it exists
///
/// Returns `None` when no file applies (defaults are used).
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("factcheck").join("config.toml"))?;
    if user_config.exists() {
        Some(user_config)
    } else {
        debug!("No config file at {}", user_config.display());
        None
    }
}

/// Load configuration using the resolution order of [`resolve_config_path`]
///
/// An explicitly named file that cannot be read is an error; an absent
/// default file is not.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            load_config_file(&path)
        }
        None => {
            info!("No configuration file found, using defaults");
            Ok(TomlConfig::default())
        }
    }
}
