//! factcheck-ai - multi-stage claim verification
//!
//! - `factcheck-ai check <CLAIM>` runs one claim and prints the report
//! - `factcheck-ai serve` exposes the pipeline over HTTP + SSE

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use factcheck_common::config::{load_config, resolve_config_path, TomlConfig};
use factcheck_common::events::EventBus;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use factcheck_ai::models::PipelineResult;
use factcheck_ai::services::{GeminiClient, GenerationClient, WebEvidenceSource};
use factcheck_ai::workflow::{EventKind, Observer, PipelineEvent, PipelineOrchestrator, StageName};
use factcheck_ai::AppState;

#[derive(Debug, Parser)]
#[command(name = "factcheck-ai", version, about = "Verify factual claims with a four-stage research pipeline")]
struct Cli {
    /// Configuration file (overrides FACTCHECK_CONFIG)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check one claim and print the report
    Check {
        claim: String,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
        /// Echo generated text while stages run
        #[arg(long)]
        stream: bool,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Prints stage progress to stderr
struct ConsoleObserver {
    stream: bool,
}

impl Observer for ConsoleObserver {
    fn notify(&self, stage: StageName, event: &PipelineEvent) -> anyhow::Result<()> {
        let mut err = std::io::stderr().lock();
        match event.kind() {
            EventKind::Start => writeln!(err, "▶ {}", stage)?,
            EventKind::Log => writeln!(err, "  [{}] {}", stage, event.payload())?,
            EventKind::Stream => write!(err, "{}", event.payload())?,
            EventKind::Handover => writeln!(err, "  ⇒ {}", event.payload())?,
            EventKind::Done => writeln!(err, "✔ {}", stage)?,
        }
        Ok(())
    }

    fn wants_stream(&self) -> bool {
        self.stream
    }
}

fn init_tracing(config: &TomlConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_orchestrator(config: &TomlConfig) -> Result<PipelineOrchestrator> {
    let api_key = factcheck_ai::config::resolve_api_key(config)?;
    let gemini = GeminiClient::new(
        api_key,
        config.generation.model.clone(),
        config.generation.temperature,
    )?;
    let client = GenerationClient::new(
        Arc::new(gemini),
        Arc::new(factcheck_ai::config::rate_limiter(config)),
        factcheck_ai::config::retry_policy(config),
    );
    let evidence_source =
        WebEvidenceSource::new(config.search.fetch_max_chars).context("Failed to create web client")?;

    info!(
        model = %config.generation.model,
        min_interval_ms = config.generation.min_interval_ms,
        "Generation client ready"
    );
    Ok(PipelineOrchestrator::new(
        client,
        Arc::new(evidence_source),
        factcheck_ai::config::pipeline_config(config),
    ))
}

fn render_report(result: &PipelineResult) -> String {
    let verdict = &result.judge;
    let mut out = format!(
        "Claim: {}\nVerdict: {} ({}% confidence)\n",
        result.claim, verdict.overall_verdict, verdict.overall_confidence
    );
    if !verdict.reasoning.is_empty() {
        out.push_str(&format!("\n{}\n", verdict.reasoning));
    }
    if !verdict.sub_verdicts.is_empty() {
        out.push_str("\nSub-claims:\n");
        for sub in &verdict.sub_verdicts {
            out.push_str(&format!("  - {} → {} ({}%)\n", sub.sub_claim, sub.verdict, sub.confidence));
        }
    }
    if !verdict.key_sources.is_empty() {
        out.push_str("\nKey sources:\n");
        for source in &verdict.key_sources {
            let label = if source.title.is_empty() { &source.url } else { &source.title };
            out.push_str(&format!("  - {} <{}>\n", label, source.url));
        }
    }
    out.push_str(&format!(
        "\nSources: {} accepted, {} rejected; research retries: {}\n",
        result.skeptic.accepted_count(),
        result.skeptic.rejected_count(),
        result.retries
    ));
    out
}

async fn check(config: &TomlConfig, claim: &str, json: bool, stream: bool) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let result = orchestrator.run(claim, &ConsoleObserver { stream }).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", render_report(&result));
    }
    Ok(())
}

async fn serve(config: &TomlConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let orchestrator = Arc::new(build_orchestrator(config)?);
    let event_bus = EventBus::new(256);
    let state = AppState::new(orchestrator, event_bus);
    let app = factcheck_ai::build_router(state);

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config);

    info!("Starting factcheck-ai {}", env!("CARGO_PKG_VERSION"));
    match resolve_config_path(cli.config.as_deref()) {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    match cli.command {
        Command::Check { claim, json, stream } => check(&config, &claim, json, stream).await,
        Command::Serve { host, port } => serve(&config, host, port).await,
    }
}
