//! Pipeline orchestrator
//!
//! Drives one claim through the stage sequence:
//!
//! ```text
//! Research → Audit ─┬─ needs more research, retries left ─→ Research (refined claim)
//!                   └─ otherwise ─→ Challenge → Adjudicate → Done
//! ```
//!
//! # Claims
//! The original claim is never modified. A retry derives a new working
//! claim from the original plus the audit's research suggestions; only the
//! research stage sees it. Challenge and adjudication use the original.
//!
//! # Errors
//! A run is atomic: a fatal generation error (including exhausted throttling
//! retries) discards all partial results and is returned as the single
//! [`PipelineError`]. Parse failures, search failures and observer failures
//! never abort a run.

use super::{Observer, PipelineEvent, StageName};
use crate::models::{ArgumentSet, AuditReport, PipelineResult, ResearchReport};
use crate::services::{EvidenceSource, GenerationClient, GenerationError};
use crate::stages::{self, StageContext};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Core-facing pipeline settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Search results requested per sub-claim
    pub results_per_query: usize,
    /// Results per sub-claim whose page text is fetched
    pub fetch_top_n: usize,
    /// Minimum credibility score (0-10) for an accepted source
    pub score_threshold: u8,
    /// Maximum audit → research loops; 0 disables the loop
    pub max_research_retries: u32,
    /// Upper bound on sub-claims per research pass
    pub max_sub_claims: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            results_per_query: 5,
            fetch_top_n: 3,
            score_threshold: 5,
            max_research_retries: 2,
            max_sub_claims: 3,
        }
    }
}

/// The single error a failed run returns
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PipelineError {
    #[error("{stage} stage failed: {source}")]
    Generation {
        stage: StageName,
        #[source]
        source: GenerationError,
    },
}

impl PipelineError {
    pub fn stage(&self) -> StageName {
        match self {
            PipelineError::Generation { stage, .. } => *stage,
        }
    }

    /// Underlying generation error
    pub fn generation_error(&self) -> &GenerationError {
        match self {
            PipelineError::Generation { source, .. } => source,
        }
    }
}

/// Pipeline states; each carries exactly what the next stage needs
enum PipelineState {
    Research {
        working_claim: String,
    },
    Audit {
        research: ResearchReport,
    },
    Challenge {
        research: ResearchReport,
        audit: AuditReport,
    },
    Adjudicate {
        research: ResearchReport,
        audit: AuditReport,
        arguments: ArgumentSet,
    },
    Done(PipelineResult),
}

/// Working claim for a retry: the original claim plus the suggestions
pub fn refine_claim(original: &str, suggestions: &[&str]) -> String {
    if suggestions.is_empty() {
        return original.to_string();
    }
    format!("{}\n\nAdditional research focus: {}", original, suggestions.join("; "))
}

/// Sequential four-stage fact-check pipeline
///
/// Cheap to share: concurrent runs share the generation client, and so its
/// rate limiter.
pub struct PipelineOrchestrator {
    client: GenerationClient,
    evidence_source: Arc<dyn EvidenceSource>,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    pub fn new(client: GenerationClient, evidence_source: Arc<dyn EvidenceSource>, config: PipelineConfig) -> Self {
        Self {
            client,
            evidence_source,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one claim to a verdict, reporting progress to `observer`
    pub async fn run(&self, claim: &str, observer: &dyn Observer) -> Result<PipelineResult, PipelineError> {
        let ctx = StageContext {
            client: &self.client,
            evidence_source: self.evidence_source.as_ref(),
            config: &self.config,
            observer,
        };

        info!(claim = %claim, max_research_retries = self.config.max_research_retries, "Pipeline started");

        let mut retries_used = 0u32;
        let mut state = PipelineState::Research {
            working_claim: claim.to_string(),
        };

        loop {
            state = match state {
                PipelineState::Research { working_claim } => {
                    let research = self.research(&ctx, &working_claim).await?;
                    PipelineState::Audit { research }
                }

                PipelineState::Audit { mut research } => {
                    let emitter = ctx.emitter(StageName::Audit);
                    emitter.emit(PipelineEvent::Start);
                    let audit = stages::audit::run(&ctx, &mut research)
                        .await
                        .map_err(|e| self.fail(StageName::Audit, e))?;

                    if audit.needs_more_research() && retries_used < self.config.max_research_retries {
                        retries_used += 1;
                        let suggestions = audit.research_suggestions();
                        let working_claim = refine_claim(claim, &suggestions);

                        info!(retry = retries_used, suggestions = suggestions.len(), "Audit requested more research");
                        emitter.log(format!(
                            "More research needed (retry {}/{})",
                            retries_used, self.config.max_research_retries
                        ));
                        emitter.emit(PipelineEvent::Handover(format!(
                            "{} findings need more research → research",
                            audit.audited_findings.iter().filter(|f| f.needs_more_research).count()
                        )));
                        emitter.emit(PipelineEvent::Done);
                        PipelineState::Research { working_claim }
                    } else {
                        emitter.emit(PipelineEvent::Handover(format!(
                            "{} accepted, {} rejected → challenge",
                            audit.accepted_count(),
                            audit.rejected_count()
                        )));
                        emitter.emit(PipelineEvent::Done);
                        PipelineState::Challenge { research, audit }
                    }
                }

                PipelineState::Challenge { research, audit } => {
                    let emitter = ctx.emitter(StageName::Challenge);
                    emitter.emit(PipelineEvent::Start);
                    let arguments = stages::challenge::run(&ctx, claim, &audit)
                        .await
                        .map_err(|e| self.fail(StageName::Challenge, e))?;

                    emitter.emit(PipelineEvent::Handover(format!(
                        "{} for, {} against, {} critiques → adjudicate",
                        arguments.for_evidence.len(),
                        arguments.against_evidence.len(),
                        arguments.critiques.len()
                    )));
                    emitter.emit(PipelineEvent::Done);
                    PipelineState::Adjudicate {
                        research,
                        audit,
                        arguments,
                    }
                }

                PipelineState::Adjudicate {
                    research,
                    audit,
                    arguments,
                } => {
                    let emitter = ctx.emitter(StageName::Adjudicate);
                    emitter.emit(PipelineEvent::Start);
                    let verdict = stages::adjudicate::run(&ctx, claim, &audit, &arguments)
                        .await
                        .map_err(|e| self.fail(StageName::Adjudicate, e))?;
                    emitter.emit(PipelineEvent::Done);

                    PipelineState::Done(PipelineResult {
                        claim: claim.to_string(),
                        researcher: research,
                        skeptic: audit,
                        adversary: arguments,
                        judge: verdict,
                        retries: retries_used,
                    })
                }

                PipelineState::Done(result) => {
                    info!(
                        verdict = %result.judge.overall_verdict,
                        confidence = result.judge.overall_confidence,
                        retries = result.retries,
                        "Pipeline complete"
                    );
                    return Ok(result);
                }
            };
        }
    }

    async fn research(&self, ctx: &StageContext<'_>, working_claim: &str) -> Result<ResearchReport, PipelineError> {
        let emitter = ctx.emitter(StageName::Research);
        emitter.emit(PipelineEvent::Start);

        let research = stages::research::run(ctx, working_claim)
            .await
            .map_err(|e| self.fail(StageName::Research, e))?;

        emitter.emit(PipelineEvent::Handover(format!(
            "Passing {} sources across {} sub-claims to audit",
            research.evidence_count(),
            research.sub_claims.len()
        )));
        emitter.emit(PipelineEvent::Done);
        Ok(research)
    }

    fn fail(&self, stage: StageName, source: GenerationError) -> PipelineError {
        error!(stage = %stage, error = %source, "Pipeline aborted");
        PipelineError::Generation { stage, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refine_claim() {
        let claim = "The Great Wall is visible from the Moon";
        assert_eq!(refine_claim(claim, &[]), claim);

        let refined = refine_claim(claim, &["astronaut accounts", "angular size"]);
        assert!(refined.starts_with(claim));
        assert!(refined.ends_with("Additional research focus: astronaut accounts; angular size"));
    }

    #[test]
    fn test_pipeline_error_display() {
        let err = PipelineError::Generation {
            stage: StageName::Audit,
            source: GenerationError::Service("invalid API key".to_string()),
        };
        assert_eq!(err.stage(), StageName::Audit);
        assert_eq!(
            err.to_string(),
            "audit stage failed: Generation service error: invalid API key"
        );
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.score_threshold, 5);
        assert_eq!(config.max_research_retries, 2);
    }
}
