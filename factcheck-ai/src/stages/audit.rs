//! Audit stage: credibility scoring and source acceptance
//!
//! Every piece of evidence is scored before the prompt is built, so the
//! model sees the scores. After the reply is parsed, accepted sources are
//! re-scored and any below the threshold are moved to the rejected list, so
//! every source reaching the challenge stage carries a computed score.

use super::{into_record, parse_reply, prompt_json, truncate_chars, PromptPair, StageContext};
use crate::models::{AuditReport, RejectedSource, ResearchReport};
use crate::services::{score_source, GenerationError};
use crate::workflow::{StageEmitter, StageName};
use tracing::{debug, info};

/// Character budget for the serialized research report
pub const PROMPT_BUDGET: usize = 12_000;

/// Reason recorded when a model-accepted source fails the score check
pub const BELOW_THRESHOLD_REASON: &str = "credibility score below threshold";

pub const SYSTEM_PROMPT: &str = r#"You are the source auditor of a fact-checking team: distrustful and exacting.

You receive research findings in which every source already carries a credibility score (0-10) and tier.
For every sub-claim:
- accept sources at or above the minimum score and reject the rest, giving a reason
- reject sources whose snippet does not actually address the sub-claim
- list contradictions between sources
- set needs_more_research to true only when the accepted evidence is too thin to judge the
  sub-claim, and say what to look for in research_suggestions

Reply with JSON in this shape:
```json
{
  "audited_findings": [
    {
      "sub_claim": "...",
      "accepted_sources": [{"url": "...", "title": "...", "score": 7, "snippet": "..."}],
      "rejected_sources": [{"url": "...", "reason": "..."}],
      "contradictions": ["..."],
      "needs_more_research": false,
      "research_suggestions": ""
    }
  ]
}
```"#;

/// Score every piece of evidence in place, logging one line per source
pub fn score_evidence(research: &mut ResearchReport, threshold: u8, emitter: &StageEmitter<'_>) {
    for evidence in research.evidence_mut() {
        let score = score_source(&evidence.source_url, None);
        let status = if score.score >= threshold { "ACCEPTED" } else { "REJECTED" };
        emitter.log(format!(
            "Scoring {} → {}/10 ({}) — {}",
            truncate_chars(&score.domain, 30),
            score.score,
            score.tier,
            status
        ));
        evidence.apply_score(&score);
    }
}

pub fn prompt(research: &ResearchReport, threshold: u8) -> PromptPair {
    PromptPair {
        system: SYSTEM_PROMPT,
        user: format!(
            "Research findings with credibility scores:\n{}\n\nAudit these sources. Reject anything with a score below {}.",
            prompt_json(research, PROMPT_BUDGET),
            threshold
        ),
    }
}

/// Re-score accepted sources and demote those below `threshold`
pub fn enforce_threshold(audit: &mut AuditReport, threshold: u8) -> usize {
    let mut demoted = 0;
    for finding in &mut audit.audited_findings {
        let accepted = std::mem::take(&mut finding.accepted_sources);
        for mut source in accepted {
            let score = score_source(&source.url, None);
            source.apply_score(&score);
            if source.score >= threshold {
                finding.accepted_sources.push(source);
            } else {
                debug!(url = %source.url, score = source.score, "Demoting accepted source");
                finding.rejected_sources.push(RejectedSource {
                    url: source.url,
                    reason: BELOW_THRESHOLD_REASON.to_string(),
                });
                demoted += 1;
            }
        }
    }
    demoted
}

/// Run the audit stage; scores `research` in place
pub async fn run(ctx: &StageContext<'_>, research: &mut ResearchReport) -> Result<AuditReport, GenerationError> {
    let emitter = ctx.emitter(StageName::Audit);
    let threshold = ctx.config.score_threshold;

    score_evidence(research, threshold, &emitter);

    emitter.log("Analyzing source quality...");
    let prompt = prompt(research, threshold);
    let reply = ctx.generate(StageName::Audit, &prompt).await?;

    let mut audit = into_record(
        parse_reply(StageName::Audit, &reply),
        AuditReport::from_value,
        AuditReport::unparsed,
    );
    let demoted = enforce_threshold(&mut audit, threshold);

    info!(
        accepted = audit.accepted_count(),
        rejected = audit.rejected_count(),
        demoted,
        needs_more_research = audit.needs_more_research(),
        "Audit complete"
    );
    Ok(audit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CredibilityTier, Evidence, Finding};
    use crate::workflow::{EventKind, Observer, PipelineEvent};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Logs(Mutex<Vec<String>>);

    impl Observer for Logs {
        fn notify(&self, _stage: StageName, event: &PipelineEvent) -> anyhow::Result<()> {
            if event.kind() == EventKind::Log {
                self.0.lock().unwrap().push(event.payload().to_string());
            }
            Ok(())
        }
    }

    fn research() -> ResearchReport {
        ResearchReport {
            sub_claims: vec!["visible from the Moon".to_string()],
            findings: vec![Finding {
                sub_claim: "visible from the Moon".to_string(),
                evidence: vec![
                    Evidence {
                        source_url: "https://www.nasa.gov/wall".to_string(),
                        ..Default::default()
                    },
                    Evidence {
                        source_url: "https://myths.example/wall".to_string(),
                        ..Default::default()
                    },
                ],
            }],
            raw_response: None,
        }
    }

    #[test]
    fn test_score_evidence_enriches_and_logs() {
        let logs = Logs::default();
        let emitter = StageEmitter::new(&logs, StageName::Audit);
        let mut report = research();

        score_evidence(&mut report, 5, &emitter);

        assert!(report.evidence().all(|e| e.is_scored()));
        let first = &report.findings[0].evidence[0];
        assert_eq!(first.domain.as_deref(), Some("nasa.gov"));
        assert_eq!(first.credibility_tier, Some(CredibilityTier::HighlyCredible));

        let logs = logs.0.lock().unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs[0].starts_with("Scoring nasa.gov → 10/10 (Tier 1"));
        assert!(logs[0].ends_with("ACCEPTED"));
        assert!(logs[1].ends_with("REJECTED"));
    }

    #[test]
    fn test_prompt_carries_scores_and_threshold() {
        let logs = Logs::default();
        let mut report = research();
        score_evidence(&mut report, 5, &StageEmitter::new(&logs, StageName::Audit));

        let prompt = prompt(&report, 5);
        assert!(prompt.user.contains("\"credibility_score\": 10"));
        assert!(prompt.user.ends_with("below 5."));
    }

    #[test]
    fn test_enforce_threshold_demotes_and_rescores() {
        let mut audit = AuditReport::from_value(&json!({
            "audited_findings": [{
                "sub_claim": "s",
                "accepted_sources": [
                    {"url": "https://reuters.com/a", "score": 3},
                    {"url": "https://randomblog.example/b", "score": 9}
                ],
                "rejected_sources": [{"url": "https://c.example", "reason": "off topic"}]
            }]
        }));

        let demoted = enforce_threshold(&mut audit, 5);
        let finding = &audit.audited_findings[0];

        assert_eq!(demoted, 1);
        assert_eq!(finding.accepted_sources.len(), 1);
        assert_eq!(finding.accepted_sources[0].score, 10);
        assert_eq!(finding.accepted_sources[0].domain, "reuters.com");
        assert_eq!(finding.rejected_sources.len(), 2);
        assert_eq!(finding.rejected_sources[1].reason, BELOW_THRESHOLD_REASON);
    }

    #[test]
    fn test_threshold_zero_accepts_everything() {
        let mut audit = AuditReport::from_value(&json!({
            "audited_findings": [{"accepted_sources": [{"url": ""}]}]
        }));
        assert_eq!(enforce_threshold(&mut audit, 0), 0);
        assert_eq!(audit.accepted_count(), 1);
    }
}
