//! Adjudication stage: the final verdict

use super::{into_record, parse_reply, prompt_json, PromptPair, StageContext};
use crate::models::{ArgumentSet, AuditReport, Verdict};
use crate::services::GenerationError;
use crate::workflow::StageName;
use tracing::info;

/// Budget for the serialized audit report
pub const AUDIT_BUDGET: usize = 6_000;
/// Budget for the serialized challenge output
pub const ARGUMENTS_BUDGET: usize = 6_000;

pub const SYSTEM_PROMPT: &str = r#"You are the adjudicator of a fact-checking team: balanced and measured.

You receive a claim, the audited sources, and a devil's advocate analysis of them.
Weigh both and rule on every sub-claim and on the claim as a whole, using exactly one of:
TRUE, MOSTLY TRUE, PARTIALLY TRUE, MOSTLY FALSE, FALSE.
Confidence is an integer from 0 to 100. Name the sources your ruling depends on.

Reply with JSON in this shape:
```json
{
  "sub_verdicts": [
    {"sub_claim": "...", "verdict": "MOSTLY TRUE", "confidence": 80, "reasoning": "..."}
  ],
  "overall_verdict": "MOSTLY TRUE",
  "overall_confidence": 72,
  "reasoning": "Two or three sentences explaining the verdict.",
  "key_sources": [{"url": "...", "title": "...", "why_important": "..."}]
}
```"#;

pub fn prompt(claim: &str, audit: &AuditReport, arguments: &ArgumentSet) -> PromptPair {
    PromptPair {
        system: SYSTEM_PROMPT,
        user: format!(
            "Original claim: {}\n\nAudited sources:\n{}\n\nChallenge analysis:\n{}\n\nDeliver your verdict.",
            claim,
            prompt_json(audit, AUDIT_BUDGET),
            prompt_json(arguments, ARGUMENTS_BUDGET)
        ),
    }
}

/// Run the adjudication stage against the original claim
pub async fn run(
    ctx: &StageContext<'_>,
    claim: &str,
    audit: &AuditReport,
    arguments: &ArgumentSet,
) -> Result<Verdict, GenerationError> {
    ctx.emitter(StageName::Adjudicate).log("Weighing all evidence...");

    let reply = ctx
        .generate(StageName::Adjudicate, &prompt(claim, audit, arguments))
        .await?;
    let verdict = into_record(
        parse_reply(StageName::Adjudicate, &reply),
        Verdict::from_value,
        Verdict::unparsed,
    );

    info!(
        verdict = %verdict.overall_verdict,
        confidence = verdict.overall_confidence,
        "Adjudication complete"
    );
    Ok(verdict)
}
