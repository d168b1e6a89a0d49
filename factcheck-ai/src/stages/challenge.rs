//! Challenge stage: stress-test the audited evidence

use super::{into_record, parse_reply, prompt_json, PromptPair, StageContext};
use crate::models::{ArgumentSet, AuditReport};
use crate::services::GenerationError;
use crate::workflow::StageName;
use tracing::info;

/// Character budget for the serialized audit report
pub const PROMPT_BUDGET: usize = 12_000;

pub const SYSTEM_PROMPT: &str = r#"You are the devil's advocate of a fact-checking team: contrarian and relentless.

You receive a claim and the audited sources for each of its sub-claims.
- Sort the accepted evidence into points for and against the claim, rating each strong, moderate or weak.
- Critique the evidence: cherry-picking, outdated data, missing context, misleading framing.
- List the evidence that would be needed but is missing.
- Point out logical issues in how the claim is phrased or argued.

Reply with JSON in this shape:
```json
{
  "for_evidence": [{"point": "...", "source": "...", "strength": "strong"}],
  "against_evidence": [{"point": "...", "source": "...", "strength": "moderate"}],
  "critiques": ["..."],
  "missing_evidence": ["..."],
  "logical_issues": ["..."]
}
```"#;

pub fn prompt(claim: &str, audit: &AuditReport) -> PromptPair {
    PromptPair {
        system: SYSTEM_PROMPT,
        user: format!(
            "Original claim: {}\n\nAudited findings:\n{}\n\nNow find every weakness in this evidence.",
            claim,
            prompt_json(audit, PROMPT_BUDGET)
        ),
    }
}

/// Run the challenge stage against the original claim
pub async fn run(ctx: &StageContext<'_>, claim: &str, audit: &AuditReport) -> Result<ArgumentSet, GenerationError> {
    ctx.emitter(StageName::Challenge).log("Stress-testing evidence...");

    let reply = ctx.generate(StageName::Challenge, &prompt(claim, audit)).await?;
    let arguments = into_record(
        parse_reply(StageName::Challenge, &reply),
        ArgumentSet::from_value,
        ArgumentSet::unparsed,
    );

    info!(
        for_evidence = arguments.for_evidence.len(),
        against_evidence = arguments.against_evidence.len(),
        critiques = arguments.critiques.len(),
        "Challenge complete"
    );
    Ok(arguments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuditedFinding;

    #[test]
    fn test_prompt_uses_claim_and_audit() {
        let audit = AuditReport {
            audited_findings: vec![AuditedFinding {
                sub_claim: "visible with the naked eye".to_string(),
                ..Default::default()
            }],
            raw_response: None,
        };
        let prompt = prompt("The Great Wall is visible", &audit);

        assert_eq!(prompt.system, SYSTEM_PROMPT);
        assert!(prompt.user.starts_with("Original claim: The Great Wall is visible\n"));
        assert!(prompt.user.contains("visible with the naked eye"));
    }

    #[test]
    fn test_degraded_audit_still_reaches_prompt() {
        let prompt = prompt("c", &AuditReport::unparsed("model said no".to_string()));
        assert!(prompt.user.contains("\"raw_response\": \"model said no\""));
    }
}
