//! Audit output: accepted/rejected sources per sub-claim

use super::{
    array_field, bool_field, clamp_score, int_field, str_field, str_field_any, string_list,
    CredibilityTier, SourceScore,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Source that passed the audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditedSource {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub score: u8,
    pub tier: CredibilityTier,
    pub domain: String,
}

impl AuditedSource {
    pub fn from_value(value: &Value) -> Self {
        let score = clamp_score(int_field(value, "score").unwrap_or(0));
        Self {
            url: str_field_any(value, &["url", "source_url"]),
            title: str_field_any(value, &["title", "source_title"]),
            snippet: str_field(value, "snippet"),
            score,
            tier: CredibilityTier::from_base_score(score),
            domain: str_field(value, "domain"),
        }
    }

    /// Replace model-reported credibility with a computed score
    pub fn apply_score(&mut self, score: &SourceScore) {
        self.score = score.score;
        self.tier = score.tier;
        self.domain = score.domain.clone();
    }
}

/// Source rejected by the audit, with the reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedSource {
    pub url: String,
    pub reason: String,
}

impl RejectedSource {
    pub fn from_value(value: &Value) -> Self {
        Self {
            url: str_field_any(value, &["url", "source_url"]),
            reason: str_field(value, "reason"),
        }
    }
}

/// Audit verdict for one sub-claim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditedFinding {
    pub sub_claim: String,
    pub accepted_sources: Vec<AuditedSource>,
    pub rejected_sources: Vec<RejectedSource>,
    pub contradictions: Vec<String>,
    pub needs_more_research: bool,
    pub research_suggestions: String,
}

impl AuditedFinding {
    pub fn from_value(value: &Value) -> Self {
        Self {
            sub_claim: str_field(value, "sub_claim"),
            accepted_sources: array_field(value, "accepted_sources")
                .iter()
                .filter(|v| v.is_object())
                .map(AuditedSource::from_value)
                .collect(),
            rejected_sources: array_field(value, "rejected_sources")
                .iter()
                .filter(|v| v.is_object())
                .map(RejectedSource::from_value)
                .collect(),
            contradictions: string_list(value, "contradictions"),
            needs_more_research: bool_field(value, "needs_more_research"),
            research_suggestions: research_suggestions(value),
        }
    }
}

/// Suggestions may arrive as a string or a list of strings
fn research_suggestions(value: &Value) -> String {
    match value.get("research_suggestions") {
        Some(Value::Array(_)) => string_list(value, "research_suggestions").join("; "),
        _ => str_field(value, "research_suggestions"),
    }
}

/// Complete audit stage output; superseded, never merged, on retry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub audited_findings: Vec<AuditedFinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl AuditReport {
    pub fn from_value(value: &Value) -> Self {
        Self {
            audited_findings: array_field(value, "audited_findings")
                .iter()
                .filter(|v| v.is_object())
                .map(AuditedFinding::from_value)
                .collect(),
            raw_response: None,
        }
    }

    pub fn unparsed(raw: String) -> Self {
        Self {
            raw_response: Some(raw),
            ..Default::default()
        }
    }

    /// True when any finding asks for another research pass
    pub fn needs_more_research(&self) -> bool {
        self.audited_findings.iter().any(|f| f.needs_more_research)
    }

    /// Non-empty suggestions of the flagged findings, in order
    pub fn research_suggestions(&self) -> Vec<&str> {
        self.audited_findings
            .iter()
            .filter(|f| f.needs_more_research)
            .map(|f| f.research_suggestions.trim())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn accepted_count(&self) -> usize {
        self.audited_findings.iter().map(|f| f.accepted_sources.len()).sum()
    }

    pub fn rejected_count(&self) -> usize {
        self.audited_findings.iter().map(|f| f.rejected_sources.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "audited_findings": [
                {
                    "sub_claim": "visible from the Moon",
                    "accepted_sources": [{"url": "https://nasa.gov/a", "title": "NASA", "score": "12", "snippet": "no"}],
                    "rejected_sources": [{"url": "https://blog.example", "reason": "unknown domain"}],
                    "contradictions": ["A vs B"],
                    "needs_more_research": true,
                    "research_suggestions": "astronaut testimony"
                },
                {
                    "sub_claim": "naked eye",
                    "needs_more_research": "yes",
                    "research_suggestions": ["angular resolution", "orbit altitude"]
                },
                {
                    "sub_claim": "other",
                    "needs_more_research": false,
                    "research_suggestions": "ignored"
                }
            ]
        })
    }

    #[test]
    fn test_from_value_clamps_and_counts() {
        let report = AuditReport::from_value(&sample());
        assert_eq!(report.audited_findings.len(), 3);
        assert_eq!(report.accepted_count(), 1);
        assert_eq!(report.rejected_count(), 1);

        let accepted = &report.audited_findings[0].accepted_sources[0];
        assert_eq!(accepted.score, 10);
        assert_eq!(accepted.tier, CredibilityTier::HighlyCredible);
    }

    #[test]
    fn test_research_suggestions_only_from_flagged() {
        let report = AuditReport::from_value(&sample());
        assert!(report.needs_more_research());
        assert_eq!(
            report.research_suggestions(),
            vec!["astronaut testimony", "angular resolution; orbit altitude"]
        );
    }

    #[test]
    fn test_unparsed_never_requests_research() {
        let report = AuditReport::unparsed("garbled".to_string());
        assert!(!report.needs_more_research());
        assert!(report.research_suggestions().is_empty());
    }
}
