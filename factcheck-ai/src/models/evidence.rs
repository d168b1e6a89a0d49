//! Research output: sub-claims and the evidence gathered for each

use super::{array_field, bool_field, str_field, str_field_any, string_list, CredibilityTier, SourceScore};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One source-backed data point bearing on a sub-claim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub source_url: String,
    pub source_title: String,
    pub snippet: String,
    pub supports_claim: bool,
    /// Filled in by the audit stage before its prompt is built
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credibility_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credibility_tier: Option<CredibilityTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl Evidence {
    pub fn from_value(value: &Value) -> Self {
        Self {
            source_url: str_field_any(value, &["source_url", "url"]),
            source_title: str_field_any(value, &["source_title", "title"]),
            snippet: str_field(value, "snippet"),
            supports_claim: bool_field(value, "supports_claim"),
            credibility_score: None,
            credibility_tier: None,
            domain: None,
        }
    }

    /// Attach a credibility score
    pub fn apply_score(&mut self, score: &SourceScore) {
        self.credibility_score = Some(score.score);
        self.credibility_tier = Some(score.tier);
        self.domain = Some(score.domain.clone());
    }

    pub fn is_scored(&self) -> bool {
        self.credibility_score.is_some() && self.credibility_tier.is_some()
    }
}

/// A sub-claim with its ordered evidence list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub sub_claim: String,
    pub evidence: Vec<Evidence>,
}

impl Finding {
    pub fn from_value(value: &Value) -> Self {
        Self {
            sub_claim: str_field(value, "sub_claim"),
            evidence: array_field(value, "evidence")
                .iter()
                .filter(|v| v.is_object())
                .map(Evidence::from_value)
                .collect(),
        }
    }
}

/// Complete research stage output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchReport {
    pub sub_claims: Vec<String>,
    pub findings: Vec<Finding>,
    /// Model reply kept verbatim when it held no structured record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl ResearchReport {
    pub fn from_value(value: &Value) -> Self {
        Self {
            sub_claims: string_list(value, "sub_claims"),
            findings: array_field(value, "findings")
                .iter()
                .filter(|v| v.is_object())
                .map(Finding::from_value)
                .collect(),
            raw_response: None,
        }
    }

    /// Degraded report for an unparseable reply
    pub fn unparsed(raw: String) -> Self {
        Self {
            raw_response: Some(raw),
            ..Default::default()
        }
    }

    pub fn evidence_count(&self) -> usize {
        self.findings.iter().map(|f| f.evidence.len()).sum()
    }

    pub fn evidence(&self) -> impl Iterator<Item = &Evidence> {
        self.findings.iter().flat_map(|f| f.evidence.iter())
    }

    pub fn evidence_mut(&mut self) -> impl Iterator<Item = &mut Evidence> {
        self.findings.iter_mut().flat_map(|f| f.evidence.iter_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_from_value() {
        let v = json!({
            "sub_claims": ["A", "B"],
            "findings": [
                {"sub_claim": "A", "evidence": [
                    {"source_url": "https://nasa.gov/x", "source_title": "NASA", "snippet": "s", "supports_claim": false},
                    "not an object"
                ]},
                {"sub_claim": "B"}
            ]
        });

        let report = ResearchReport::from_value(&v);
        assert_eq!(report.sub_claims, vec!["A", "B"]);
        assert_eq!(report.findings.len(), 2);
        assert_eq!(report.evidence_count(), 1);
        assert_eq!(report.findings[0].evidence[0].source_title, "NASA");
        assert!(!report.findings[0].evidence[0].supports_claim);
        assert!(report.findings[1].evidence.is_empty());
    }

    #[test]
    fn test_evidence_accepts_short_keys() {
        let ev = Evidence::from_value(&json!({"url": "https://a.org", "title": "T"}));
        assert_eq!(ev.source_url, "https://a.org");
        assert_eq!(ev.source_title, "T");
        assert!(!ev.is_scored());
    }

    #[test]
    fn test_apply_score() {
        let mut ev = Evidence::default();
        ev.apply_score(&SourceScore {
            domain: "bbc.com".to_string(),
            score: 10,
            base_score: 10,
            tier: CredibilityTier::HighlyCredible,
            recency_modifier: 0,
        });
        assert!(ev.is_scored());
        assert_eq!(ev.domain.as_deref(), Some("bbc.com"));
    }

    #[test]
    fn test_unparsed_keeps_raw() {
        let report = ResearchReport::unparsed("free text".to_string());
        assert_eq!(report.raw_response.as_deref(), Some("free text"));
        assert_eq!(report.evidence_count(), 0);
    }
}
