//! Challenge output: arguments for and against the claim

use super::{array_field, str_field, str_field_any, string_list};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How strongly a point bears on the claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
    #[default]
    Unknown,
}

impl Strength {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strong" | "high" => Strength::Strong,
            "moderate" | "medium" => Strength::Moderate,
            "weak" | "low" => Strength::Weak,
            _ => Strength::Unknown,
        }
    }
}

/// One annotated argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentPoint {
    pub point: String,
    pub source: String,
    pub strength: Strength,
}

impl ArgumentPoint {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self {
                point: s.trim().to_string(),
                source: String::new(),
                strength: Strength::Unknown,
            }),
            Value::Object(_) => Some(Self {
                point: str_field_any(value, &["point", "argument", "claim"]),
                source: str_field_any(value, &["source", "url"]),
                strength: Strength::parse(&str_field(value, "strength")),
            }),
            _ => None,
        }
    }
}

fn points(value: &Value, key: &str) -> Vec<ArgumentPoint> {
    array_field(value, key)
        .iter()
        .filter_map(ArgumentPoint::from_value)
        .collect()
}

/// Complete challenge stage output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgumentSet {
    pub for_evidence: Vec<ArgumentPoint>,
    pub against_evidence: Vec<ArgumentPoint>,
    pub critiques: Vec<String>,
    pub missing_evidence: Vec<String>,
    pub logical_issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl ArgumentSet {
    pub fn from_value(value: &Value) -> Self {
        Self {
            for_evidence: points(value, "for_evidence"),
            against_evidence: points(value, "against_evidence"),
            critiques: string_list(value, "critiques"),
            missing_evidence: string_list(value, "missing_evidence"),
            logical_issues: string_list(value, "logical_issues"),
            raw_response: None,
        }
    }

    pub fn unparsed(raw: String) -> Self {
        Self {
            raw_response: Some(raw),
            ..Default::default()
        }
    }
}
