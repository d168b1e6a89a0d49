//! Typed records produced by the pipeline stages
//!
//! Records are built from loosely-structured model output. Construction is
//! lenient: a missing or mistyped field takes its default instead of failing
//! the record, and numeric fields are clamped into their declared ranges.

pub mod argument;
pub mod audit;
pub mod credibility;
pub mod evidence;
pub mod result;
pub mod verdict;

pub use argument::{ArgumentPoint, ArgumentSet, Strength};
pub use audit::{AuditReport, AuditedFinding, AuditedSource, RejectedSource};
pub use credibility::{CredibilityTier, SourceScore};
pub use evidence::{Evidence, Finding, ResearchReport};
pub use result::PipelineResult;
pub use verdict::{KeySource, SubVerdict, Verdict, VerdictLabel};

use serde_json::Value;

/// String field, or empty when absent / not a scalar
pub(crate) fn str_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// First non-empty string among several candidate keys
pub(crate) fn str_field_any(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .map(|key| str_field(value, key))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// Boolean field; accepts JSON booleans, "true"/"yes" strings and non-zero numbers
pub(crate) fn bool_field(value: &Value, key: &str) -> bool {
    match value.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}

/// Integer field; accepts integers, floats (rounded) and numeric strings such as "85%"
pub(crate) fn int_field(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let cleaned = s.trim().trim_end_matches('%').trim();
            cleaned
                .parse::<i64>()
                .ok()
                .or_else(|| cleaned.parse::<f64>().ok().map(|f| f.round() as i64))
        }
        _ => None,
    }
}

/// Array field, or an empty slice
pub(crate) fn array_field<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// List of free-form points; non-string entries are kept as compact JSON
pub(crate) fn string_list(value: &Value, key: &str) -> Vec<String> {
    array_field(value, key)
        .iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::String(_) | Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect()
}

/// Clamp into 0..=100
pub(crate) fn clamp_confidence(raw: i64) -> u8 {
    raw.clamp(0, 100) as u8
}

/// Clamp into 0..=10
pub(crate) fn clamp_score(raw: i64) -> u8 {
    raw.clamp(0, 10) as u8
}
