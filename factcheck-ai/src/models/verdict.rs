//! Adjudication output

use super::{array_field, clamp_confidence, int_field, str_field, str_field_any};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Confidence assumed when the model gives none
pub const DEFAULT_CONFIDENCE: u8 = 50;

/// Closed five-point verdict scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerdictLabel {
    #[serde(rename = "TRUE")]
    True,
    #[serde(rename = "MOSTLY TRUE")]
    MostlyTrue,
    #[serde(rename = "PARTIALLY TRUE")]
    PartiallyTrue,
    #[serde(rename = "MOSTLY FALSE")]
    MostlyFalse,
    #[serde(rename = "FALSE")]
    False,
}

impl VerdictLabel {
    pub const ALL: [VerdictLabel; 5] = [
        VerdictLabel::True,
        VerdictLabel::MostlyTrue,
        VerdictLabel::PartiallyTrue,
        VerdictLabel::MostlyFalse,
        VerdictLabel::False,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictLabel::True => "TRUE",
            VerdictLabel::MostlyTrue => "MOSTLY TRUE",
            VerdictLabel::PartiallyTrue => "PARTIALLY TRUE",
            VerdictLabel::MostlyFalse => "MOSTLY FALSE",
            VerdictLabel::False => "FALSE",
        }
    }

    /// Parse a label case-insensitively; `_`/`-` count as spaces
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw
            .trim()
            .to_ascii_uppercase()
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        Self::ALL.into_iter().find(|label| label.as_str() == normalized)
    }

    /// Label implied by a confidence on the verdict scale
    pub fn from_confidence(confidence: u8) -> Self {
        match confidence {
            80..=u8::MAX => VerdictLabel::True,
            60..=79 => VerdictLabel::MostlyTrue,
            40..=59 => VerdictLabel::PartiallyTrue,
            20..=39 => VerdictLabel::MostlyFalse,
            _ => VerdictLabel::False,
        }
    }

    /// First label mentioned in free text, longest labels first
    ///
    /// Labels must stand as whole words, and a mention directly after "not"
    /// is skipped.
    pub fn find_in_text(text: &str) -> Option<Self> {
        let upper = text.to_ascii_uppercase();
        [
            VerdictLabel::PartiallyTrue,
            VerdictLabel::MostlyTrue,
            VerdictLabel::MostlyFalse,
        ]
        .into_iter()
        .chain([VerdictLabel::True, VerdictLabel::False])
        .filter_map(|label| first_plain_mention(&upper, label.as_str()).map(|pos| (pos, label)))
        .min_by_key(|(pos, label)| (*pos, std::cmp::Reverse(label.as_str().len())))
        .map(|(_, label)| label)
    }

}

/// Byte offset of the first whole-word, non-negated occurrence of `label`
fn first_plain_mention(text: &str, label: &str) -> Option<usize> {
    text.match_indices(label).map(|(pos, _)| pos).find(|&pos| {
        let before = &text[..pos];
        let after = &text[pos + label.len()..];
        let bounded = !before.chars().next_back().is_some_and(char::is_alphanumeric)
            && !after.chars().next().is_some_and(char::is_alphanumeric);
        bounded && before.split_whitespace().next_back() != Some("NOT")
    })
}

impl fmt::Display for VerdictLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve label and confidence from a record's fields
fn label_and_confidence(value: &Value, label_key: &str, confidence_key: &str) -> (VerdictLabel, u8) {
    let confidence = int_field(value, confidence_key)
        .map(clamp_confidence)
        .unwrap_or(DEFAULT_CONFIDENCE);
    let label = VerdictLabel::parse(&str_field(value, label_key))
        .unwrap_or_else(|| VerdictLabel::from_confidence(confidence));
    (label, confidence)
}

/// Verdict on one sub-claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubVerdict {
    pub sub_claim: String,
    pub verdict: VerdictLabel,
    pub confidence: u8,
    pub reasoning: String,
}

impl SubVerdict {
    pub fn from_value(value: &Value) -> Self {
        let (verdict, confidence) = label_and_confidence(value, "verdict", "confidence");
        Self {
            sub_claim: str_field(value, "sub_claim"),
            verdict,
            confidence,
            reasoning: str_field(value, "reasoning"),
        }
    }
}

/// Source the verdict leans on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeySource {
    pub url: String,
    pub title: String,
    pub why_important: String,
}

impl KeySource {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(url) if !url.trim().is_empty() => Some(Self {
                url: url.trim().to_string(),
                title: String::new(),
                why_important: String::new(),
            }),
            Value::Object(_) => Some(Self {
                url: str_field_any(value, &["url", "source_url"]),
                title: str_field_any(value, &["title", "source_title"]),
                why_important: str_field_any(value, &["why_important", "reason"]),
            }),
            _ => None,
        }
    }
}

/// Complete adjudication stage output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub sub_verdicts: Vec<SubVerdict>,
    pub overall_verdict: VerdictLabel,
    pub overall_confidence: u8,
    pub reasoning: String,
    pub key_sources: Vec<KeySource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl Verdict {
    pub fn from_value(value: &Value) -> Self {
        let (overall_verdict, overall_confidence) =
            label_and_confidence(value, "overall_verdict", "overall_confidence");
        Self {
            sub_verdicts: array_field(value, "sub_verdicts")
                .iter()
                .filter(|v| v.is_object())
                .map(SubVerdict::from_value)
                .collect(),
            overall_verdict,
            overall_confidence,
            reasoning: str_field(value, "reasoning"),
            key_sources: array_field(value, "key_sources")
                .iter()
                .filter_map(KeySource::from_value)
                .collect(),
            raw_response: None,
        }
    }

    /// Degraded verdict for an unparseable reply: a label named in the text
    /// wins, otherwise the neutral default
    pub fn unparsed(raw: String) -> Self {
        let overall_verdict = VerdictLabel::find_in_text(&raw)
            .unwrap_or_else(|| VerdictLabel::from_confidence(DEFAULT_CONFIDENCE));
        Self {
            sub_verdicts: Vec::new(),
            overall_verdict,
            overall_confidence: DEFAULT_CONFIDENCE,
            reasoning: raw.clone(),
            key_sources: Vec::new(),
            raw_response: Some(raw),
        }
    }
}
