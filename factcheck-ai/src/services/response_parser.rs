//! Best-effort extraction of structured records from generated text
//!
//! Extraction order:
//! 1. First fenced code block tagged `json` (or untagged) that contains a
//!    balanced object which parses.
//! 2. First balanced `{...}` substring anywhere in the text that parses.
//! 3. Otherwise the raw text, exposed under [`RAW_RESPONSE_FIELD`].
//!
//! Nothing here returns an error or panics, whatever the input.

use serde_json::{Map, Value};
use tracing::debug;

/// Field name carrying the raw text in the sentinel record
pub const RAW_RESPONSE_FIELD: &str = "raw_response";

/// Outcome of parsing a reply
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    /// A JSON object was found
    Structured(Value),
    /// No object could be extracted; the full reply text
    Raw(String),
}

impl Parsed {
    pub fn is_structured(&self) -> bool {
        matches!(self, Parsed::Structured(_))
    }

    /// Record view: the object itself, or `{"raw_response": text}`
    pub fn into_value(self) -> Value {
        match self {
            Parsed::Structured(value) => value,
            Parsed::Raw(text) => {
                let mut map = Map::new();
                map.insert(RAW_RESPONSE_FIELD.to_string(), Value::String(text));
                Value::Object(map)
            }
        }
    }
}

/// Extract the structured record from a generated reply
pub fn parse_response(text: &str) -> Parsed {
    if let Some(value) = fenced_blocks(text).find_map(|block| first_object(block)) {
        return Parsed::Structured(value);
    }
    if let Some(value) = first_object(text) {
        return Parsed::Structured(value);
    }
    debug!(len = text.len(), "No structured record in reply, keeping raw text");
    Parsed::Raw(text.to_string())
}

/// Extract a JSON list of strings (fenced block first, then anywhere)
///
/// Non-string items are dropped; an empty or missing list is `None`.
pub fn parse_string_list(text: &str) -> Option<Vec<String>> {
    let parse = |candidate: &str| -> Option<Vec<String>> {
        let items = first_balanced(candidate, '[', ']', |slice| {
            serde_json::from_str::<Vec<Value>>(slice).ok()
        })?;
        let strings: Vec<String> = items
            .into_iter()
            .filter_map(|v| v.as_str().map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty())
            .collect();
        (!strings.is_empty()).then_some(strings)
    };

    fenced_blocks(text)
        .find_map(|block| parse(block))
        .or_else(|| parse(text))
}

/// Bodies of fenced code blocks whose info string is empty or `json`
fn fenced_blocks(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || loop {
        let open = rest.find("```")?;
        let after_fence = &rest[open + 3..];
        let line_end = after_fence.find('\n').unwrap_or(after_fence.len());
        let tag = after_fence[..line_end].trim();
        let body_start = (line_end + 1).min(after_fence.len());
        let body = &after_fence[body_start..];

        let (content, next) = match body.find("```") {
            Some(close) => (&body[..close], &body[close + 3..]),
            None => (body, ""),
        };
        rest = next;

        if tag.is_empty() || tag.eq_ignore_ascii_case("json") {
            return Some(content);
        }
        if rest.is_empty() {
            return None;
        }
    })
}

/// First balanced object in `text` that parses as a JSON object
fn first_object(text: &str) -> Option<Value> {
    first_balanced(text, '{', '}', |slice| {
        serde_json::from_str::<Value>(slice).ok().filter(Value::is_object)
    })
}

/// Parse attempts per text before giving up on it
const MAX_PARSE_ATTEMPTS: usize = 64;

/// Try balanced `open..close` spans in start order until `accept` yields a value
///
/// Spans come from a single pass over the text, so cost stays linear in its
/// length however deeply nested or unbalanced it is.
fn first_balanced<T>(
    text: &str,
    open: char,
    close: char,
    accept: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    balanced_spans(text, open, close)
        .into_iter()
        .take(MAX_PARSE_ATTEMPTS)
        .find_map(|(start, end)| accept(&text[start..end]))
}

/// Byte ranges of every balanced `open..close` span, ordered by start
///
/// Quotes open JSON strings only inside a span; delimiters inside strings
/// are ignored. Opens that never close yield no span.
fn balanced_spans(text: &str, open: char, close: char) -> Vec<(usize, usize)> {
    let mut stack: Vec<usize> = Vec::new();
    let mut spans = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        if c == '"' && !stack.is_empty() {
            in_string = true;
        } else if c == open {
            stack.push(i);
        } else if c == close {
            if let Some(start) = stack.pop() {
                spans.push((start, i + c.len_utf8()));
            }
        }
    }

    spans.sort_unstable_by_key(|(start, _)| *start);
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_block_wins() {
        let text = "Here you go {\"decoy\": 1}\n```json\n{\"verdict\": \"FALSE\"}\n```\n";
        assert_eq!(parse_response(text), Parsed::Structured(json!({"verdict": "FALSE"})));
    }

    #[test]
    fn test_untagged_fence() {
        let text = "```\n{\"a\": [1, 2]}\n```";
        assert_eq!(parse_response(text), Parsed::Structured(json!({"a": [1, 2]})));
    }

    #[test]
    fn test_other_language_fence_skipped() {
        let text = "```python\nx = {'a': 1}\n```\nthen {\"b\": 2}";
        assert_eq!(parse_response(text), Parsed::Structured(json!({"b": 2})));
    }

    #[test]
    fn test_bare_object_in_prose() {
        let text = "Sure! {\"sub_claims\": [\"x\"], \"note\": \"a } inside\"} Hope that helps.";
        assert_eq!(
            parse_response(text),
            Parsed::Structured(json!({"sub_claims": ["x"], "note": "a } inside"}))
        );
    }

    #[test]
    fn test_skips_unparseable_brace_groups() {
        let text = "{not json} and then {\"ok\": true}";
        assert_eq!(parse_response(text), Parsed::Structured(json!({"ok": true})));
    }

    #[test]
    fn test_prose_becomes_raw() {
        let text = "The claim is false.";
        let parsed = parse_response(text);
        assert_eq!(parsed, Parsed::Raw(text.to_string()));
        assert_eq!(parsed.into_value(), json!({"raw_response": "The claim is false."}));
    }

    #[test]
    fn test_malformed_inputs_never_panic() {
        for text in ["", "{", "}", "}{", "{{{", "```", "```json", "```json\n{", "\"{\"", "{\"a\": \"\\\"}", "日本{語}"] {
            let parsed = parse_response(text);
            assert!(!parsed.is_structured(), "unexpected structure for {:?}", text);
        }
    }

    #[test]
    fn test_string_list() {
        assert_eq!(
            parse_string_list("Sub-claims:\n[\"a\", \"b\", 3, \"\"]"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            parse_string_list("```json\n[\"x\"]\n```"),
            Some(vec!["x".to_string()])
        );
        assert_eq!(parse_string_list("[]"), None);
        assert_eq!(parse_string_list("none"), None);
    }

    #[test]
    fn test_nested_object_inside_failed_span() {
        let text = "{note: {\"a\": 1}} trailing";
        assert_eq!(parse_response(text), Parsed::Structured(json!({"a": 1})));
    }

    #[test]
    fn test_spans_ordered_by_start() {
        assert_eq!(balanced_spans("{a{b}}{c}", '{', '}'), vec![(0, 6), (2, 5), (6, 9)]);
        assert!(balanced_spans("{{{", '{', '}').is_empty());
    }

    #[test]
    fn test_pathological_input_is_fast() {
        let unbalanced = "{".repeat(200_000);
        let nested = format!("{}{}", "{\"a\":".repeat(50_000), "}".repeat(50_001));

        let start = std::time::Instant::now();
        assert!(!parse_response(&unbalanced).is_structured());
        assert!(!parse_response(&nested).is_structured());
        assert!(start.elapsed() < std::time::Duration::from_secs(2), "took {:?}", start.elapsed());
    }
}
