//! Gemini generation service
//!
//! Implements [`GenerationService`] against the Generative Language REST API.
//! - Blocking: `POST /v1beta/models/{model}:generateContent`
//! - Streaming: `POST /v1beta/models/{model}:streamGenerateContent?alt=sse`
//!
//! HTTP 429 (or an error status of `RESOURCE_EXHAUSTED`) is reported as
//! [`GenerationError::Throttled`]; all other failures as
//! [`GenerationError::Service`].

use super::generation_client::{ChunkSink, GenerationError, GenerationService};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Generation can take a while for long prompts
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const USER_AGENT: &str = concat!("factcheck-ai/", env!("CARGO_PKG_VERSION"));

/// Gemini REST client
pub struct GeminiClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, temperature: f32) -> Result<Self, GenerationError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| GenerationError::Service(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: GEMINI_API_URL.to_string(),
            api_key,
            model,
            temperature,
        })
    }

    /// Point at a different API root (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn body<'a>(&self, system_instruction: &'a str, user_content: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: system_instruction }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: user_content }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        }
    }

    async fn post(&self, method: &str, body: &GenerateRequest<'_>) -> Result<Response, GenerationError> {
        let url = format!("{}/models/{}:{}", self.base_url, self.model, method);
        debug!(model = %self.model, method, "Sending Gemini request");

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Service(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status, &body))
    }
}

/// Map a non-success response to an error
fn classify_error(status: StatusCode, body: &str) -> GenerationError {
    let exhausted = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/status").and_then(Value::as_str).map(str::to_string))
        .map(|s| s == "RESOURCE_EXHAUSTED")
        .unwrap_or(false);

    if status == StatusCode::TOO_MANY_REQUESTS || exhausted {
        GenerationError::Throttled(format!("Gemini returned {}", status))
    } else {
        GenerationError::Service(format!("Gemini returned {}: {}", status, body))
    }
}

/// Concatenated text parts of the first candidate
fn candidate_text(response: &Value) -> String {
    response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Text carried by one SSE line, if it is a `data:` line with content
fn sse_line_text(line: &str) -> Result<Option<String>, GenerationError> {
    let Some(data) = line.trim_end_matches('\r').strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(data)
        .map_err(|e| GenerationError::Service(format!("Malformed Gemini stream event: {}", e)))?;
    if let Some(error) = value.get("error") {
        let status = error.get("status").and_then(Value::as_str).unwrap_or_default();
        return Err(if status == "RESOURCE_EXHAUSTED" {
            GenerationError::Throttled(error.to_string())
        } else {
            GenerationError::Service(error.to_string())
        });
    }
    let text = candidate_text(&value);
    Ok((!text.is_empty()).then_some(text))
}

/// Splits a byte stream into lines, decoding only complete lines
///
/// Network chunks may end inside a multi-byte character, so bytes are held
/// until the next newline arrives.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and return every line it completes
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Trailing bytes after the last newline
    fn finish(self) -> String {
        String::from_utf8_lossy(&self.pending).into_owned()
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn request(&self, system_instruction: &str, user_content: &str) -> Result<String, GenerationError> {
        let body = self.body(system_instruction, user_content);
        let response = self.post("generateContent", &body).await?;

        let value: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Service(format!("Failed to parse Gemini response: {}", e)))?;
        Ok(candidate_text(&value))
    }

    async fn request_streaming(
        &self,
        system_instruction: &str,
        user_content: &str,
        sink: ChunkSink<'_>,
    ) -> Result<String, GenerationError> {
        let body = self.body(system_instruction, user_content);
        let response = self.post("streamGenerateContent?alt=sse", &body).await?;

        let mut stream = response.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut full_text = String::new();

        while let Some(bytes) = stream.next().await {
            let bytes = bytes.map_err(|e| GenerationError::Service(format!("Gemini stream interrupted: {}", e)))?;

            for line in lines.push(&bytes) {
                if let Some(text) = sse_line_text(&line)? {
                    sink(&text);
                    full_text.push_str(&text);
                }
            }
        }

        if let Some(text) = sse_line_text(&lines.finish())? {
            sink(&text);
            full_text.push_str(&text);
        }

        Ok(full_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let client = GeminiClient::new("key".to_string(), "gemini-2.5-flash".to_string(), 0.3).unwrap();
        let body = serde_json::to_value(client.body("be terse", "hello")).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be terse");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert!(body["systemInstruction"].get("role").is_none());
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_candidate_text_joins_parts() {
        let v = json!({"candidates": [{"content": {"parts": [{"text": "a"}, {"text": "b"}]}}]});
        assert_eq!(candidate_text(&v), "ab");
        assert_eq!(candidate_text(&json!({})), "");
    }

    #[test]
    fn test_classify_throttling() {
        assert!(matches!(
            classify_error(StatusCode::TOO_MANY_REQUESTS, ""),
            GenerationError::Throttled(_)
        ));
        let exhausted = r#"{"error": {"code": 400, "status": "RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(
            classify_error(StatusCode::BAD_REQUEST, exhausted),
            GenerationError::Throttled(_)
        ));
        assert!(matches!(
            classify_error(StatusCode::UNAUTHORIZED, "bad key"),
            GenerationError::Service(_)
        ));
    }

    #[test]
    fn test_sse_line_parsing() {
        let line = r#"data: {"candidates": [{"content": {"parts": [{"text": "chunk"}]}}]}"#;
        assert_eq!(sse_line_text(line).unwrap(), Some("chunk".to_string()));
        assert_eq!(sse_line_text("").unwrap(), None);
        assert_eq!(sse_line_text(": keep-alive").unwrap(), None);
        assert!(sse_line_text("data: {not json").is_err());

        let throttled = r#"data: {"error": {"status": "RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(sse_line_text(throttled), Err(GenerationError::Throttled(_))));
    }

    #[test]
    fn test_line_buffer_keeps_split_characters_intact() {
        let line = "data: {\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"Tier 2 – Credible\"}]}}]}\n";
        let bytes = line.as_bytes();
        // Cut after the first byte of the three-byte en dash
        let cut = line.find('–').unwrap() + 1;

        let mut buffer = LineBuffer::default();
        assert!(buffer.push(&bytes[..cut]).is_empty());
        let lines = buffer.push(&bytes[cut..]);

        assert_eq!(lines.len(), 1);
        assert_eq!(sse_line_text(&lines[0]).unwrap(), Some("Tier 2 – Credible".to_string()));
        assert_eq!(buffer.finish(), "");
    }

    #[test]
    fn test_line_buffer_returns_unterminated_tail() {
        let mut buffer = LineBuffer::default();
        let lines = buffer.push(b"data: a\ndata: b");
        assert_eq!(lines, vec!["data: a\n".to_string()]);
        assert_eq!(buffer.finish(), "data: b");
    }
}
