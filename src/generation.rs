//! Text-generation interface and the OpenRouter-backed client
//!
//! Every subsystem that needs model output goes through the [`TextGenerator`]
//! trait so the backend can be swapped (or scripted in tests). Model replies
//! that are supposed to be JSON are decoded with [`decode_json`], which
//! tolerates prose around the first balanced `{...}` region; call sites own
//! their fallback value, so a bad reply never propagates as an error.

use crate::error::{AgentError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";

/// Abstraction over a large-language-model completion call
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a single prompt at the given sampling temperature
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String>;
}

// OpenAI-compatible request/response shapes for OpenRouter
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

/// [`TextGenerator`] backed by the OpenRouter chat-completions API
pub struct OpenRouterGenerator {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenRouterGenerator {
    /// Create a generator with an explicit API key
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.into().trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: OPENROUTER_API_BASE.to_string(),
            client,
        }
    }

    /// Create a generator from `OPENROUTER_API_KEY`; `None` if unset or empty
    pub fn from_env() -> Option<Self> {
        let key = std::env::var("OPENROUTER_API_KEY").ok()?;
        if key.trim().is_empty() {
            return None;
        }
        Some(Self::new(key))
    }

    /// Set the model (e.g. `google/gemini-2.0-flash-001`, `anthropic/claude-3.5-sonnet`)
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL (proxies, local gateways, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for OpenRouterGenerator {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature,
            max_tokens: None,
        };

        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Generation(format!("request failed: {e}")))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(AgentError::Generation(format!(
                "API error {status}: {body}"
            )));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| AgentError::Generation(format!("response parse failed: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AgentError::Generation("empty choices in response".to_string()))
    }
}

/// Extract the first balanced `{...}` region from `text`
///
/// String literals and escapes inside the object are respected, so braces in
/// quoted values do not unbalance the scan. Returns `None` when no complete
/// object is present.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Best-effort structured decode of a model reply
///
/// Finds the first balanced JSON object in `text` and deserializes it.
/// `None` means the caller should use its typed fallback.
pub fn decode_json<T: DeserializeOwned>(text: &str) -> Option<T> {
    let region = extract_json_object(text)?;
    serde_json::from_str(region).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize, PartialEq, Debug)]
    struct Probe {
        ok: bool,
        note: String,
    }

    #[test]
    fn extracts_object_surrounded_by_prose() {
        let text = "Sure! Here is the result:\n{\"ok\": true, \"note\": \"done\"}\nLet me know.";
        let probe: Probe = decode_json(text).unwrap();
        assert!(probe.ok);
        assert_eq!(probe.note, "done");
    }

    #[test]
    fn handles_braces_inside_strings() {
        let text = r#"{"ok": false, "note": "a { brace } inside"}"#;
        let probe: Probe = decode_json(text).unwrap();
        assert_eq!(probe.note, "a { brace } inside");
    }

    #[test]
    fn handles_nested_objects() {
        let text = r#"leading {"outer": {"inner": 1}, "ok": true, "note": "n"} trailing"#;
        assert_eq!(
            extract_json_object(text).unwrap(),
            r#"{"outer": {"inner": 1}, "ok": true, "note": "n"}"#
        );
    }

    #[test]
    fn returns_none_without_complete_object() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("{\"truncated\": ").is_none());
        assert!(decode_json::<Probe>("{\"ok\": \"not a bool\"}").is_none());
    }
}
