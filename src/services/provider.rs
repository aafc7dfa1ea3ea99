use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::model::settings::TranslatorSettings;

/// A failed provider round trip. Every variant is worth another attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("{0}")]
    Http(String),

    /// The call succeeded but the content is not the expected JSON object.
    #[error("invalid response: {0}")]
    Format(String),
}

/// One batch as sent to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub sources: Vec<String>,
    pub instruction: String,
}

impl BatchRequest {
    /// `{"<source>": "", ...}` in batch order, the shape the provider is
    /// asked to fill in.
    pub fn user_payload(&self) -> String {
        let placeholders: Map<String, Value> = self
            .sources
            .iter()
            .map(|s| (s.clone(), Value::String(String::new())))
            .collect();
        Value::Object(placeholders).to_string()
    }
}

pub trait TranslationProvider {
    /// Returns the raw message content of the provider's reply.
    fn translate_batch(&self, request: &BatchRequest) -> Result<String, ProviderError>;
}

/// OpenAI-compatible `/v1/chat/completions` endpoint, local or hosted.
pub struct ChatCompletionsProvider {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionsProvider {
    pub fn new(settings: &TranslatorSettings) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }
}

impl TranslationProvider for ChatCompletionsProvider {
    fn translate_batch(&self, request: &BatchRequest) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.instruction },
                { "role": "user", "content": request.user_payload() }
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "response_format": { "type": "json_object" }
        });

        let mut call = self.client.post(&self.endpoint).json(&body);
        if !self.api_key.trim().is_empty() {
            call = call.bearer_auth(self.api_key.trim());
        }

        let resp = call
            .send()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let status = resp.status();

        // Read as text first so an error body is not lost when it is not JSON.
        let text = resp
            .text()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ProviderError::Http(extract_error_message(status, &text)));
        }

        let v: Value = serde_json::from_str(&text)
            .map_err(|_| ProviderError::Format("response body is not JSON".into()))?;

        let content = v
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                ProviderError::Format("missing choices[0].message.content".into())
            })?;

        debug!(sources = request.sources.len(), bytes = content.len(), "provider replied");
        Ok(content.to_string())
    }
}

fn extract_error_message(status: StatusCode, body_text: &str) -> String {
    // { "error": { "message": "..." } } or { "message": "..." }
    if let Ok(v) = serde_json::from_str::<Value>(body_text) {
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
        if let Some(msg) = v.get("message").and_then(|m| m.as_str()) {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
    }

    let trimmed = body_text.trim();
    let snippet: String = if trimmed.chars().count() > 400 {
        format!("{}...", trimmed.chars().take(400).collect::<String>())
    } else {
        trimmed.to_string()
    };

    format!("HTTP {}: {}", status.as_u16(), snippet)
}

/// Parses reply content into the source → translation object, tolerating a
/// surrounding code fence or chatter around the braces.
pub fn parse_reply(content: &str) -> Result<Map<String, Value>, ProviderError> {
    let mut body = content.trim();

    if let Some(rest) = body.strip_prefix("```") {
        body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
        body = body.trim_end().strip_suffix("```").unwrap_or(body).trim();
    }

    if !body.starts_with('{') {
        if let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) {
            if start < end {
                body = &body[start..=end];
            }
        }
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ProviderError::Format("reply is not a JSON object".into())),
        Err(e) => Err(ProviderError::Format(e.to_string())),
    }
}
