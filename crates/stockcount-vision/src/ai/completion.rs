//! Completion-service boundary
//!
//! Extraction only needs "prompt in, text out", so the vendor sits behind
//! `CompletionService`. `ChatCompletionClient` speaks the OpenAI-compatible
//! `/chat/completions` protocol that most hosted model gateways expose.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use stockcount_types::{Error, Result};
use tracing::debug;

/// Low temperature keeps repeated runs on the same page close together.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Enough for several dozen table rows of JSON
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// One completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Text completion backend
pub trait CompletionService: Send + Sync {
    /// Return the raw text of the model's reply.
    fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct ChatCompletionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for `/chat/completions`
pub struct ChatCompletionClient {
    client: Client,
    config: ChatCompletionConfig,
}

impl ChatCompletionClient {
    pub fn new(config: ChatCompletionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                Error::CompletionService(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

impl CompletionService for ChatCompletionClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let started = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .map_err(|e| Error::CompletionService(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::CompletionService(format!(
                "{} returned {}: {}",
                self.config.model,
                status,
                stockcount_types::excerpt(&text, stockcount_types::EXCERPT_CHARS)
            )));
        }

        let data: ChatResponse = response
            .json()
            .map_err(|e| Error::CompletionService(format!("Failed to parse response: {}", e)))?;

        debug!(
            model = %self.config.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "completion received"
        );

        first_choice_content(data)
    }
}

fn first_choice_content(data: ChatResponse) -> Result<String> {
    data.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| Error::CompletionService("Response contained no choices".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = CompletionRequest::new("sys", "user");
        assert_eq!(request.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(request.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_first_choice_content() {
        let data: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "{\"a\": 1}"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_choice_content(data).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_empty_choices_is_service_error() {
        let data: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            first_choice_content(data),
            Err(Error::CompletionService(_))
        ));
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = ChatCompletionClient::new(ChatCompletionConfig {
            api_key: "k".to_string(),
            base_url: "https://example.invalid/api/v3/".to_string(),
            model: "m".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(client.endpoint(), "https://example.invalid/api/v3/chat/completions");
    }
}
