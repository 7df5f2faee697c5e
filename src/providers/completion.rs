//! Completion API client (OpenAI-compatible chat completions)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::CompletionConfig;
use crate::error::{Error, Result};

/// One message in a completion request
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CompletionMessage {
    pub role: &'static str,
    pub content: String,
}

impl CompletionMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

/// Trait for chat-completion calls
///
/// Implementations:
/// - `OpenAiCompatClient`: hosted OpenAI-compatible API (Groq et al.)
/// - test fakes with scripted replies
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send the message sequence, return the first choice's text content.
    /// Fails if the call errors or returns no content.
    async fn chat(&self, messages: &[CompletionMessage], max_tokens: u32) -> Result<String>;

    /// Same call constrained to JSON output, parsed into a value.
    /// Schema validation against the parsed value is the caller's job.
    async fn chat_json(
        &self,
        messages: &[CompletionMessage],
        max_tokens: u32,
    ) -> Result<serde_json::Value>;

    /// Model identifier for logging
    fn model(&self) -> &str;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [CompletionMessage],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiCompatClient {
    /// Create a new client from configuration
    pub fn new(config: &CompletionConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn send(
        &self,
        messages: &[CompletionMessage],
        max_tokens: u32,
        json_mode: bool,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens,
            response_format: json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Completion(format!("completion request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Completion(format!(
                "completion API returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Completion(format!("failed to parse completion response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::Completion("completion returned no content".to_string()))
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    async fn chat(&self, messages: &[CompletionMessage], max_tokens: u32) -> Result<String> {
        self.send(messages, max_tokens, false).await
    }

    async fn chat_json(
        &self,
        messages: &[CompletionMessage],
        max_tokens: u32,
    ) -> Result<serde_json::Value> {
        let content = self.send(messages, max_tokens, true).await?;
        let stripped = strip_code_fences(&content);
        serde_json::from_str(stripped).map_err(|e| {
            Error::SchemaValidation(format!("completion output is not valid JSON: {}", e))
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Some models wrap JSON output in a markdown code fence even in JSON mode.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open.strip_suffix("```").unwrap_or(without_open).trim()
}
