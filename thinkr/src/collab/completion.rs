//! OpenAI-compatible chat completions client (Groq by default).

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::Completion;
use crate::error::CompletionError;
use crate::models::Message;

/// Endpoint settings for [`ChatCompletionClient`].
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Full URL of the chat completions endpoint.
    pub url: String,
    /// Bearer token.
    pub api_key: String,
    /// Model name sent with every request.
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

/// Request body for `POST /chat/completions`.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

/// Calls a hosted chat completions endpoint.
pub struct ChatCompletionClient {
    http: reqwest::Client,
    options: CompletionOptions,
}

impl ChatCompletionClient {
    pub fn new(options: CompletionOptions) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()?;
        Ok(Self { http, options })
    }

    pub fn model(&self) -> &str {
        &self.options.model
    }
}

#[async_trait]
impl Completion for ChatCompletionClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError> {
        let body = ChatCompletionRequest {
            model: &self.options.model,
            messages,
            temperature: self.options.temperature,
        };

        tracing::debug!(
            model = %self.options.model,
            messages = messages.len(),
            "sending completion request"
        );

        let resp = self
            .http
            .post(&self.options.url)
            .bearer_auth(&self.options.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "completion endpoint rejected request");
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = resp.json().await?;
        extract_reply(&value)
    }
}

/// Pull `choices[0].message.content` out of a completion response.
fn extract_reply(value: &Value) -> Result<String, CompletionError> {
    let choice = value
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| CompletionError::MalformedResponse("missing choices".to_string()))?;

    choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CompletionError::MalformedResponse("missing message content".to_string()))
}
