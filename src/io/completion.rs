//! Client for an OpenAI-compatible chat-completions endpoint.
//!
//! The response body is validated against an explicit schema; anything that
//! does not fit is reported as [`CompletionError::Malformed`] or
//! [`CompletionError::Empty`] rather than trusted.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::model::config::GenerationConfig;

/// Error type for the upstream completion call
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("could not build http client: {0}")]
    Client(reqwest::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    Status(StatusCode),
    #[error("unexpected response shape: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("response contained no content")]
    Empty,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
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
    #[serde(default)]
    content: Option<String>,
}

/// A configured chat-completions client holding its credential
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl CompletionClient {
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self, CompletionError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("promptlist/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(CompletionError::Client)?;
        Ok(CompletionClient {
            http,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one system instruction plus the user prompt; return the trimmed
    /// content of the first choice.
    #[instrument(skip_all, fields(endpoint = %self.endpoint, model = %self.model))]
    pub async fn complete(&self, instruction: &str, prompt: &str) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: instruction,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::Status(status));
        }

        let text = response.text().await?;
        debug!(bytes = text.len(), "received completion");
        let parsed: ChatResponse = serde_json::from_str(&text)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(CompletionError::Empty)
    }
}
