use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;

const SUMMARY_PROMPT: &str = "Please provide a concise summary of the following document:\n\n";

/// Why no AI summary could be produced. Never fatal to an upload.
#[derive(Debug, Error)]
pub enum AiUnavailable {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("request to completion API failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion API error ({status}): {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to parse completion response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("completion response contained no summary")]
    EmptyCompletion,
}

/// Outcome of one summarization attempt
#[derive(Debug)]
pub enum AiResult {
    Success(String),
    Unavailable(AiUnavailable),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Client for an OpenAI-style chat-completion endpoint
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    api_key: Option<String>,
    url: String,
    pub model: String,
    max_tokens: u32,
    temperature: f32,
    max_prompt_chars: usize,
}

impl ChatClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: config.api_key(),
            url: config.ai_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            max_prompt_chars: config.max_prompt_chars,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Ask the completion API for a summary of `text`.
    ///
    /// Without an API key this returns `Unavailable(MissingApiKey)` without
    /// touching the network. One attempt, bounded by the client timeout.
    pub async fn summarize(&self, text: &str) -> AiResult {
        let Some(api_key) = self.api_key.as_deref() else {
            return AiResult::Unavailable(AiUnavailable::MissingApiKey);
        };

        match self.request_summary(api_key, text).await {
            Ok(summary) => AiResult::Success(summary),
            Err(e) => AiResult::Unavailable(e),
        }
    }

    async fn request_summary(&self, api_key: &str, text: &str) -> Result<String, AiUnavailable> {
        let excerpt = truncate_chars(text, self.max_prompt_chars);
        if excerpt.len() < text.len() {
            debug!(
                sent = excerpt.len(),
                total = text.len(),
                "Truncated document text for completion request"
            );
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user".to_string(),
                content: format!("{}{}", SUMMARY_PROMPT, excerpt),
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        info!(model = %self.model, "Requesting summary from completion API");
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AiUnavailable::Status { status, body });
        }

        let chat_response: ChatResponse = serde_json::from_str(&body)?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(AiUnavailable::EmptyCompletion)
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
