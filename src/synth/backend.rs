// src/synth/backend.rs
//! Narrative backends: the text-generation services synthesis can delegate to.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You are a business analyst writing concise company intelligence briefs. \
Use only the evidence provided. Answer in plain text with the labelled sections requested, no markdown tables, no emojis.";

#[async_trait]
pub trait NarrativeBackend: Send + Sync {
    /// Provider and model, for diagnostics (e.g. `openai:gpt-4o-mini`).
    fn name(&self) -> String;

    async fn generate(&self, prompt: &str, max_output_tokens: u32) -> Result<String, BackendError>;
}

/// OpenAI Chat Completions backend.
pub struct OpenAiBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_endpoint(api_key, model, OPENAI_CHAT_URL)
    }

    pub fn with_endpoint(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: &str,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::sources::http::USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: endpoint.to_string(),
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: Option<String>,
}

/// Extracts the first choice's text from a chat-completions body.
pub fn parse_chat_response(body: &str) -> Result<String, BackendError> {
    let resp: ChatResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Malformed(e.to_string()))?;
    let content = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    if content.is_empty() {
        return Err(BackendError::Empty);
    }
    Ok(content)
}

#[async_trait]
impl NarrativeBackend for OpenAiBackend {
    fn name(&self) -> String {
        format!("openai:{}", self.model)
    }

    async fn generate(&self, prompt: &str, max_output_tokens: u32) -> Result<String, BackendError> {
        let req = ChatRequest {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.3,
            max_tokens: max_output_tokens,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => BackendError::Auth(status.as_u16()),
                429 => BackendError::Quota,
                other => BackendError::Status(other),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        parse_chat_response(&body)
    }
}

/// Deterministic backend for tests/local runs (`AI_TEST_MODE=mock`).
#[derive(Debug, Clone)]
pub struct MockBackend {
    pub fixed: String,
}

impl MockBackend {
    pub fn new(fixed: impl Into<String>) -> Self {
        Self {
            fixed: fixed.into(),
        }
    }

    /// Canned answer in the labelled-section shape the synthesizer parses.
    pub fn structured() -> Self {
        Self::new(
            "Overview: Mock overview built from the collected evidence.\n\
             Key Findings:\n- Mock finding one.\n- Mock finding two.\n\
             Sentiment: Neutral (mock).\n\
             Recommendations:\n- Mock recommendation.\n\
             Pitch: Mock pitch.",
        )
    }
}

#[async_trait]
impl NarrativeBackend for MockBackend {
    fn name(&self) -> String {
        "mock".to_string()
    }

    async fn generate(&self, _prompt: &str, _max_output_tokens: u32) -> Result<String, BackendError> {
        Ok(self.fixed.clone())
    }
}
