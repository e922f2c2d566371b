//! OpenAI adapter (chat completions).
//!
//! Uses the `chat/completions` endpoint with a system + user message pair.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use payoor_core::{
    config::Config,
    errors::Error,
    model::{
        client::CompletionClient,
        types::{Completion, CompletionError, PromptPair},
    },
    Result,
};

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("reqwest client build: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            cfg.openai_api_key.clone(),
            cfg.openai_model.clone(),
            cfg.openai_base_url.clone(),
            cfg.openai_timeout,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn request(&self, prompt: &PromptPair) -> Completion {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system_role,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user_prompt,
                },
            ],
        };

        let resp = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = resp.status();
        debug!(model = %self.model, status = status.as_u16(), "openai responded");
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: error_summary(&body),
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;
        first_choice_text(&bytes)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn describe(&self) -> String {
        format!("openai:{}", self.model)
    }

    async fn complete(&self, prompt: &PromptPair) -> Completion {
        let result = self.request(prompt).await;
        if let Err(e) = &result {
            warn!(model = %self.model, error = %e, "openai completion failed");
        }
        result
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Text of the first choice. The content is not trimmed.
fn first_choice_text(body: &[u8]) -> Completion {
    let parsed: ChatResponse =
        serde_json::from_slice(body).map_err(|e| CompletionError::Decode(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|s| !s.is_empty())
        .ok_or(CompletionError::Empty)
}

/// Prefer the API's `error.message`; otherwise a truncated raw body.
fn error_summary(body: &str) -> String {
    if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(body) {
        return env.error.message;
    }
    body.chars().take(200).collect()
}
