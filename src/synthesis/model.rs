//! Text model abstraction and the hosted Messages API client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::config::SynthesisConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A single-turn completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Failures reported by a text model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("rate limited by the model provider")]
    RateLimited,

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("HTTP error {status}")]
    Http { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

impl ModelError {
    /// Map an HTTP status to the matching error.
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => ModelError::RateLimited,
            401 | 403 => ModelError::Authentication(format!("HTTP {status}")),
            _ => ModelError::Http { status },
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ModelError::RateLimited)
    }
}

/// Anything that turns a prompt into text.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> Result<String, ModelError>;
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Client for the hosted Messages API.
///
/// Calls are made with a blocking `ureq` agent on the blocking pool.
#[derive(Clone)]
pub struct AnthropicModel {
    agent: ureq::Agent,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for AnthropicModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicModel")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl AnthropicModel {
    pub fn new(api_key: impl Into<String>) -> Self {
        let config = SynthesisConfig::default();
        Self::with_options(api_key, config.base_url, config.request_timeout)
    }

    /// Build a client from a synthesis config; fails without an API key.
    pub fn from_config(config: &SynthesisConfig) -> crate::Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| crate::Error::Config("ANTHROPIC_API_KEY is not set".to_string()))?;
        Ok(Self::with_options(
            api_key,
            config.base_url.clone(),
            config.request_timeout,
        ))
    }

    fn with_options(api_key: impl Into<String>, base_url: String, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn call(&self, request: &ModelRequest) -> Result<String, ModelError> {
        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens.unwrap_or(4096),
            system: &request.system,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
        };

        let response = self
            .agent
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .send_json(&body);

        match response {
            Ok(mut resp) => {
                let data = resp
                    .body_mut()
                    .read_json::<MessagesResponse>()
                    .map_err(|e| ModelError::MalformedResponse(e.to_string()))?;
                extract_text(data)
            }
            Err(ureq::Error::StatusCode(code)) => Err(ModelError::from_status(code)),
            Err(ureq::Error::Timeout(_)) => Err(ModelError::Timeout(self.timeout)),
            Err(e) => Err(ModelError::Transport(e.to_string())),
        }
    }
}

fn extract_text(response: MessagesResponse) -> Result<String, ModelError> {
    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();

    if text.trim().is_empty() {
        return Err(ModelError::MalformedResponse(
            "response contained no text".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl TextModel for AnthropicModel {
    async fn generate(&self, request: &ModelRequest) -> Result<String, ModelError> {
        let client = self.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || client.call(&request))
            .await
            .map_err(|e| ModelError::Other(format!("model worker failed: {e}")))?
    }
}
