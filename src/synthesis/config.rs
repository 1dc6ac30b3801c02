//! Synthesis gateway configuration.

use crate::error::{Error, Result};
use std::time::Duration;

/// Default model used for synthesis.
pub const DEFAULT_MODEL: &str = "claude-opus-4-20250514";

/// Default Messages API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Configuration for the synthesis gateway.
#[derive(Clone)]
pub struct SynthesisConfig {
    /// The model to use (e.g., "claude-opus-4-20250514")
    pub model: String,
    /// Maximum tokens for the model response
    pub max_tokens: Option<u32>,
    /// Temperature for sampling (model default when unset)
    pub temperature: Option<f32>,
    /// Minimum spacing between outbound model calls
    pub min_interval: Duration,
    /// Wait before the single retry after a rate-limit response
    pub rate_limit_backoff: Duration,
    /// Deadline for one outbound model call
    pub request_timeout: Duration,
    /// API key for the hosted model
    pub api_key: Option<String>,
    /// Base URL of the Messages API
    pub base_url: String,
}

impl std::fmt::Debug for SynthesisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisConfig")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("min_interval", &self.min_interval)
            .field("rate_limit_backoff", &self.rate_limit_backoff)
            .field("request_timeout", &self.request_timeout)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: Some(2000),
            temperature: None,
            min_interval: Duration::from_millis(500),
            rate_limit_backoff: Duration::from_secs(2),
            request_timeout: Duration::from_secs(120),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl SynthesisConfig {
    /// Create a new config with the specified model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Build a config from `ANTHROPIC_API_KEY`, `CLAUDE_MODEL` and
    /// `CLAUDE_MAX_TOKENS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(model) = lookup("CLAUDE_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }
        if let Some(raw) = lookup("CLAUDE_MAX_TOKENS") {
            let tokens = raw.trim().parse::<u32>().map_err(|_| {
                Error::Config(format!("CLAUDE_MAX_TOKENS must be a positive integer, got '{raw}'"))
            })?;
            config.max_tokens = Some(tokens);
        }
        config.api_key = lookup("ANTHROPIC_API_KEY").filter(|k| !k.trim().is_empty());

        Ok(config)
    }

    /// Set the max tokens.
    pub fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Remove the max tokens limit (let the model use its default).
    pub fn no_max_tokens(mut self) -> Self {
        self.max_tokens = None;
        self
    }

    /// Set the temperature.
    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Set the minimum spacing between model calls.
    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Set the backoff before retrying a rate-limited call.
    pub fn rate_limit_backoff(mut self, backoff: Duration) -> Self {
        self.rate_limit_backoff = backoff;
        self
    }

    /// Set the deadline for a single model call.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}
