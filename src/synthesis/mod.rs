//! Section synthesis gateway.
//!
//! Wraps a [`TextModel`] with the shared system prompt, per-section
//! instructions, the agent allow-list, a process-wide minimum call interval
//! and a single retry after a rate-limit response. A call never fails: when
//! the model cannot produce text the caller gets its own context back as a
//! degraded section.

mod config;
mod events;
mod limiter;
mod model;
mod prompt;

pub use config::{DEFAULT_BASE_URL, DEFAULT_MODEL, SynthesisConfig};
pub use events::{EventCallback, SynthesisCallbacks, SynthesisEvent, verbose_callbacks};
pub use limiter::RateLimiter;
pub use model::{AnthropicModel, ModelError, ModelRequest, TextModel};
pub use prompt::{DEFAULT_ALLOWED_AGENTS, SYSTEM_PROMPT, default_allowed_agents, user_prompt};

use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// The three kinds of synthesized report sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    ExecutiveSummary,
    UrgentGap,
    Strength,
}

impl SectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SectionKind::ExecutiveSummary => "executive_summary",
            SectionKind::UrgentGap => "urgent_gap",
            SectionKind::Strength => "strength",
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a section fell back to its raw context.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DegradeReason {
    #[error("rate limited after retry")]
    RateLimited,

    #[error("model error: {0}")]
    Model(ModelError),

    #[error("task exceeded its {0:?} deadline")]
    Deadline(Duration),

    #[error("task failed: {0}")]
    TaskFailed(String),
}

/// Outcome of synthesizing one section.
#[derive(Debug, Clone, PartialEq)]
pub enum Synthesis {
    Synthesized(String),
    Degraded { text: String, reason: DegradeReason },
}

impl Synthesis {
    /// Fallback outcome carrying the unsynthesized context.
    pub fn degraded(context: impl Into<String>, reason: DegradeReason) -> Self {
        Synthesis::Degraded {
            text: context.into(),
            reason,
        }
    }

    /// The text that goes into the report.
    pub fn text(&self) -> &str {
        match self {
            Synthesis::Synthesized(text) => text,
            Synthesis::Degraded { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Synthesis::Synthesized(text) => text,
            Synthesis::Degraded { text, .. } => text,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Synthesis::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&DegradeReason> {
        match self {
            Synthesis::Synthesized(_) => None,
            Synthesis::Degraded { reason, .. } => Some(reason),
        }
    }
}

/// Turns formatted context into prose through a text model.
#[derive(Clone)]
pub struct Synthesizer {
    model: Arc<dyn TextModel>,
    config: SynthesisConfig,
    callbacks: SynthesisCallbacks,
}

impl Synthesizer {
    pub fn new(model: Arc<dyn TextModel>, config: SynthesisConfig) -> Self {
        Self {
            model,
            config,
            callbacks: SynthesisCallbacks::default(),
        }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    pub fn callbacks(&self) -> &SynthesisCallbacks {
        &self.callbacks
    }

    // =========================================================================
    // Builder methods for callbacks
    // =========================================================================

    /// Enable verbose logging to stderr.
    pub fn verbose(mut self, enabled: bool) -> Self {
        if enabled {
            self.callbacks = verbose_callbacks();
        }
        self
    }

    /// Set callback for when a report task starts.
    pub fn on_task_start<F>(mut self, f: F) -> Self
    where
        F: Fn(&SynthesisEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_task_start = Some(Arc::new(f));
        self
    }

    /// Set callback for when a model request is about to be made.
    pub fn on_model_request<F>(mut self, f: F) -> Self
    where
        F: Fn(&SynthesisEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_model_request = Some(Arc::new(f));
        self
    }

    /// Set callback for when the model returns text.
    pub fn on_model_response<F>(mut self, f: F) -> Self
    where
        F: Fn(&SynthesisEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_model_response = Some(Arc::new(f));
        self
    }

    /// Set callback for rate-limit responses.
    pub fn on_rate_limited<F>(mut self, f: F) -> Self
    where
        F: Fn(&SynthesisEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_rate_limited = Some(Arc::new(f));
        self
    }

    /// Set callback for sections that fall back to raw context.
    pub fn on_degraded<F>(mut self, f: F) -> Self
    where
        F: Fn(&SynthesisEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_degraded = Some(Arc::new(f));
        self
    }

    /// Set callback for when a report task finishes.
    pub fn on_task_finish<F>(mut self, f: F) -> Self
    where
        F: Fn(&SynthesisEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_task_finish = Some(Arc::new(f));
        self
    }

    /// Set a catch-all callback for any event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&SynthesisEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_event = Some(Arc::new(f));
        self
    }

    /// Record every emitted event for later inspection.
    pub fn capture_events(mut self, enabled: bool) -> Self {
        if enabled {
            self.callbacks.captured_events = Some(Arc::new(Mutex::new(Vec::new())));
        } else {
            self.callbacks.captured_events = None;
        }
        self
    }

    /// Take captured events.
    pub fn take_events(&self) -> Vec<SynthesisEvent> {
        if let Some(ref events) = self.callbacks.captured_events
            && let Ok(mut events) = events.lock()
        {
            return std::mem::take(&mut *events);
        }
        Vec::new()
    }

    pub(crate) fn emit(&self, event: SynthesisEvent) {
        self.callbacks.emit(&event);
    }

    // =========================================================================
    // Synthesis
    // =========================================================================

    /// Build the model request for a section.
    pub fn build_request(
        &self,
        kind: SectionKind,
        context: &str,
        allowed_names: &[String],
    ) -> ModelRequest {
        ModelRequest {
            model: self.config.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            prompt: user_prompt(kind, context, allowed_names),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    /// Synthesize one section.
    ///
    /// Every outbound call, the retry included, waits on `limiter` first. A
    /// rate-limit response is retried once after the configured backoff; any
    /// other failure degrades immediately.
    pub async fn synthesize(
        &self,
        kind: SectionKind,
        context: &str,
        allowed_names: &[String],
        limiter: &RateLimiter,
    ) -> Synthesis {
        let request = self.build_request(kind, context, allowed_names);
        let mut retried = false;

        loop {
            limiter.acquire().await;

            self.emit(SynthesisEvent::ModelRequest {
                kind,
                prompt_chars: request.prompt.chars().count(),
            });

            let outcome =
                match tokio::time::timeout(self.config.request_timeout, self.model.generate(&request))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ModelError::Timeout(self.config.request_timeout)),
                };

            let error = match outcome {
                Ok(text) if !text.trim().is_empty() => {
                    self.emit(SynthesisEvent::ModelResponse {
                        kind,
                        content: text.clone(),
                    });
                    return Synthesis::Synthesized(text);
                }
                Ok(_) => ModelError::MalformedResponse("empty response".to_string()),
                Err(e) => e,
            };

            if error.is_rate_limited() && !retried {
                retried = true;
                let backoff = self.config.rate_limit_backoff;
                tracing::warn!(%kind, ?backoff, "rate limited, retrying once");
                self.emit(SynthesisEvent::RateLimited { kind, backoff });
                tokio::time::sleep(backoff).await;
                continue;
            }

            let reason = if error.is_rate_limited() {
                DegradeReason::RateLimited
            } else {
                DegradeReason::Model(error)
            };
            tracing::warn!(%kind, %reason, "synthesis failed, using raw context");
            self.emit(SynthesisEvent::Degraded {
                kind,
                reason: reason.to_string(),
            });
            return Synthesis::degraded(context, reason);
        }
    }
}

impl std::fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synthesizer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
