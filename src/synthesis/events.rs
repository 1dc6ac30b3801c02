//! Synthesis events and callbacks for observability.

use super::SectionKind;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Events emitted while synthesizing report sections.
#[derive(Debug, Clone)]
pub enum SynthesisEvent {
    /// A report task was handed to a worker
    TaskStart { key: String, kind: SectionKind },
    /// About to call the model
    ModelRequest { kind: SectionKind, prompt_chars: usize },
    /// The model responded
    ModelResponse { kind: SectionKind, content: String },
    /// The model rejected the call with a rate-limit error
    RateLimited { kind: SectionKind, backoff: Duration },
    /// A section fell back to its raw context
    Degraded { kind: SectionKind, reason: String },
    /// A report task finished, synthesized or not
    TaskFinish {
        key: String,
        kind: SectionKind,
        degraded: bool,
    },
}

/// Type alias for event callbacks
pub type EventCallback = Arc<dyn Fn(&SynthesisEvent) + Send + Sync>;

/// Storage for synthesis callbacks
#[derive(Default, Clone)]
pub struct SynthesisCallbacks {
    pub on_task_start: Option<EventCallback>,
    pub on_model_request: Option<EventCallback>,
    pub on_model_response: Option<EventCallback>,
    pub on_rate_limited: Option<EventCallback>,
    pub on_degraded: Option<EventCallback>,
    pub on_task_finish: Option<EventCallback>,
    /// Catch-all callback for any event
    pub on_event: Option<EventCallback>,
    pub(crate) captured_events: Option<Arc<Mutex<Vec<SynthesisEvent>>>>,
}

impl SynthesisCallbacks {
    /// Emit an event to the appropriate callback(s)
    pub fn emit(&self, event: &SynthesisEvent) {
        if let Some(ref events) = self.captured_events
            && let Ok(mut events) = events.lock()
        {
            events.push(event.clone());
        }

        let specific = match event {
            SynthesisEvent::TaskStart { .. } => &self.on_task_start,
            SynthesisEvent::ModelRequest { .. } => &self.on_model_request,
            SynthesisEvent::ModelResponse { .. } => &self.on_model_response,
            SynthesisEvent::RateLimited { .. } => &self.on_rate_limited,
            SynthesisEvent::Degraded { .. } => &self.on_degraded,
            SynthesisEvent::TaskFinish { .. } => &self.on_task_finish,
        };

        if let Some(cb) = specific {
            cb(event);
        }

        if let Some(cb) = &self.on_event {
            cb(event);
        }
    }
}

/// Create verbose logging callbacks
pub fn verbose_callbacks() -> SynthesisCallbacks {
    SynthesisCallbacks {
        on_task_start: Some(Arc::new(|e| {
            if let SynthesisEvent::TaskStart { key, kind } = e {
                eprintln!("[readiness] Task {} ({})", key, kind);
            }
        })),
        on_model_response: Some(Arc::new(|e| {
            if let SynthesisEvent::ModelResponse { kind, content } = e {
                let preview: String = content.chars().take(100).collect();
                let suffix = if content.chars().count() > 100 { "..." } else { "" };
                eprintln!(
                    "[readiness] {}: {}{}",
                    kind,
                    preview.replace('\n', "\\n"),
                    suffix
                );
            }
        })),
        on_rate_limited: Some(Arc::new(|e| {
            if let SynthesisEvent::RateLimited { kind, backoff } = e {
                eprintln!("[readiness] {} rate limited, retrying in {:?}", kind, backoff);
            }
        })),
        on_degraded: Some(Arc::new(|e| {
            if let SynthesisEvent::Degraded { kind, reason } = e {
                eprintln!("[readiness] ✗ {} degraded: {}", kind, reason);
            }
        })),
        on_task_finish: Some(Arc::new(|e| {
            if let SynthesisEvent::TaskFinish { key, degraded, .. } = e {
                let status = if *degraded { "✗" } else { "✓" };
                eprintln!("[readiness] {} {}", status, key);
            }
        })),
        ..Default::default()
    }
}
