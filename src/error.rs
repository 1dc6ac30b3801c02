//! Error types for the readiness engine.

use thiserror::Error;

/// Errors that can abort an analysis or report run.
///
/// Model failures are deliberately absent: they are absorbed by the
/// synthesis gateway and surface only as degraded sections.
#[derive(Error, Debug)]
pub enum Error {
    /// Knowledge base document could not be parsed
    #[error("Knowledge base parse error: {0}")]
    KnowledgeBase(#[from] serde_json::Error),

    /// Knowledge base file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A score was outside the accepted range
    #[error("Invalid score for '{capability_id}': {field}={value} (expected 0-10)")]
    InvalidScore {
        capability_id: String,
        field: &'static str,
        value: u8,
    },

    /// A score carried an empty capability identifier
    #[error("Score at position {0} has an empty capability id")]
    MissingCapabilityId(usize),

    /// Configuration value could not be used
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for readiness operations.
pub type Result<T> = std::result::Result<T, Error>;
