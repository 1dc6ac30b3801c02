//! Readiness - capability readiness classification and report synthesis
//!
//! Readiness turns a user's importance/readiness scores for a set of
//! capabilities into a prioritized assessment report. Scores are classified
//! on a fixed decision grid, joined with a static knowledge base, and the
//! narrative sections are synthesized concurrently by a text model that may
//! only cite facts (and agent names) it was given.
//!
//! # Quick Start
//!
//! ```ignore
//! use readiness::{
//!     AnthropicModel, CapabilityScore, KnowledgeBase, ReportGenerator, SynthesisConfig,
//!     Synthesizer,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> readiness::Result<()> {
//!     let kb = Arc::new(KnowledgeBase::from_path("knowledge_base.json")?);
//!     let config = SynthesisConfig::from_env()?;
//!     let model = Arc::new(AnthropicModel::from_config(&config)?);
//!
//!     let generator = ReportGenerator::new(Synthesizer::new(model, config).verbose(true), kb);
//!     let scores = vec![
//!         CapabilityScore::new("usage_rating", 9, 2),
//!         CapabilityScore::new("invoice_generation", 8, 3),
//!     ];
//!
//!     let report = generator.generate(&scores, "Acme Corp").await?;
//!     println!("{}", report.text);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod context;
mod error;
pub mod knowledge;
pub mod report;
pub mod scoring;
pub mod synthesis;
pub mod validate;

pub use analysis::{
    AnalyzedCapability, Analyzer, CapabilityScore, PhaseSummary, PriorityMatrix, analyze,
    by_category, filter_by_importance_threshold, phase_summary, priority_matrix,
};
pub use error::{Error, Result};
pub use knowledge::{KnowledgeBase, KnowledgeEntry};
pub use report::{
    CustomerContext, Report, ReportConfig, ReportGenerator, SectionOutcome, TaskKey,
    generate_report, quick_summary,
};
pub use scoring::{PriorityCategory, Thresholds, Timeline, categorize, gap_score};
pub use synthesis::{
    AnthropicModel, DegradeReason, ModelError, ModelRequest, RateLimiter, SectionKind, Synthesis,
    SynthesisCallbacks, SynthesisConfig, SynthesisEvent, Synthesizer, TextModel,
};
pub use validate::{BrandPolicy, sanitize_branding};
