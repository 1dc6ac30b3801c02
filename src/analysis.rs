//! Capability analysis: joins raw scores with the knowledge base.

use crate::error::{Error, Result};
use crate::knowledge::{AgentMapping, CurrentCapabilities, KnowledgeBase, UpcomingCapabilities};
use crate::scoring::{PriorityCategory, Thresholds, Timeline};
use serde::{Deserialize, Serialize};

/// Placeholder used when a capability id is not in the knowledge base.
pub const UNKNOWN: &str = "Unknown";

const UNKNOWN_COLOR: &str = "#000000";

/// Mean importance assumed for an empty batch.
const EMPTY_BATCH_MEAN: f64 = 5.0;

/// Share of the batch mean an importance must reach to be kept.
const IMPORTANCE_FLOOR_RATIO: f64 = 0.75;

/// A user's scores for one capability. `0` means "not scored".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityScore {
    pub capability_id: String,
    #[serde(default)]
    pub importance: u8,
    #[serde(default)]
    pub readiness: u8,
    #[serde(default)]
    pub phase_id: String,
}

impl CapabilityScore {
    pub fn new(capability_id: impl Into<String>, importance: u8, readiness: u8) -> Self {
        Self {
            capability_id: capability_id.into(),
            importance,
            readiness,
            phase_id: String::new(),
        }
    }

    /// Set the phase identifier.
    pub fn phase(mut self, phase_id: impl Into<String>) -> Self {
        self.phase_id = phase_id.into();
        self
    }

    fn validate(&self, position: usize) -> Result<()> {
        if self.capability_id.trim().is_empty() {
            return Err(Error::MissingCapabilityId(position));
        }
        for (field, value) in [("importance", self.importance), ("readiness", self.readiness)] {
            if value > 10 {
                return Err(Error::InvalidScore {
                    capability_id: self.capability_id.clone(),
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// A scored capability enriched with its classification and reference data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedCapability {
    pub capability_id: String,
    pub name: String,
    pub phase_id: String,
    pub phase_name: String,
    pub phase_color: String,
    pub importance: u8,
    pub readiness: u8,
    pub category: PriorityCategory,
    pub gap_score: u8,
    pub timeline: Timeline,
    pub why_it_matters: Option<String>,
    pub how_it_works_today: Option<String>,
    pub current: CurrentCapabilities,
    pub upcoming: UpcomingCapabilities,
    pub agents: AgentMapping,
    pub row: u32,
    pub col: u32,
    /// Whether the capability was found in the knowledge base
    pub known: bool,
}

/// Classifies scores against a knowledge base.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    thresholds: Thresholds,
}

impl Analyzer {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Analyze a batch of scores.
    ///
    /// The result is sorted by gap score, highest first. The sort is stable,
    /// so equal gap scores keep their input order. Unknown capability ids get
    /// placeholder display fields; only out-of-range scores or empty ids fail.
    pub fn analyze(
        &self,
        scores: &[CapabilityScore],
        kb: &KnowledgeBase,
    ) -> Result<Vec<AnalyzedCapability>> {
        let mut analyzed = Vec::with_capacity(scores.len());

        for (position, score) in scores.iter().enumerate() {
            score.validate(position)?;
            analyzed.push(self.analyze_one(score, kb));
        }

        analyzed.sort_by(|a, b| b.gap_score.cmp(&a.gap_score));
        Ok(analyzed)
    }

    fn analyze_one(&self, score: &CapabilityScore, kb: &KnowledgeBase) -> AnalyzedCapability {
        let (category, gap_score) = self.thresholds.categorize(score.importance, score.readiness);
        let timeline = category.timeline();

        match kb.get(&score.capability_id) {
            Some(entry) => AnalyzedCapability {
                capability_id: score.capability_id.clone(),
                name: entry.name.clone(),
                phase_id: entry.phase.id.clone(),
                phase_name: entry.phase.name.clone(),
                phase_color: entry.phase.color.clone(),
                importance: score.importance,
                readiness: score.readiness,
                category,
                gap_score,
                timeline,
                why_it_matters: entry.why_it_matters.clone(),
                how_it_works_today: entry.how_it_works_today.clone(),
                current: entry.current.clone(),
                upcoming: entry.upcoming.clone(),
                agents: entry.agents.clone(),
                row: entry.row,
                col: entry.col,
                known: true,
            },
            None => {
                tracing::warn!(
                    "Capability '{}' not found in knowledge base",
                    score.capability_id
                );
                AnalyzedCapability {
                    capability_id: score.capability_id.clone(),
                    name: UNKNOWN.to_string(),
                    phase_id: score.phase_id.clone(),
                    phase_name: UNKNOWN.to_string(),
                    phase_color: UNKNOWN_COLOR.to_string(),
                    importance: score.importance,
                    readiness: score.readiness,
                    category,
                    gap_score,
                    timeline,
                    why_it_matters: None,
                    how_it_works_today: None,
                    current: CurrentCapabilities::default(),
                    upcoming: UpcomingCapabilities::default(),
                    agents: AgentMapping::default(),
                    row: 0,
                    col: 0,
                    known: false,
                }
            }
        }
    }
}

/// Analyze with the default thresholds.
pub fn analyze(scores: &[CapabilityScore], kb: &KnowledgeBase) -> Result<Vec<AnalyzedCapability>> {
    Analyzer::default().analyze(scores, kb)
}

/// Mean importance of a batch (`0.0` for an empty batch).
pub fn mean_importance(analyzed: &[AnalyzedCapability]) -> f64 {
    mean(analyzed.iter().map(|c| c.importance)).unwrap_or(0.0)
}

/// Mean readiness of a batch (`0.0` for an empty batch).
pub fn mean_readiness(analyzed: &[AnalyzedCapability]) -> f64 {
    mean(analyzed.iter().map(|c| c.readiness)).unwrap_or(0.0)
}

fn mean(values: impl Iterator<Item = u8>) -> Option<f64> {
    let (sum, count) = values.fold((0u32, 0u32), |(s, n), v| (s + u32::from(v), n + 1));
    (count > 0).then(|| f64::from(sum) / f64::from(count))
}

/// Importance floor for a batch: 75% of its mean importance.
pub fn importance_threshold(analyzed: &[AnalyzedCapability]) -> f64 {
    let mean = mean(analyzed.iter().map(|c| c.importance)).unwrap_or(EMPTY_BATCH_MEAN);
    mean * IMPORTANCE_FLOOR_RATIO
}

/// Drop capabilities whose importance is more than 25% below the batch mean.
///
/// The floor is recomputed from each batch, so the same scores always
/// produce the same result. Order is preserved.
pub fn filter_by_importance_threshold(analyzed: Vec<AnalyzedCapability>) -> Vec<AnalyzedCapability> {
    let threshold = importance_threshold(&analyzed);
    let before = analyzed.len();

    let kept: Vec<AnalyzedCapability> = analyzed
        .into_iter()
        .filter(|c| f64::from(c.importance) >= threshold)
        .collect();

    let removed = before - kept.len();
    if removed > 0 {
        tracing::info!(
            "Filtered {} capabilities below importance threshold ({:.1})",
            removed,
            threshold
        );
    }
    kept
}

/// Capabilities in one category, in their current order.
pub fn by_category(
    analyzed: &[AnalyzedCapability],
    category: PriorityCategory,
) -> Vec<&AnalyzedCapability> {
    analyzed.iter().filter(|c| c.category == category).collect()
}

/// Count of capabilities per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityMatrix {
    counts: [usize; 6],
}

impl PriorityMatrix {
    pub fn get(&self, category: PriorityCategory) -> usize {
        self.counts[Self::slot(category)]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Counts in display order.
    pub fn iter(&self) -> impl Iterator<Item = (PriorityCategory, usize)> + '_ {
        PriorityCategory::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    // Variants are declared in display order.
    fn slot(category: PriorityCategory) -> usize {
        category as usize
    }
}

/// Count capabilities per category.
pub fn priority_matrix(analyzed: &[AnalyzedCapability]) -> PriorityMatrix {
    let mut matrix = PriorityMatrix::default();
    for cap in analyzed {
        matrix.counts[PriorityMatrix::slot(cap.category)] += 1;
    }
    matrix
}

/// Aggregates for one phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseSummary {
    pub phase_id: String,
    pub phase_name: String,
    pub capability_count: usize,
    pub avg_importance: f64,
    pub avg_readiness: f64,
    pub avg_gap_score: u8,
    pub urgent_count: usize,
    pub strength_count: usize,
}

/// Summarize capabilities per phase, phases in first-seen order.
pub fn phase_summary(analyzed: &[AnalyzedCapability]) -> Vec<PhaseSummary> {
    let mut phases: Vec<(&str, Vec<&AnalyzedCapability>)> = Vec::new();
    for cap in analyzed {
        match phases.iter_mut().find(|(id, _)| *id == cap.phase_id) {
            Some((_, caps)) => caps.push(cap),
            None => phases.push((cap.phase_id.as_str(), vec![cap])),
        }
    }

    phases
        .into_iter()
        .map(|(phase_id, caps)| {
            let n = caps.len() as f64;
            let gap_sum: u32 = caps.iter().map(|c| u32::from(c.gap_score)).sum();
            PhaseSummary {
                phase_id: phase_id.to_string(),
                phase_name: caps[0].phase_name.clone(),
                capability_count: caps.len(),
                avg_importance: caps.iter().map(|c| f64::from(c.importance)).sum::<f64>() / n,
                avg_readiness: caps.iter().map(|c| f64::from(c.readiness)).sum::<f64>() / n,
                avg_gap_score: (f64::from(gap_sum) / n).round_ties_even() as u8,
                urgent_count: caps
                    .iter()
                    .filter(|c| c.category == PriorityCategory::UrgentGap)
                    .count(),
                strength_count: caps
                    .iter()
                    .filter(|c| c.category == PriorityCategory::Strength)
                    .count(),
            }
        })
        .collect()
}
