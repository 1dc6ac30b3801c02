//! Concurrent report generation.
//!
//! Synthesis tasks (executive summary, urgent gaps, optionally strengths) run
//! on a bounded worker pool. Results are keyed by task, never by arrival
//! order, and the report is assembled in a fixed order once every task has
//! resolved.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};

use crate::analysis::{
    AnalyzedCapability, Analyzer, CapabilityScore, PhaseSummary, PriorityMatrix, by_category,
    filter_by_importance_threshold, phase_summary, priority_matrix,
};
use crate::context::{
    ExecutiveFacts, format_executive_context, format_gap_context, format_strength_context,
};
use crate::error::Result;
use crate::knowledge::KnowledgeBase;
use crate::scoring::{PriorityCategory, Thresholds};
use crate::synthesis::{
    DegradeReason, RateLimiter, SectionKind, Synthesis, SynthesisEvent, Synthesizer,
    default_allowed_agents,
};
use crate::validate::{BrandPolicy, fix_bullet_sections, scan_constraints, warnings_section};

/// Default report title.
pub const DEFAULT_TITLE: &str = "O2C AI & MCP Readiness Assessment";

const MCP_GUIDE: &str = include_str!("guides/mcp_setup.md");
const AGENT_GUIDE: &str = include_str!("guides/first_agent.md");

const MISSING_SUMMARY: &str = "Unable to generate summary.";
const NO_URGENT_GAPS: &str = "*No urgent gaps identified.*";
const NO_STRENGTHS: &str = "*No strengths identified.*";

/// Report generation settings.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub title: String,
    /// Size of the synthesis worker pool
    pub max_workers: usize,
    /// Urgent gaps synthesized, taken from the top of the gap ranking
    pub max_urgent_sections: usize,
    /// Agent names the model may reference
    pub allowed_agents: Vec<String>,
    pub include_strengths: bool,
    pub include_phase_summary: bool,
    /// Brand sanitization applied to the final text (none when unset)
    pub brand_policy: Option<BrandPolicy>,
    /// Deadline for one synthesis task once it holds a worker
    pub task_timeout: Duration,
    pub thresholds: Thresholds,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            max_workers: 3,
            max_urgent_sections: 10,
            allowed_agents: default_allowed_agents(),
            include_strengths: false,
            include_phase_summary: true,
            brand_policy: Some(BrandPolicy::default()),
            task_timeout: Duration::from_secs(120),
            thresholds: Thresholds::default(),
        }
    }
}

impl ReportConfig {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.max_workers = n;
        self
    }

    pub fn max_urgent_sections(mut self, n: usize) -> Self {
        self.max_urgent_sections = n;
        self
    }

    pub fn allowed_agents<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_agents = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn include_strengths(mut self, enabled: bool) -> Self {
        self.include_strengths = enabled;
        self
    }

    pub fn include_phase_summary(mut self, enabled: bool) -> Self {
        self.include_phase_summary = enabled;
        self
    }

    pub fn brand_policy(mut self, policy: BrandPolicy) -> Self {
        self.brand_policy = Some(policy);
        self
    }

    /// Keep brand mentions untouched.
    pub fn no_brand_policy(mut self) -> Self {
        self.brand_policy = None;
        self
    }

    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

/// Who the report was prepared for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerContext {
    pub prepared_for: Option<String>,
    pub email: Option<String>,
}

impl CustomerContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepared_for(mut self, name: impl Into<String>) -> Self {
        self.prepared_for = Some(name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    fn render(&self) -> String {
        let mut out = String::new();
        if let Some(name) = self.prepared_for.as_deref().filter(|s| !s.is_empty()) {
            out.push_str(&format!("**Prepared for:** {name}\n\n"));
        }
        if let Some(email) = self.email.as_deref().filter(|s| !s.is_empty()) {
            out.push_str(&format!("**Email:** {email}\n\n"));
        }
        out
    }
}

/// Identity of one synthesis task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "capability_id", rename_all = "snake_case")]
pub enum TaskKey {
    ExecutiveSummary,
    Gap(String),
    Strength(String),
}

impl TaskKey {
    pub fn section_kind(&self) -> SectionKind {
        match self {
            TaskKey::ExecutiveSummary => SectionKind::ExecutiveSummary,
            TaskKey::Gap(_) => SectionKind::UrgentGap,
            TaskKey::Strength(_) => SectionKind::Strength,
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKey::ExecutiveSummary => f.write_str("executive_summary"),
            TaskKey::Gap(id) => write!(f, "gap:{id}"),
            TaskKey::Strength(id) => write!(f, "strength:{id}"),
        }
    }
}

/// A task ready to hand to a worker.
#[derive(Debug, Clone)]
pub struct SynthesisTask {
    pub key: TaskKey,
    pub context: String,
}

/// Outcome of one section, in report order.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionOutcome {
    pub key: TaskKey,
    pub outcome: Synthesis,
}

/// A generated report.
#[derive(Debug, Clone)]
pub struct Report {
    pub subject: String,
    /// Final markdown, post-processed
    pub text: String,
    /// Per-section outcomes in assembly order
    pub sections: Vec<SectionOutcome>,
    /// Advisory findings from the constraint scan
    pub warnings: Vec<String>,
    pub generated_at: DateTime<Local>,
    pub priority_matrix: PriorityMatrix,
    /// The capabilities the report was built from, after filtering
    pub capabilities: Vec<AnalyzedCapability>,
}

impl Report {
    pub fn degraded_sections(&self) -> impl Iterator<Item = &SectionOutcome> {
        self.sections.iter().filter(|s| s.outcome.is_degraded())
    }

    pub fn is_fully_synthesized(&self) -> bool {
        self.degraded_sections().next().is_none()
    }

    pub fn section(&self, key: &TaskKey) -> Option<&Synthesis> {
        self.sections
            .iter()
            .find(|s| &s.key == key)
            .map(|s| &s.outcome)
    }
}

/// Builds readiness reports from scores.
pub struct ReportGenerator {
    synthesizer: Arc<Synthesizer>,
    kb: Arc<KnowledgeBase>,
    config: ReportConfig,
    limiter: Arc<RateLimiter>,
}

impl ReportGenerator {
    pub fn new(synthesizer: Synthesizer, kb: Arc<KnowledgeBase>) -> Self {
        let limiter = Arc::new(RateLimiter::new(synthesizer.config().min_interval));
        Self {
            synthesizer: Arc::new(synthesizer),
            kb,
            config: ReportConfig::default(),
            limiter,
        }
    }

    pub fn with_config(mut self, config: ReportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }

    /// Generate a report for `subject`.
    pub async fn generate(&self, scores: &[CapabilityScore], subject: &str) -> Result<Report> {
        self.generate_for(scores, subject, None).await
    }

    /// Generate a report, recording who it was prepared for.
    ///
    /// Only malformed scores fail; model errors, panics and deadlines in
    /// individual tasks degrade that section alone.
    pub async fn generate_for(
        &self,
        scores: &[CapabilityScore],
        subject: &str,
        customer: Option<&CustomerContext>,
    ) -> Result<Report> {
        let analyzed = Analyzer::new(self.config.thresholds).analyze(scores, &self.kb)?;
        let analyzed = filter_by_importance_threshold(analyzed);

        let plan = self.plan(&analyzed, subject);
        tracing::info!(
            subject,
            capabilities = analyzed.len(),
            tasks = plan.tasks.len(),
            "generating report"
        );

        let Plan {
            tasks,
            gaps,
            strengths,
        } = plan;
        let mut results = self.run_tasks(tasks).await;
        let generated_at = Local::now();
        let matrix = priority_matrix(&analyzed);

        let mut sections = Vec::new();
        let draft = {
            let mut take = |key: TaskKey| -> Option<Synthesis> {
                let outcome = results.remove(&key)?;
                sections.push(SectionOutcome {
                    key,
                    outcome: outcome.clone(),
                });
                Some(outcome)
            };

            let executive = take(TaskKey::ExecutiveSummary);
            let gaps: Vec<(&AnalyzedCapability, Synthesis)> = gaps
                .into_iter()
                .filter_map(|gap| take(TaskKey::Gap(gap.capability_id.clone())).map(|s| (gap, s)))
                .collect();
            let strengths: Vec<(&AnalyzedCapability, Synthesis)> = strengths
                .into_iter()
                .filter_map(|cap| {
                    take(TaskKey::Strength(cap.capability_id.clone())).map(|s| (cap, s))
                })
                .collect();

            self.assemble(Assembly {
                subject,
                customer,
                generated_at: &generated_at,
                executive: executive.as_ref().map(Synthesis::text),
                matrix: &matrix,
                phases: &phase_summary(&analyzed),
                gaps: &gaps,
                strengths: &strengths,
            })
        };

        let (text, warnings) = self.post_process(draft);

        Ok(Report {
            subject: subject.to_string(),
            text,
            sections,
            warnings,
            generated_at,
            priority_matrix: matrix,
            capabilities: analyzed,
        })
    }

    fn plan<'a>(&self, analyzed: &'a [AnalyzedCapability], subject: &'a str) -> Plan<'a> {
        let facts = ExecutiveFacts::from_batch(subject, analyzed);
        let mut tasks = vec![SynthesisTask {
            key: TaskKey::ExecutiveSummary,
            context: format_executive_context(&facts),
        }];

        // The cap applies before unknown capabilities are dropped.
        let gaps: Vec<&AnalyzedCapability> = facts
            .urgent
            .iter()
            .take(self.config.max_urgent_sections)
            .filter(|gap| gap.known)
            .copied()
            .collect();
        for gap in &gaps {
            tasks.push(SynthesisTask {
                key: TaskKey::Gap(gap.capability_id.clone()),
                context: format_gap_context(gap),
            });
        }

        let strengths: Vec<&AnalyzedCapability> = if self.config.include_strengths {
            by_category(analyzed, PriorityCategory::Strength)
                .into_iter()
                .filter(|cap| cap.known)
                .collect()
        } else {
            Vec::new()
        };
        for cap in &strengths {
            tasks.push(SynthesisTask {
                key: TaskKey::Strength(cap.capability_id.clone()),
                context: format_strength_context(cap),
            });
        }

        Plan {
            tasks,
            gaps,
            strengths,
        }
    }

    /// Run every task on the worker pool and collect results by key.
    ///
    /// Every submitted task yields exactly one entry.
    pub async fn run_tasks(&self, tasks: Vec<SynthesisTask>) -> HashMap<TaskKey, Synthesis> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let allowed: Arc<[String]> = self.config.allowed_agents.clone().into();
        let deadline = self.config.task_timeout;

        let mut set = JoinSet::new();
        let mut pending: HashMap<Id, SynthesisTask> = HashMap::new();

        for task in tasks {
            let synthesizer = Arc::clone(&self.synthesizer);
            let limiter = Arc::clone(&self.limiter);
            let semaphore = Arc::clone(&semaphore);
            let allowed = Arc::clone(&allowed);
            let SynthesisTask { key, context } = task.clone();

            let handle = set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    let reason = DegradeReason::TaskFailed("worker pool closed".to_string());
                    return (key, Synthesis::degraded(context, reason));
                };

                let kind = key.section_kind();
                synthesizer.emit(SynthesisEvent::TaskStart {
                    key: key.to_string(),
                    kind,
                });

                let result = tokio::time::timeout(
                    deadline,
                    synthesizer.synthesize(kind, &context, &allowed, &limiter),
                )
                .await;
                let outcome = match result {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        tracing::warn!(task = %key, ?deadline, "synthesis task timed out");
                        let reason = DegradeReason::Deadline(deadline);
                        synthesizer.emit(SynthesisEvent::Degraded {
                            kind,
                            reason: reason.to_string(),
                        });
                        Synthesis::degraded(context, reason)
                    }
                };

                synthesizer.emit(SynthesisEvent::TaskFinish {
                    key: key.to_string(),
                    kind,
                    degraded: outcome.is_degraded(),
                });
                (key, outcome)
            });
            pending.insert(handle.id(), task);
        }

        let mut results = HashMap::with_capacity(pending.len());
        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((id, (key, outcome))) => {
                    pending.remove(&id);
                    results.insert(key, outcome);
                }
                Err(err) => {
                    let Some(task) = pending.remove(&err.id()) else {
                        continue;
                    };
                    tracing::error!(task = %task.key, error = %err, "synthesis task failed");
                    let kind = task.key.section_kind();
                    let reason = DegradeReason::TaskFailed(err.to_string());
                    self.synthesizer.emit(SynthesisEvent::Degraded {
                        kind,
                        reason: reason.to_string(),
                    });
                    self.synthesizer.emit(SynthesisEvent::TaskFinish {
                        key: task.key.to_string(),
                        kind,
                        degraded: true,
                    });
                    results.insert(task.key, Synthesis::degraded(task.context, reason));
                }
            }
        }

        results
    }

    fn assemble(&self, parts: Assembly<'_>) -> String {
        let mut report = format!(
            "# {}\n## {}\n*Generated: {}*\n\n",
            self.config.title,
            parts.subject,
            parts.generated_at.format("%Y-%m-%d %H:%M")
        );
        if let Some(customer) = parts.customer {
            report.push_str(&customer.render());
        }

        let mut number = 0;
        let mut section = |report: &mut String, heading: &str, body: &str| {
            number += 1;
            report.push_str(&format!("---\n\n## {number}. {heading}\n\n{body}\n\n"));
        };

        section(
            &mut report,
            "Executive Summary",
            parts.executive.unwrap_or(MISSING_SUMMARY),
        );

        let mut matrix = priority_matrix_table(parts.matrix, &self.config.thresholds);
        if self.config.include_phase_summary && !parts.phases.is_empty() {
            matrix.push_str("\n### Phase-Level Summary\n\n");
            matrix.push_str(&phase_summary_table(parts.phases));
        }
        section(&mut report, "Priority Matrix", matrix.trim_end());

        let gaps = if parts.gaps.is_empty() {
            NO_URGENT_GAPS.to_string()
        } else {
            parts
                .gaps
                .iter()
                .map(|(gap, outcome)| {
                    format!(
                        "### {}\n**Phase:** {} | **Scores:** I={}, R={}, Gap={}\n\n{}\n",
                        gap.name,
                        gap.phase_name,
                        gap.importance,
                        gap.readiness,
                        gap.gap_score,
                        outcome.text()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };
        section(&mut report, "Urgent Gaps - Detailed Analysis", gaps.trim_end());

        if self.config.include_strengths {
            let strengths = if parts.strengths.is_empty() {
                NO_STRENGTHS.to_string()
            } else {
                parts
                    .strengths
                    .iter()
                    .map(|(cap, outcome)| {
                        format!(
                            "### {}\n**Phase:** {} | **Scores:** I={}, R={}\n\n{}\n",
                            cap.name,
                            cap.phase_name,
                            cap.importance,
                            cap.readiness,
                            outcome.text()
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            section(&mut report, "Strengths to Protect", strengths.trim_end());
        }

        section(&mut report, "Getting Started with Zuora MCP", MCP_GUIDE.trim());
        section(&mut report, "Building Your First Zuora Agent", AGENT_GUIDE.trim());

        report
    }

    /// Scan, append warnings, fix bullets, then sanitize branding.
    fn post_process(&self, draft: String) -> (String, Vec<String>) {
        let warnings = scan_constraints(&draft, &self.config.allowed_agents);
        if !warnings.is_empty() {
            tracing::warn!(count = warnings.len(), "report validation warnings");
        }

        let mut text = draft;
        text.push_str(&warnings_section(&warnings));
        let text = fix_bullet_sections(&text);
        let text = match &self.config.brand_policy {
            Some(policy) => policy.sanitize(&text),
            None => text,
        };
        (text, warnings)
    }
}

/// Generate a report with the given pool size and otherwise default settings.
pub async fn generate_report(
    synthesizer: Synthesizer,
    scores: &[CapabilityScore],
    kb: Arc<KnowledgeBase>,
    subject: &str,
    max_workers: usize,
) -> Result<Report> {
    ReportGenerator::new(synthesizer, kb)
        .with_config(ReportConfig::default().max_workers(max_workers))
        .generate(scores, subject)
        .await
}

struct Plan<'a> {
    tasks: Vec<SynthesisTask>,
    gaps: Vec<&'a AnalyzedCapability>,
    strengths: Vec<&'a AnalyzedCapability>,
}

struct Assembly<'a> {
    subject: &'a str,
    customer: Option<&'a CustomerContext>,
    generated_at: &'a DateTime<Local>,
    executive: Option<&'a str>,
    matrix: &'a PriorityMatrix,
    phases: &'a [PhaseSummary],
    gaps: &'a [(&'a AnalyzedCapability, Synthesis)],
    strengths: &'a [(&'a AnalyzedCapability, Synthesis)],
}

/// Markdown table of category counts.
pub fn priority_matrix_table(matrix: &PriorityMatrix, thresholds: &Thresholds) -> String {
    let mut table = String::from(
        "| Priority | Count | Description |\n|----------|-------|-------------|\n",
    );
    for (category, count) in matrix.iter() {
        table.push_str(&format!(
            "| {} | {} | {} |\n",
            category.marked_label(),
            count,
            thresholds.describe(category)
        ));
    }
    table
}

/// Markdown table of per-phase averages.
pub fn phase_summary_table(phases: &[PhaseSummary]) -> String {
    let mut table = String::from(
        "| Phase | Avg Importance | Avg Readiness | Avg Gap Score | Urgent Gaps | Strengths |\n\
         |-------|----------------|---------------|---------------|-------------|-----------|\n",
    );
    for phase in phases {
        table.push_str(&format!(
            "| {} | {:.1} | {:.1} | {} | {} | {} |\n",
            phase.phase_name,
            phase.avg_importance,
            phase.avg_readiness,
            phase.avg_gap_score,
            phase.urgent_count,
            phase.strength_count
        ));
    }
    table
}

/// Plain summary of an analyzed batch, without any model calls.
pub fn quick_summary(analyzed: &[AnalyzedCapability]) -> String {
    let matrix = priority_matrix(analyzed);
    let mut summary = format!(
        "## Quick Assessment Summary\n\n**Total Capabilities Assessed:** {}\n\n**Priority Distribution:**\n",
        analyzed.len()
    );
    for (category, count) in matrix.iter() {
        summary.push_str(&format!("- {}: {}\n", category.marked_label(), count));
    }

    summary.push_str("\n**Top Urgent Gaps:**\n");
    for (i, cap) in by_category(analyzed, PriorityCategory::UrgentGap)
        .iter()
        .take(5)
        .enumerate()
    {
        summary.push_str(&format!(
            "\n{}. **{}** ({})\n   - Importance: {}, Readiness: {}\n   - Gap Score: {}",
            i + 1,
            cap.name,
            cap.phase_name,
            cap.importance,
            cap.readiness,
            cap.gap_score
        ));
    }

    summary.push_str("\n\n**Top Strengths:**\n");
    for (i, cap) in by_category(analyzed, PriorityCategory::Strength)
        .iter()
        .take(5)
        .enumerate()
    {
        summary.push_str(&format!(
            "\n{}. **{}** ({})\n   - Importance: {}, Readiness: {}",
            i + 1,
            cap.name,
            cap.phase_name,
            cap.importance,
            cap.readiness
        ));
    }

    summary
}
