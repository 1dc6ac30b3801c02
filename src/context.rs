//! Prompt context formatting.
//!
//! Each formatter renders facts taken from the knowledge base into a plain
//! text block that becomes the body of a synthesis prompt. The blocks are
//! structurally fixed: every header is always present, and empty lists are
//! rendered with an explicit marker instead of being left out.

use crate::analysis::{AnalyzedCapability, by_category, mean_importance, mean_readiness};
use crate::scoring::PriorityCategory;

/// Maximum items rendered from a capped list.
pub const MAX_LIST_ITEMS: usize = 5;

const TOP_URGENT: usize = 5;
const TOP_PHASES: usize = 3;

const NONE_DOCUMENTED: &str = "None documented";
const NOT_DOCUMENTED: &str = "Not documented";

/// Context block for a single gap capability.
///
/// Platform features, MCP tools, and upcoming capabilities are capped at
/// [`MAX_LIST_ITEMS`]; agent lists are rendered in full.
pub fn format_gap_context(gap: &AnalyzedCapability) -> String {
    format!(
        "CAPABILITY: {name}
PHASE: {phase}
SCORES: Importance={i}, Readiness={r}, Gap Score={g}
PRIORITY: {priority}

WHY IT MATTERS:
{why}

WHAT'S AVAILABLE TODAY:
{today}

PLATFORM FEATURES:
{features}

PRIMARY AI AGENTS:
{primary}

SUPPORTING AI AGENTS:
{supporting}

MCP TOOLS AVAILABLE:
{tools}

WHAT'S COMING:
{coming}
",
        name = gap.name,
        phase = gap.phase_name,
        i = gap.importance,
        r = gap.readiness,
        g = gap.gap_score,
        priority = priority_line(gap.category),
        why = text_or_missing(gap.why_it_matters.as_deref()),
        today = text_or_missing(gap.how_it_works_today.as_deref()),
        features = bullet_list(&gap.current.platform_features, Some(MAX_LIST_ITEMS), NONE_DOCUMENTED),
        primary = bullet_list(&gap.agents.primary_agents, None, NONE_DOCUMENTED),
        supporting = bullet_list(&gap.agents.supporting_agents, None, NONE_DOCUMENTED),
        tools = bullet_list(&gap.current.mcp_tools, Some(MAX_LIST_ITEMS), NONE_DOCUMENTED),
        coming = bullet_list(&gap.upcoming.capabilities, Some(MAX_LIST_ITEMS), NOT_DOCUMENTED),
    )
}

/// Context block for a strength capability.
pub fn format_strength_context(strength: &AnalyzedCapability) -> String {
    format!(
        "CAPABILITY: {name}
PHASE: {phase}
SCORES: Importance={i}, Readiness={r}
PRIORITY: {priority}

WHY IT MATTERS:
{why}

WHAT'S WORKING TODAY:
{today}

AI AGENTS SUPPORTING THIS:
Primary: {primary}
Supporting: {supporting}
",
        name = strength.name,
        phase = strength.phase_name,
        i = strength.importance,
        r = strength.readiness,
        priority = priority_line(strength.category),
        why = text_or_missing(strength.why_it_matters.as_deref()),
        today = text_or_missing(strength.how_it_works_today.as_deref()),
        primary = inline_list(&strength.agents.primary_agents),
        supporting = inline_list(&strength.agents.supporting_agents),
    )
}

/// Batch-level facts behind the executive summary.
#[derive(Debug, Clone)]
pub struct ExecutiveFacts<'a> {
    pub subject: &'a str,
    pub total_scored: usize,
    /// Urgent gaps, most urgent first
    pub urgent: Vec<&'a AnalyzedCapability>,
    pub critical: Vec<&'a AnalyzedCapability>,
    pub avg_importance: f64,
    pub avg_readiness: f64,
}

impl<'a> ExecutiveFacts<'a> {
    /// Derive the facts from an analyzed (and already filtered) batch.
    pub fn from_batch(subject: &'a str, analyzed: &'a [AnalyzedCapability]) -> Self {
        Self {
            subject,
            total_scored: analyzed.len(),
            urgent: by_category(analyzed, PriorityCategory::UrgentGap),
            critical: by_category(analyzed, PriorityCategory::CriticalGap),
            avg_importance: mean_importance(analyzed),
            avg_readiness: mean_readiness(analyzed),
        }
    }
}

/// Context block for the executive summary.
pub fn format_executive_context(facts: &ExecutiveFacts<'_>) -> String {
    let top_urgent = if facts.urgent.is_empty() {
        format!("- {NONE_DOCUMENTED}")
    } else {
        facts
            .urgent
            .iter()
            .take(TOP_URGENT)
            .map(|g| {
                format!(
                    "- {} ({}): I={}, R={}",
                    g.name, g.phase_name, g.importance, g.readiness
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "ASSESSMENT FOR: {subject}
ASSESSMENT SCOPE: {total} capabilities scored (filtered for relevance)

OVERALL METRICS:
- Average Importance: {avg_i:.1}/10
- Average Readiness: {avg_r:.1}/10
- Readiness Gap: {diff:.1} points

PRIORITY DISTRIBUTION:
- Urgent Gaps (High I, Low R): {urgent}
- Critical Gaps (High I, Medium R): {critical}

TOP 5 URGENT GAPS:
{top_urgent}

PHASES WITH MOST GAPS:
{phases}

FOCUS: This assessment identifies capability gaps requiring immediate attention. AI agents and MCP tools provide the foundation for addressing these gaps.
",
        subject = facts.subject,
        total = facts.total_scored,
        avg_i = facts.avg_importance,
        avg_r = facts.avg_readiness,
        diff = facts.avg_importance - facts.avg_readiness,
        urgent = facts.urgent.len(),
        critical = facts.critical.len(),
        phases = format_phase_gap_summary(&facts.urgent),
    )
}

/// Top phases by number of gaps, ties in first-seen order.
pub fn format_phase_gap_summary(gaps: &[&AnalyzedCapability]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for gap in gaps {
        match counts.iter_mut().find(|(phase, _)| *phase == gap.phase_name) {
            Some((_, n)) => *n += 1,
            None => counts.push((gap.phase_name.as_str(), 1)),
        }
    }

    if counts.is_empty() {
        return format!("- {NONE_DOCUMENTED}");
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .iter()
        .take(TOP_PHASES)
        .map(|(phase, n)| format!("- {phase}: {n} gaps"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn priority_line(category: PriorityCategory) -> String {
    let qualifier = match category {
        PriorityCategory::UrgentGap => "High Importance + Low Readiness",
        PriorityCategory::CriticalGap => "High Importance + Medium Readiness",
        PriorityCategory::Strength => "High Importance + High Readiness",
        PriorityCategory::Opportunity => "Medium Importance + Low Readiness",
        PriorityCategory::Maintain => "Medium Importance + High Readiness",
        PriorityCategory::Deprioritize => "Low Importance",
    };
    format!("{} ({qualifier})", category.label().to_uppercase())
}

fn text_or_missing(text: Option<&str>) -> &str {
    match text {
        Some(t) if !t.trim().is_empty() => t,
        _ => NOT_DOCUMENTED,
    }
}

fn bullet_list(items: &[String], cap: Option<usize>, empty: &str) -> String {
    if items.is_empty() {
        return format!("- {empty}");
    }
    items
        .iter()
        .take(cap.unwrap_or(usize::MAX))
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn inline_list(items: &[String]) -> String {
    if items.is_empty() {
        NONE_DOCUMENTED.to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{CapabilityScore, analyze};
    use crate::knowledge::{
        AgentMapping, CurrentCapabilities, KnowledgeBase, KnowledgeEntry, PhaseInfo,
        UpcomingCapabilities,
    };

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn phase(name: &str) -> PhaseInfo {
        PhaseInfo {
            id: name.to_lowercase(),
            name: name.into(),
            ..Default::default()
        }
    }

    fn full_entry() -> KnowledgeEntry {
        KnowledgeEntry {
            id: "test_cap_1".into(),
            name: "Test Capability".into(),
            phase: phase("Invoice"),
            why_it_matters: Some("This capability is critical for business operations.".into()),
            how_it_works_today: Some("Currently managed through manual processes.".into()),
            current: CurrentCapabilities {
                platform_features: strings(&["F1", "F2", "F3", "F4", "F5", "F6", "F7"]),
                mcp_tools: strings(&["zuora_codegen", "query_objects"]),
            },
            upcoming: UpcomingCapabilities {
                timeline: Some("6-12M".into()),
                capabilities: strings(&["Enhanced AI routing", "Automated reconciliation"]),
            },
            agents: AgentMapping {
                primary_agents: strings(&["Billing Operations Agent"]),
                supporting_agents: strings(&["Revenue Narrator"]),
            },
            ..Default::default()
        }
    }

    fn analyzed_one(entry: KnowledgeEntry, importance: u8, readiness: u8) -> AnalyzedCapability {
        let id = entry.id.clone();
        let kb = KnowledgeBase::from_entries(vec![entry]);
        analyze(&[CapabilityScore::new(id, importance, readiness)], &kb)
            .unwrap()
            .remove(0)
    }

    #[test]
    fn test_gap_context_includes_all_fields() {
        let gap = analyzed_one(full_entry(), 9, 3);
        let context = format_gap_context(&gap);

        assert!(context.contains("CAPABILITY: Test Capability"));
        assert!(context.contains("PHASE: Invoice"));
        assert!(context.contains("Importance=9, Readiness=3, Gap Score=6"));
        assert!(context.contains("URGENT GAP (High Importance + Low Readiness)"));
        assert!(context.contains("This capability is critical"));
        assert!(context.contains("- Billing Operations Agent"));
        assert!(context.contains("- Revenue Narrator"));
        assert!(context.contains("- zuora_codegen"));
        assert!(context.contains("WHAT'S COMING:\n- Enhanced AI routing\n- Automated reconciliation"));
    }

    #[test]
    fn test_gap_context_caps_lists() {
        let gap = analyzed_one(full_entry(), 9, 3);
        let context = format_gap_context(&gap);

        assert!(context.contains("- F5"));
        assert!(!context.contains("- F6"));
        assert!(!context.contains("- F7"));
    }

    #[test]
    fn test_gap_context_agents_not_capped() {
        let mut entry = full_entry();
        entry.agents.primary_agents = (1..=8).map(|i| format!("Agent {i}")).collect();
        let context = format_gap_context(&analyzed_one(entry, 9, 3));
        assert!(context.contains("- Agent 8"));
    }

    #[test]
    fn test_gap_context_missing_data_keeps_structure() {
        let sparse = KnowledgeEntry {
            id: "test_cap_1".into(),
            name: "Test Capability".into(),
            phase: phase("Invoice"),
            ..Default::default()
        };
        let full = format_gap_context(&analyzed_one(full_entry(), 9, 3));
        let empty = format_gap_context(&analyzed_one(sparse, 9, 3));

        assert!(empty.contains("Test Capability"));
        assert!(empty.contains("WHY IT MATTERS:\nNot documented"));
        assert!(empty.contains("PLATFORM FEATURES:\n- None documented"));
        assert!(empty.contains("PRIMARY AI AGENTS:\n- None documented"));
        assert!(empty.contains("MCP TOOLS AVAILABLE:\n- None documented"));
        assert!(empty.contains("WHAT'S COMING:\n- Not documented"));

        let headers = |text: &str| {
            text.lines()
                .filter(|l| l.ends_with(':') && l.chars().all(|c| !c.is_lowercase()))
                .count()
        };
        assert_eq!(headers(&full), headers(&empty));
    }

    #[test]
    fn test_strength_context() {
        let strength = analyzed_one(full_entry(), 8, 9);
        let context = format_strength_context(&strength);

        assert!(context.contains("Test Capability"));
        assert!(context.contains("STRENGTH (High Importance + High Readiness)"));
        assert!(context.contains("Primary: Billing Operations Agent"));
        assert!(context.contains("Supporting: Revenue Narrator"));
    }

    #[test]
    fn test_strength_context_without_agents() {
        let entry = KnowledgeEntry {
            id: "s".into(),
            name: "Strong".into(),
            ..Default::default()
        };
        let context = format_strength_context(&analyzed_one(entry, 8, 9));
        assert!(context.contains("Primary: None documented"));
        assert!(context.contains("Supporting: None documented"));
    }

    fn batch() -> Vec<AnalyzedCapability> {
        let entries = vec![
            KnowledgeEntry {
                id: "a".into(),
                name: "Alpha".into(),
                phase: phase("Invoice"),
                ..Default::default()
            },
            KnowledgeEntry {
                id: "b".into(),
                name: "Beta".into(),
                phase: phase("Collect"),
                ..Default::default()
            },
            KnowledgeEntry {
                id: "c".into(),
                name: "Gamma".into(),
                phase: phase("Collect"),
                ..Default::default()
            },
            KnowledgeEntry {
                id: "d".into(),
                name: "Delta".into(),
                phase: phase("Invoice"),
                ..Default::default()
            },
        ];
        let scores = vec![
            CapabilityScore::new("a", 9, 2),
            CapabilityScore::new("b", 8, 3),
            CapabilityScore::new("c", 7, 4),
            CapabilityScore::new("d", 8, 5),
        ];
        analyze(&scores, &KnowledgeBase::from_entries(entries)).unwrap()
    }

    #[test]
    fn test_executive_context_metrics() {
        let analyzed = batch();
        let facts = ExecutiveFacts::from_batch("Test Company", &analyzed);
        let context = format_executive_context(&facts);

        assert!(context.contains("ASSESSMENT FOR: Test Company"));
        assert!(context.contains("4 capabilities scored"));
        assert!(context.contains("Average Importance: 8.0/10"));
        assert!(context.contains("Average Readiness: 3.5/10"));
        assert!(context.contains("Readiness Gap: 4.5 points"));
        assert!(context.contains("Urgent Gaps (High I, Low R): 3"));
        assert!(context.contains("Critical Gaps (High I, Medium R): 1"));
        assert!(context.contains("- Alpha (Invoice): I=9, R=2"));
    }

    #[test]
    fn test_phase_gap_summary_orders_by_count() {
        let analyzed = batch();
        let facts = ExecutiveFacts::from_batch("X", &analyzed);
        let summary = format_phase_gap_summary(&facts.urgent);
        assert_eq!(summary, "- Collect: 2 gaps\n- Invoice: 1 gaps");
    }

    #[test]
    fn test_executive_context_empty_batch() {
        let facts = ExecutiveFacts::from_batch("Nobody", &[]);
        let context = format_executive_context(&facts);
        assert!(context.contains("0 capabilities scored"));
        assert!(context.contains("Average Importance: 0.0/10"));
        assert!(context.contains("TOP 5 URGENT GAPS:\n- None documented"));
        assert!(context.contains("PHASES WITH MOST GAPS:\n- None documented"));
    }
}
