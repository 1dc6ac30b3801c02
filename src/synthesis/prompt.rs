//! Prompt templates for section synthesis.

use super::SectionKind;

/// System prompt shared by every synthesis call.
pub const SYSTEM_PROMPT: &str = "You are a strategic consultant synthesizing an O2C (Order-to-Cash) assessment report. You must ONLY use information provided in the user message - you are a librarian organizing content, not an inventor.

ABSOLUTE RULES:
1. ONLY reference agent names from the provided list
2. ONLY cite capabilities, features, and tools from the provided context
3. NO speculation - never use \"could potentially\", \"might be able to\", \"consider exploring\"
4. NO future tense promises or roadmap hints
5. NO invented recommendations beyond what's documented
6. Write in clear, strategic business prose
7. Be concise - quality over quantity

Your job is to CONNECT and CONTEXTUALIZE the provided facts into readable strategic prose. You shape and present the content, you do not create new content.

Write as if briefing a C-level executive - clear, direct, actionable.";

/// Section instructions for the executive summary.
pub const EXECUTIVE_SUMMARY_TEMPLATE: &str = "Synthesize this into an executive summary (2-3 paragraphs).

Highlight:
- Overall readiness posture and key metrics
- Most critical gaps requiring immediate attention
- Which O2C phases need the most work
- The strategic opportunity with AI agents and MCP to close these gaps

{context}

Write for a C-level audience. Be direct and strategic. Focus on gap identification and readiness improvement.";

/// Section instructions for one urgent gap.
pub const URGENT_GAP_TEMPLATE: &str = "Synthesize this capability gap into a STRUCTURED format.

INPUT:
{context}

OUTPUT FORMAT (follow exactly):

**Why This Matters:**
[2-3 sentences on the business problem - be specific, not generic]

**Available Today:**

*AI Agents:*
• [Agent Name] - [what it does in 5-8 words]
• [Agent Name] - [what it does in 5-8 words]

*Platform Features:*
• [Feature 1]
• [Feature 2]
• [Feature 3]

*MCP Tools:*
• [Tool 1]
• [Tool 2]

**What's Coming:**
• [Upcoming capability 1]
• [Upcoming capability 2]

**Business Impact:**
[One sentence on the outcome of closing this gap]

CRITICAL FORMATTING RULES - READ CAREFULLY:
1. Each bullet point MUST be on its own line with a line break before it
2. Use the bullet character • at the start of each line
3. NEVER put multiple bullets on the same line (NO: \"• Item 1 • Item 2\")
4. Keep \"Why This Matters\" to 2-3 sentences MAX
5. Agent descriptions: \"[Agent Name] - [what it does in 5-8 words]\"
6. Only include the MOST relevant items, not everything
7. Be specific, not generic
8. Do NOT include timelines in \"What's Coming\" - just list the capabilities";

/// Section instructions for one strength.
pub const STRENGTH_TEMPLATE: &str = "Synthesize this strength into a STRUCTURED format.

INPUT:
{context}

OUTPUT FORMAT:

**Why This Is A Strength:**
[1-2 sentences on why this capability matters]

**What's Working:**
- [Bullet key agents/features supporting this]
- [Bullet key agents/features supporting this]

**Protect By:**
[One sentence on how to maintain this advantage]

Keep it concise - strengths need less detail than gaps.";

/// Grounding block appended to every user prompt.
pub const ALLOW_LIST_TEMPLATE: &str = "VALID AGENT NAMES (only reference these):
{names}

Do NOT reference any agent not in this list.";

/// Agents the model may name unless the caller supplies its own roster.
pub const DEFAULT_ALLOWED_AGENTS: &[&str] = &[
    // Concierge
    "Anantha Concierge",
    "Zuora AI Concierge",
    // Business agents
    "Billing Operations Agent",
    "Collections Manager Agent",
    "Revenue Accountant Agent",
    "Revenue Manager Agent",
    "Customer Success Agent",
    "Customer Health Agent",
    "Churn Agent",
    "Quote Agent",
    "Deal Assist",
    // Functional agents
    "Billing/Invoice Service Agent",
    "Mediation/DACO Agent",
    "DQ/Trino Agent",
    "Data Management Agent",
    "RCA Agent",
    "Notification AI Bot",
    "Workflow AI Bot",
    // Specialized agents
    "Outcomes Simulation Agent",
    "Revenue Narrator",
    "SSP Analyzer",
    "Query Assistant",
    "Reconciliation AI",
    "DataFix AI",
    // Other
    "Developer MCP",
    "Provisioning Agent",
    "Fulfillment Agent",
    "Risk Scoring Agent",
    "Finance Intelligence Agent",
];

/// The default roster as owned strings.
pub fn default_allowed_agents() -> Vec<String> {
    DEFAULT_ALLOWED_AGENTS.iter().map(|s| s.to_string()).collect()
}

/// Build the user prompt for a section.
pub fn user_prompt(kind: SectionKind, context: &str, allowed_names: &[String]) -> String {
    let template = match kind {
        SectionKind::ExecutiveSummary => EXECUTIVE_SUMMARY_TEMPLATE,
        SectionKind::UrgentGap => URGENT_GAP_TEMPLATE,
        SectionKind::Strength => STRENGTH_TEMPLATE,
    };

    let names = if allowed_names.is_empty() {
        "(none)".to_string()
    } else {
        allowed_names.join(", ")
    };

    format!(
        "{}\n\n{}",
        template.replace("{context}", context),
        ALLOW_LIST_TEMPLATE.replace("{names}", &names)
    )
}
