//! Report post-processing: bullet normalization, brand sanitization and
//! advisory constraint scanning.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Bold headers whose content is expected to be a bullet list.
pub const BULLET_HEADERS: &[&str] = &[
    "Platform Features:",
    "MCP Tools:",
    "What's Coming:",
    "AI Agents:",
    "Available Today:",
];

/// Entity-shaped matches that are headings or generic terms, not agents.
pub const FALSE_POSITIVE_NAMES: &[&str] = &[
    "First Zuora Agent",
    "Your First Zuora Agent",
    "Building Your First Zuora Agent",
    "Building Your First Agent",
    "AI Agent",
    "MCP Agent",
    "Custom Agent",
    "Business Agent",
    "The Agent",
];

/// Hedging phrases the model was told not to use.
pub const SPECULATIVE_PHRASES: &[&str] = &[
    "could potentially",
    "might be able to",
    "we recommend exploring",
    "consider implementing",
    "it's possible that",
    "you should consider",
    "we suggest",
];

static BULLET_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*•\s*").expect("valid bullet pattern"));

static BOLD_CAPITALISED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*[A-Z]").expect("valid header pattern"));

static ENTITY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\s+(Agent|Bot)\b")
        .expect("valid entity pattern")
});

static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"  +").expect("valid whitespace pattern"));

/// Put every bullet of a run on its own line.
///
/// `●` and `○` become `•`. Text before the first bullet is kept on its own
/// line; text without bullets is returned unchanged.
pub fn normalize_bullets(text: &str) -> String {
    let text = text.replace(['●', '○'], "•");

    let Some(first) = text.find('•') else {
        return text;
    };

    let prefix = text[..first].trim();
    let items: Vec<&str> = BULLET_SPLIT
        .split(&text[first..])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect();

    if items.is_empty() {
        return text;
    }

    let bullets = items.join("\n• ");
    if prefix.is_empty() {
        format!("• {bullets}")
    } else {
        format!("{prefix}\n• {bullets}")
    }
}

/// Normalize bullets under every [`BULLET_HEADERS`] header in a report.
///
/// A section runs from the bold header to the next blank line, the next bold
/// capitalised header, or the end of the text.
pub fn fix_bullet_sections(report: &str) -> String {
    let mut report = report.to_string();
    for header in BULLET_HEADERS {
        report = fix_section(&report, &format!("**{header}**"));
    }
    report
}

fn fix_section(report: &str, marker: &str) -> String {
    let mut out = String::with_capacity(report.len());
    let mut rest = report;

    while let Some(pos) = rest.find(marker) {
        let after_marker = pos + marker.len();
        out.push_str(&rest[..after_marker]);

        let tail = &rest[after_marker..];
        let body_start = tail.len() - tail.trim_start().len();
        out.push_str(&tail[..body_start]);

        let body = &tail[body_start..];
        let body_end = section_end(body);
        out.push('\n');
        out.push_str(&normalize_bullets(&body[..body_end]));

        rest = &body[body_end..];
    }

    out.push_str(rest);
    out
}

fn section_end(body: &str) -> usize {
    let blank = body.find("\n\n");
    let header = BOLD_CAPITALISED.find(body).map(|m| m.start());
    match (blank, header) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => body.len(),
    }
}

/// Which brand mentions to strip from the final report.
#[derive(Debug, Clone)]
pub struct BrandPolicy {
    term: String,
    protected: Vec<String>,
    removals: Vec<Regex>,
}

impl Default for BrandPolicy {
    fn default() -> Self {
        [
            "Zuora MCP",
            "Zuora Developer MCP",
            "zuora-mcp",
            "Zuora OAuth",
            "Zuora tenant",
            "Zuora REST",
            "Zuora SDK",
        ]
        .into_iter()
        .fold(Self::new("Zuora"), |policy, phrase| policy.protect(phrase))
    }
}

impl BrandPolicy {
    pub fn new(term: impl Into<String>) -> Self {
        let term = term.into();
        let removals = if term.is_empty() {
            Vec::new()
        } else {
            let escaped = regex::escape(&term);
            [
                format!(r"\b{escaped}\s+"),
                format!(r"\b{escaped}'s\s+"),
                format!(r"\b{escaped}\b"),
            ]
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
        };
        Self {
            term,
            protected: Vec::new(),
            removals,
        }
    }

    pub fn protect(mut self, phrase: impl Into<String>) -> Self {
        self.protected.push(phrase.into());
        self
    }

    /// The brand term removed from running text.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Phrases that keep the brand term.
    pub fn protected(&self) -> &[String] {
        &self.protected
    }

    /// Remove the brand term outside protected phrases and collapse the
    /// double spaces that leaves behind. Applying it twice changes nothing.
    pub fn sanitize(&self, text: &str) -> String {
        if self.removals.is_empty() {
            return text.to_string();
        }

        // Protected phrases are matched on single-spaced text so the final
        // collapse cannot form one the matching pass missed.
        let mut text = MULTI_SPACE.replace_all(text, " ").into_owned();
        let placeholders: Vec<String> = (0..self.protected.len())
            .map(|i| format!("\u{E000}{i}\u{E001}"))
            .collect();

        for (phrase, placeholder) in self.protected.iter().zip(&placeholders) {
            text = text.replace(phrase.as_str(), placeholder);
        }

        for re in &self.removals {
            text = re.replace_all(&text, "").into_owned();
        }

        for (phrase, placeholder) in self.protected.iter().zip(&placeholders) {
            text = text.replace(placeholder.as_str(), phrase);
        }

        MULTI_SPACE.replace_all(&text, " ").into_owned()
    }
}

/// Sanitize with the default brand policy.
pub fn sanitize_branding(text: &str) -> String {
    BrandPolicy::default().sanitize(text)
}

/// Scan a report for ungrounded agent names and speculative language.
///
/// Findings are advisory. Each unknown name is reported once, in order of
/// first appearance.
pub fn scan_constraints(text: &str, allowed_names: &[String]) -> Vec<String> {
    let allowed: HashSet<&str> = allowed_names.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut warnings = Vec::new();

    for caps in ENTITY_NAME.captures_iter(text) {
        let name = format!("{} {}", &caps[1], &caps[2]);
        if allowed.contains(name.as_str()) || FALSE_POSITIVE_NAMES.contains(&name.as_str()) {
            continue;
        }
        if seen.insert(name.clone()) {
            warnings.push(format!("⚠️ Unknown agent referenced: '{name}'"));
        }
    }

    let lowered = text.to_lowercase();
    for phrase in SPECULATIVE_PHRASES {
        if lowered.contains(phrase) {
            warnings.push(format!("⚠️ Speculative language detected: '{phrase}'"));
        }
    }

    warnings
}

/// Render warnings as the trailing advisory section.
pub fn warnings_section(warnings: &[String]) -> String {
    if warnings.is_empty() {
        return String::new();
    }
    let mut section = String::from("\n\n---\n\n## Report Validation Warnings\n\n");
    for warning in warnings {
        section.push_str("- ");
        section.push_str(warning);
        section.push('\n');
    }
    section
}
