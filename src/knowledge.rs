//! Static knowledge base lookup.
//!
//! The knowledge base is a read-only document grouping capabilities by
//! phase. It is loaded once and shared (usually behind an `Arc`) by every
//! report run; nothing in the engine mutates it.
//!
//! # Document layout
//!
//! ```json
//! {
//!   "phases": [
//!     {
//!       "id": "invoice",
//!       "name": "Invoice",
//!       "color": "#2E86AB",
//!       "agentic_goal": "Touchless invoicing",
//!       "capabilities": [
//!         {
//!           "id": "invoice_generation",
//!           "name": "Invoice Generation",
//!           "why_it_matters": "...",
//!           "how_it_works_today": "...",
//!           "current_ai_capabilities": { "platform_features": [], "mcp_tools": [] },
//!           "whats_coming": { "timeline": "6-12M", "capabilities": [] },
//!           "agent_mapping": { "primary_agents": [], "supporting_agents": [] }
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// AI features available for a capability today.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentCapabilities {
    #[serde(default)]
    pub platform_features: Vec<String>,
    #[serde(default)]
    pub mcp_tools: Vec<String>,
}

/// Upcoming capabilities on the roadmap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingCapabilities {
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Agents mapped onto a capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMapping {
    #[serde(default)]
    pub primary_agents: Vec<String>,
    #[serde(default)]
    pub supporting_agents: Vec<String>,
}

/// Phase a capability belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseInfo {
    pub id: String,
    pub name: String,
    pub color: String,
    pub agentic_goal: String,
}

/// Reference data for one capability, flattened with its phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub name: String,
    pub phase: PhaseInfo,
    pub why_it_matters: Option<String>,
    pub how_it_works_today: Option<String>,
    pub current: CurrentCapabilities,
    pub upcoming: UpcomingCapabilities,
    pub agents: AgentMapping,
    pub row: u32,
    pub col: u32,
}

// Raw document shapes. Every field is optional so that partially filled
// documents still load.

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    phases: Vec<PhaseRecord>,
}

#[derive(Deserialize)]
struct PhaseRecord {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    color: String,
    #[serde(default)]
    agentic_goal: String,
    #[serde(default)]
    capabilities: Vec<CapabilityRecord>,
}

#[derive(Deserialize)]
struct CapabilityRecord {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    why_it_matters: Option<String>,
    #[serde(default)]
    how_it_works_today: Option<String>,
    #[serde(default)]
    current_ai_capabilities: CurrentCapabilities,
    #[serde(default)]
    whats_coming: UpcomingCapabilities,
    #[serde(default)]
    agent_mapping: AgentMapping,
    #[serde(default)]
    row: u32,
    #[serde(default)]
    col: u32,
}

/// Read-only lookup from capability id to its knowledge entry.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    entries: HashMap<String, KnowledgeEntry>,
    /// Capability ids in document order
    order: Vec<String>,
}

impl KnowledgeBase {
    /// Build a knowledge base from already flattened entries.
    ///
    /// A later entry with a duplicate id replaces the earlier one but keeps
    /// its original position.
    pub fn from_entries(entries: impl IntoIterator<Item = KnowledgeEntry>) -> Self {
        let mut kb = Self::default();
        for entry in entries {
            kb.insert(entry);
        }
        kb
    }

    /// Parse the phase-grouped JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: Document = serde_json::from_str(json)?;
        let mut kb = Self::default();

        for phase in doc.phases {
            let info = PhaseInfo {
                id: phase.id,
                name: phase.name,
                color: phase.color,
                agentic_goal: phase.agentic_goal,
            };
            for cap in phase.capabilities {
                kb.insert(KnowledgeEntry {
                    id: cap.id,
                    name: cap.name,
                    phase: info.clone(),
                    why_it_matters: cap.why_it_matters,
                    how_it_works_today: cap.how_it_works_today,
                    current: cap.current_ai_capabilities,
                    upcoming: cap.whats_coming,
                    agents: cap.agent_mapping,
                    row: cap.row,
                    col: cap.col,
                });
            }
        }

        tracing::debug!("Loaded knowledge base with {} capabilities", kb.len());
        Ok(kb)
    }

    /// Load the JSON document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    fn insert(&mut self, entry: KnowledgeEntry) {
        if !self.entries.contains_key(&entry.id) {
            self.order.push(entry.id.clone());
        }
        self.entries.insert(entry.id.clone(), entry);
    }

    /// Look up a capability by id.
    pub fn get(&self, capability_id: &str) -> Option<&KnowledgeEntry> {
        self.entries.get(capability_id)
    }

    pub fn contains(&self, capability_id: &str) -> bool {
        self.entries.contains_key(capability_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = &KnowledgeEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }
}
