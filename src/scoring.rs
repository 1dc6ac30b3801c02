//! Priority classification on the importance/readiness grid.
//!
//! Classification is a fixed decision table evaluated top to bottom, first
//! match wins:
//!
//! | Importance        | Readiness           | Category       |
//! |-------------------|---------------------|----------------|
//! | `<= low_importance` | any               | `Deprioritize` |
//! | `>= high_importance` | `<= low_readiness` | `UrgentGap`   |
//! | `>= high_importance` | `<= mid_readiness` | `CriticalGap` |
//! | `>= high_importance` | otherwise          | `Strength`    |
//! | in between        | `<= low_readiness`  | `Opportunity`  |
//! | in between        | otherwise           | `Maintain`     |
//!
//! The gap score never takes part in classification; it only ranks
//! capabilities inside the analyzer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the six priority buckets.
///
/// Declaration order is the display order used by every table and count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityCategory {
    UrgentGap,
    CriticalGap,
    Strength,
    Opportunity,
    Maintain,
    Deprioritize,
}

impl PriorityCategory {
    /// All categories in display order.
    pub const ALL: [PriorityCategory; 6] = [
        PriorityCategory::UrgentGap,
        PriorityCategory::CriticalGap,
        PriorityCategory::Strength,
        PriorityCategory::Opportunity,
        PriorityCategory::Maintain,
        PriorityCategory::Deprioritize,
    ];

    /// Stable machine identifier, e.g. `URGENT_GAP`.
    pub fn as_str(self) -> &'static str {
        match self {
            PriorityCategory::UrgentGap => "URGENT_GAP",
            PriorityCategory::CriticalGap => "CRITICAL_GAP",
            PriorityCategory::Strength => "STRENGTH",
            PriorityCategory::Opportunity => "OPPORTUNITY",
            PriorityCategory::Maintain => "MAINTAIN",
            PriorityCategory::Deprioritize => "DEPRIORITIZE",
        }
    }

    /// Singular human label, e.g. "Urgent Gap".
    pub fn label(self) -> &'static str {
        match self {
            PriorityCategory::UrgentGap => "Urgent Gap",
            PriorityCategory::CriticalGap => "Critical Gap",
            PriorityCategory::Strength => "Strength",
            PriorityCategory::Opportunity => "Opportunity",
            PriorityCategory::Maintain => "Maintain",
            PriorityCategory::Deprioritize => "Deprioritize",
        }
    }

    /// Plural label with a color marker, used in summary tables.
    pub fn marked_label(self) -> &'static str {
        match self {
            PriorityCategory::UrgentGap => "🔴 Urgent Gaps",
            PriorityCategory::CriticalGap => "🟠 Critical Gaps",
            PriorityCategory::Strength => "🟢 Strengths",
            PriorityCategory::Opportunity => "🟡 Opportunities",
            PriorityCategory::Maintain => "🔵 Maintain",
            PriorityCategory::Deprioritize => "⚪ Deprioritize",
        }
    }

    /// Planning horizon and investment level for the category.
    pub fn timeline(self) -> Timeline {
        let (horizon, agent_tier, investment) = match self {
            PriorityCategory::UrgentGap => {
                ("NOW (0-6 months)", "Developer Agents + Quick Wins", "HIGH")
            }
            PriorityCategory::CriticalGap => {
                ("NEAR (6-12 months)", "Diagnostic Agents", "MEDIUM-HIGH")
            }
            PriorityCategory::Strength => ("PROTECT", "Monitor + Enhance", "MAINTAIN"),
            PriorityCategory::Opportunity => {
                ("LATER (12-24 months)", "Orchestration Agents", "MEDIUM")
            }
            PriorityCategory::Maintain => ("AS NEEDED", "Standard Operations", "LOW"),
            PriorityCategory::Deprioritize => ("BACKLOG", "N/A", "MINIMAL"),
        };
        Timeline {
            horizon,
            agent_tier,
            investment,
        }
    }
}

impl fmt::Display for PriorityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timeline metadata attached to each category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub horizon: &'static str,
    pub agent_tier: &'static str,
    pub investment: &'static str,
}

/// Grid thresholds for the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Importance at or below this is deprioritized
    pub low_importance: u8,
    /// Importance at or above this is high
    pub high_importance: u8,
    /// Readiness at or below this is low
    pub low_readiness: u8,
    /// Readiness at or below this (and above `low_readiness`) is medium
    pub mid_readiness: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low_importance: 3,
            high_importance: 7,
            low_readiness: 4,
            mid_readiness: 6,
        }
    }
}

impl Thresholds {
    pub fn low_importance(mut self, v: u8) -> Self {
        self.low_importance = v;
        self
    }

    pub fn high_importance(mut self, v: u8) -> Self {
        self.high_importance = v;
        self
    }

    pub fn low_readiness(mut self, v: u8) -> Self {
        self.low_readiness = v;
        self
    }

    pub fn mid_readiness(mut self, v: u8) -> Self {
        self.mid_readiness = v;
        self
    }

    /// Classify a capability and compute its gap score.
    pub fn categorize(&self, importance: u8, readiness: u8) -> (PriorityCategory, u8) {
        let category = if importance <= self.low_importance {
            PriorityCategory::Deprioritize
        } else if importance >= self.high_importance {
            if readiness <= self.low_readiness {
                PriorityCategory::UrgentGap
            } else if readiness <= self.mid_readiness {
                PriorityCategory::CriticalGap
            } else {
                PriorityCategory::Strength
            }
        } else if readiness <= self.low_readiness {
            PriorityCategory::Opportunity
        } else {
            PriorityCategory::Maintain
        };

        (category, gap_score(importance, readiness))
    }

    /// Human description of the grid cell a category covers.
    pub fn describe(&self, category: PriorityCategory) -> String {
        let high_i = self.high_importance;
        let mid_i_lo = self.low_importance.saturating_add(1);
        let mid_i_hi = self.high_importance.saturating_sub(1);
        let low_r = self.low_readiness;
        let mid_r_lo = self.low_readiness.saturating_add(1);
        let mid_r = self.mid_readiness;
        let high_r = self.mid_readiness.saturating_add(1);

        match category {
            PriorityCategory::UrgentGap => {
                format!("High importance (≥{high_i}), Low readiness (≤{low_r})")
            }
            PriorityCategory::CriticalGap => format!(
                "High importance (≥{high_i}), Medium readiness ({mid_r_lo}-{mid_r})"
            ),
            PriorityCategory::Strength => {
                format!("High importance (≥{high_i}), High readiness (≥{high_r})")
            }
            PriorityCategory::Opportunity => format!(
                "Medium importance ({mid_i_lo}-{mid_i_hi}), Low readiness (≤{low_r})"
            ),
            PriorityCategory::Maintain => format!(
                "Medium importance ({mid_i_lo}-{mid_i_hi}), High readiness (≥{mid_r_lo})"
            ),
            PriorityCategory::Deprioritize => {
                format!("Low importance (≤{})", self.low_importance)
            }
        }
    }
}

/// Classify with the default thresholds.
pub fn categorize(importance: u8, readiness: u8) -> (PriorityCategory, u8) {
    Thresholds::default().categorize(importance, readiness)
}

/// Urgency score `round(importance * (10 - readiness) / 10)`.
///
/// Halves round to even: `gap_score(5, 5) == 2`, `gap_score(7, 5) == 4`.
pub fn gap_score(importance: u8, readiness: u8) -> u8 {
    let headroom = 10u32.saturating_sub(u32::from(readiness));
    let raw = f64::from(u32::from(importance) * headroom) / 10.0;
    raw.round_ties_even() as u8
}
