//! Lead-side winback vocabulary.

use serde::{Deserialize, Serialize};

/// Terminal classification a review assigns to a lead.
///
/// Wire format: the CRM's `winback_stage` label (`"engaging"`, `"irrecuperable"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadClassification {
    #[serde(rename = "engaging")]
    Engaging,
    #[serde(rename = "irrecuperable")]
    Irrecoverable,
}

impl LeadClassification {
    /// Label written to the lead's `winback_stage` column.
    pub fn stage_label(self) -> &'static str {
        match self {
            Self::Engaging => "engaging",
            Self::Irrecoverable => "irrecuperable",
        }
    }
}

/// Apply a signed delta to a lead score. Scores never go below zero.
pub fn adjust_score(score: i32, delta: i32) -> i32 {
    score.saturating_add(delta).max(0)
}
