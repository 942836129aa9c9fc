use serde::{Deserialize, Serialize};

/// Recommended next action for a memory, derived from its ADM score,
/// access count, and age. Advisory only: nothing in this crate acts on
/// a hint automatically, callers decide whether to apply it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionStrategy {
    /// High value, frequently accessed: keep as-is, maybe boost priority.
    Reinforcement,
    /// High value, rarely accessed: surface through varied retrieval paths.
    Diversification,
    /// Moderate value, overlapping with other memories: merge candidate.
    Consolidation,
    /// Low value, stale: candidate for removal.
    Pruning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionHint {
    pub strategy: EvolutionStrategy,
    /// How confident the decision table is in this recommendation, not
    /// the memory's own importance score.
    pub confidence: f64,
    pub reason: String,
}

impl EvolutionHint {
    pub fn new(strategy: EvolutionStrategy, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            strategy,
            confidence,
            reason: reason.into(),
        }
    }
}
