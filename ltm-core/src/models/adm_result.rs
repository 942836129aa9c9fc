use serde::{Deserialize, Serialize};

/// Output of the ADM (Automated Decision Making) scoring engine: the
/// quality/relevance/intelligence triple plus their weighted sum.
///
/// Every field is clamped to `[0.0, 1.0]` by the engine before this
/// struct is constructed. On internal failure the engine returns a
/// neutral triple with `error` set rather than propagating a fault;
/// importance scoring degrades gracefully, it never blocks a write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdmResult {
    pub data_quality: f64,
    pub data_relevance: f64,
    pub data_intelligence: f64,
    pub adm_score: f64,
    /// Set only when the engine fell back to the neutral triple after an
    /// internal failure. Absent on a normal computation.
    pub error: Option<String>,
}

impl AdmResult {
    /// The neutral result returned when scoring fails or is skipped.
    pub fn neutral(reason: impl Into<String>) -> Self {
        Self {
            data_quality: 0.5,
            data_relevance: 0.5,
            data_intelligence: 0.5,
            adm_score: 0.5,
            error: Some(reason.into()),
        }
    }
}
