use serde::{Deserialize, Serialize};

/// Deduplication operating mode. `OFF` skips the pipeline entirely,
/// `LogOnly` records decisions without blocking a write, `Active`
/// short-circuits a `store` call when a duplicate is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    Off,
    LogOnly,
    Active,
}

impl Default for DedupMode {
    fn default() -> Self {
        Self::Off
    }
}

/// Outcome of running a candidate through the deduplication pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupDecision {
    pub is_duplicate: bool,
    pub existing_memory_id: Option<String>,
    pub confidence: f64,
    pub reason: String,
    pub content_hash: String,
    pub similarity_score: Option<f64>,
}

impl DedupDecision {
    pub fn unique(content_hash: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            is_duplicate: false,
            existing_memory_id: None,
            confidence: 0.0,
            reason: reason.into(),
            content_hash: content_hash.into(),
            similarity_score: None,
        }
    }

    pub fn duplicate(
        existing_id: impl Into<String>,
        confidence: f64,
        reason: impl Into<String>,
        content_hash: impl Into<String>,
        similarity_score: Option<f64>,
    ) -> Self {
        Self {
            is_duplicate: true,
            existing_memory_id: Some(existing_id.into()),
            confidence,
            reason: reason.into(),
            content_hash: content_hash.into(),
            similarity_score,
        }
    }

    /// Fail-open result: any internal dedup error degrades to "not a
    /// duplicate" rather than blocking the write.
    pub fn failed_open(content_hash: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            is_duplicate: false,
            existing_memory_id: None,
            confidence: 0.0,
            reason: format!("dedup error (failed open): {}", error.into()),
            content_hash: content_hash.into(),
            similarity_score: None,
        }
    }
}
