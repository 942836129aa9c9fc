use serde::{Deserialize, Serialize};

use crate::constants::{DEDUP_REVIEW_AGE_DAYS, DEFAULT_DEDUP_THRESHOLD};
use crate::models::DedupMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub mode: DedupMode,
    pub similarity_threshold: f64,
    pub review_age_days: i64,
    /// Business-rule guard: importance deltas beyond this never count
    /// as a duplicate even with an exact content match above threshold.
    pub importance_delta_guard: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            mode: DedupMode::default(),
            similarity_threshold: DEFAULT_DEDUP_THRESHOLD,
            review_age_days: DEDUP_REVIEW_AGE_DAYS,
            importance_delta_guard: 0.3,
        }
    }
}
