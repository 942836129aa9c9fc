use serde::{Deserialize, Serialize};

use crate::config::defaults;

/// ADM scoring engine configuration. `weight_quality + weight_relevance
/// + weight_intelligence` must sum to 1.0; validated at load time by
/// the engine, not here, so a malformed override is reported with
/// context rather than silently renormalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmConfig {
    pub enabled: bool,
    pub weight_quality: f64,
    pub weight_relevance: f64,
    pub weight_intelligence: f64,
    pub consolidation_threshold: f64,
}

impl Default for AdmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight_quality: defaults::DEFAULT_ADM_WEIGHT_QUALITY,
            weight_relevance: defaults::DEFAULT_ADM_WEIGHT_RELEVANCE,
            weight_intelligence: defaults::DEFAULT_ADM_WEIGHT_INTELLIGENCE,
            consolidation_threshold: defaults::DEFAULT_CONSOLIDATION_THRESHOLD,
        }
    }
}

impl AdmConfig {
    pub fn weights_sum_to_one(&self) -> bool {
        let sum = self.weight_quality + self.weight_relevance + self.weight_intelligence;
        (sum - 1.0).abs() < 1e-6
    }
}
