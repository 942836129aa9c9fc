use chrono::{DateTime, Utc};

use ltm_core::config::AdmConfig;
use ltm_core::models::{AdmResult, EvolutionHint};

use crate::formula::{self, AdmContext};

/// Scores memory candidates against the Data Quality / Data Relevance /
/// Data Intelligence triple and derives an evolution hint from the
/// result. Stateless beyond its configuration: every call is pure given
/// its context and `now`.
#[derive(Debug, Clone)]
pub struct AdmEngine {
    config: AdmConfig,
}

impl AdmEngine {
    pub fn new(config: AdmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdmConfig {
        &self.config
    }

    /// Scores a candidate. Never fails: a disabled engine or any
    /// internal error degrades to `AdmResult::neutral` with the reason
    /// recorded in `error`, so a scoring problem never blocks a store.
    pub fn score(&self, ctx: &AdmContext, now: DateTime<Utc>) -> AdmResult {
        if !self.config.enabled {
            return AdmResult::neutral("ADM scoring disabled");
        }
        match formula::compute(ctx, &self.config, now) {
            Ok(result) => result,
            Err(reason) => {
                tracing::warn!(reason = %reason, "ADM scoring failed, falling back to neutral triple");
                AdmResult::neutral(reason)
            }
        }
    }

    pub fn evolution_hint(&self, result: &AdmResult, access_count: u64, age_days: f64) -> EvolutionHint {
        crate::evolution::decide(result, access_count, age_days, self.config.consolidation_threshold)
    }
}
