use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Running counters maintained by the unified store. Cheap to update
/// (plain integer/float arithmetic behind an atomic or mutex at the
/// call site) and cheap to snapshot for a status endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_stores: u64,
    pub total_queries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub provider_usage: HashMap<String, u64>,
    pub avg_query_time_ms: f64,
    pub adm_calculations: u64,
    pub avg_adm_score: f64,
}

impl StoreStats {
    /// Folds one more query's elapsed time into the running average
    /// using the standard incremental-mean update, avoiding the need to
    /// retain every sample. `providers` is every provider that served
    /// part of this query (empty for a pure cache hit).
    pub fn record_query(&mut self, elapsed_ms: f64, providers: &[String], cache_hit: bool) {
        self.total_queries += 1;
        if cache_hit {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }
        for provider in providers {
            *self.provider_usage.entry(provider.clone()).or_insert(0) += 1;
        }
        let n = self.total_queries as f64;
        self.avg_query_time_ms += (elapsed_ms - self.avg_query_time_ms) / n;
    }

    pub fn record_adm(&mut self, score: f64) {
        self.adm_calculations += 1;
        let n = self.adm_calculations as f64;
        self.avg_adm_score += (score - self.avg_adm_score) / n;
    }

    pub fn record_store(&mut self) {
        self.total_stores += 1;
    }

    pub fn cache_hit_rate(&self) -> f64 {
        if self.total_queries == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_queries as f64
        }
    }
}
