use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{MAX_QUERY_LIMIT, MIN_QUERY_LIMIT};
use crate::memory::Memory;

/// Structured filters recognized by every provider. Keys outside this
/// set (provider-specific extensions, e.g. `entity_name`) are carried
/// in `extra` and ignored by providers that don't understand them,
/// never rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryFilters {
    pub user_id: Option<String>,
    pub conversation_id: Option<String>,
    pub min_importance: Option<f64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

impl QueryFilters {
    /// Deterministic string form used by the cache fingerprint:
    /// sorted so that equal filter sets always serialize identically
    /// regardless of insertion order.
    pub fn canonical_string(&self) -> String {
        let mut extra_keys: Vec<_> = self.extra.keys().cloned().collect();
        extra_keys.sort();
        let extra_str: Vec<String> = extra_keys
            .iter()
            .map(|k| format!("{k}={}", self.extra[k]))
            .collect();
        format!(
            "user_id={:?}|conversation_id={:?}|min_importance={:?}|start_time={:?}|end_time={:?}|extra={}",
            self.user_id,
            self.conversation_id,
            self.min_importance,
            self.start_time,
            self.end_time,
            extra_str.join(",")
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// May be empty or whitespace-only; this routes the request onto the
    /// empty-query path instead of the similarity path.
    pub query: String,
    pub limit: usize,
    pub min_similarity: f64,
    #[serde(default)]
    pub filters: QueryFilters,
    /// When present, only these providers are eligible; otherwise the
    /// default provider set (`[primary]`) is used.
    pub provider_allowlist: Option<Vec<String>>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: 10,
            min_similarity: 0.0,
            filters: QueryFilters::default(),
            provider_allowlist: None,
        }
    }

    pub fn is_empty_query(&self) -> bool {
        self.query.trim().is_empty()
    }

    pub fn clamped_limit(&self) -> usize {
        self.limit.clamp(MIN_QUERY_LIMIT, MAX_QUERY_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub memories: Vec<Memory>,
    pub total_found: usize,
    pub elapsed_ms: u64,
    pub providers_used: Vec<String>,
    /// True when this response was served from the query cache without
    /// contacting any provider. Exposed so callers can distinguish
    /// fresh results from results that may be up to the cache TTL stale.
    pub cache_hit: bool,
}

impl QueryResponse {
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}
