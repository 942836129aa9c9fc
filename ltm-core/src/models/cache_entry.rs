use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::QueryResponse;

/// A cached query response keyed by a deterministic fingerprint of the
/// request that produced it. The store evicts entries once `stored_at`
/// is older than the cache TTL, and oldest-first once capacity is
/// exceeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub response: QueryResponse,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(fingerprint: impl Into<String>, response: QueryResponse) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            response,
            stored_at: Utc::now(),
        }
    }

    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.stored_at
    }
}
