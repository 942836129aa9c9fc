use serde::{Deserialize, Serialize};

use crate::constants::{
    CACHE_TTL_SECS, DEFAULT_BULK_CONCURRENCY, DEFAULT_CACHE_CAPACITY,
    DEFAULT_OPERATION_TIMEOUT_SECS, DEFAULT_REPLICATION_TIMEOUT_SECS,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
    pub operation_timeout_secs: u64,
    pub replication_timeout_secs: u64,
    pub bulk_concurrency: usize,
    pub log_level: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: CACHE_TTL_SECS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
            replication_timeout_secs: DEFAULT_REPLICATION_TIMEOUT_SECS,
            bulk_concurrency: DEFAULT_BULK_CONCURRENCY,
            log_level: super::defaults::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}
