pub mod adm_config;
pub mod defaults;
pub mod dedup_config;
pub mod embedding_config;
pub mod provider_configs;
pub mod store_config;

pub use adm_config::AdmConfig;
pub use dedup_config::DedupConfig;
pub use embedding_config::{EmbeddingBackend, EmbeddingConfig};
pub use provider_configs::{CloudConfig, DistanceMetric, LocalConfig, PgVectorConfig, VectorIndexType};
pub use store_config::StoreConfig;

use serde::{Deserialize, Serialize};

/// Root configuration, aggregating every subsystem. Built by
/// `LtmConfig::from_env`, which reads the recognized environment
/// variables and falls back to defaults for anything absent. An absent
/// secret must never prevent startup as long as at least one provider
/// is left enabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LtmConfig {
    pub pgvector: PgVectorConfig,
    pub local: LocalConfig,
    pub cloud: CloudConfig,
    pub embedding: EmbeddingConfig,
    pub adm: AdmConfig,
    pub dedup: DedupConfig,
    pub store: StoreConfig,
}

impl LtmConfig {
    /// Reads recognized environment variables, semantically not
    /// syntactically (absence is normal, not an error). Variables not
    /// present leave the corresponding field at its default.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(host) = std::env::var("LTM_PG_HOST") {
            cfg.pgvector.host = host;
        }
        if let Ok(port) = std::env::var("LTM_PG_PORT") {
            if let Ok(port) = port.parse() {
                cfg.pgvector.port = port;
            }
        }
        if let Ok(db) = std::env::var("LTM_PG_DATABASE") {
            cfg.pgvector.database = db;
        }
        if let Ok(user) = std::env::var("LTM_PG_USER") {
            cfg.pgvector.user = user;
        }
        if std::env::var("LTM_PG_DISABLE").is_ok() {
            cfg.pgvector.enabled = false;
        }

        if let Ok(path) = std::env::var("LTM_LOCAL_DB_PATH") {
            cfg.local.db_path = path;
        }

        // A configured API key is the signal to use the real remote
        // model; without one the deterministic mock keeps the service
        // bootable.
        if std::env::var(&cfg.embedding.api_key_env).is_ok() {
            cfg.embedding.backend = EmbeddingBackend::Remote;
        }
        if let Ok(base) = std::env::var("LTM_EMBEDDING_API_BASE") {
            cfg.embedding.api_base = Some(base);
        }
        if let Ok(dim) = std::env::var("LTM_EMBEDDING_DIM") {
            if let Ok(dim) = dim.parse() {
                cfg.embedding.dimension = dim;
            }
        }

        if std::env::var("LTM_CLOUD_ENABLE").is_ok() {
            cfg.cloud.enabled = true;
        }
        if let Ok(url) = std::env::var("LTM_CLOUD_BASE_URL") {
            cfg.cloud.base_url = url;
        }

        if let Ok(ttl) = std::env::var("LTM_CACHE_TTL_SECS") {
            if let Ok(ttl) = ttl.parse() {
                cfg.store.cache_ttl_secs = ttl;
            }
        }
        if let Ok(cap) = std::env::var("LTM_CACHE_CAPACITY") {
            if let Ok(cap) = cap.parse() {
                cfg.store.cache_capacity = cap;
            }
        }
        if let Ok(min) = std::env::var("LTM_PG_POOL_MIN") {
            if let Ok(min) = min.parse() {
                cfg.pgvector.pool_min = min;
            }
        }
        if let Ok(max) = std::env::var("LTM_PG_POOL_MAX") {
            if let Ok(max) = max.parse() {
                cfg.pgvector.pool_max = max;
            }
        }
        if let Ok(level) = std::env::var("LTM_LOG_LEVEL") {
            cfg.store.log_level = level;
        }

        cfg
    }
}
