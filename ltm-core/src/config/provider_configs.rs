use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::constants::{DEFAULT_PG_POOL_MAX, DEFAULT_PG_POOL_MIN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    Cosine,
    L2,
    InnerProduct,
}

impl Default for DistanceMetric {
    fn default() -> Self {
        Self::Cosine
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorIndexType {
    Hnsw,
    IvfFlat,
}

impl Default for VectorIndexType {
    fn default() -> Self {
        Self::Hnsw
    }
}

/// DSN fields kept apart rather than a single connection string, so
/// individual pieces can be overridden from distinct environment
/// variables without reconstructing the whole string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PgVectorConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    /// Never serialized back out in logs; read once at pool
    /// construction.
    pub password_env: String,
    pub table_name: String,
    pub index_type: VectorIndexType,
    pub distance_metric: DistanceMetric,
    pub pool_min: usize,
    pub pool_max: usize,
}

impl Default for PgVectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_string(),
            port: 5432,
            database: "ltm".to_string(),
            user: "ltm".to_string(),
            password_env: "LTM_PG_PASSWORD".to_string(),
            table_name: defaults::DEFAULT_PGVECTOR_TABLE.to_string(),
            index_type: VectorIndexType::default(),
            distance_metric: DistanceMetric::default(),
            pool_min: DEFAULT_PG_POOL_MIN,
            pool_max: DEFAULT_PG_POOL_MAX,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub enabled: bool,
    pub db_path: String,
    /// Corpus size above which the provider switches from brute-force
    /// cosine scan to the approximate index.
    pub brute_force_threshold: usize,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_path: defaults::DEFAULT_LOCAL_DB_PATH.to_string(),
            brute_force_threshold: defaults::DEFAULT_BRUTE_FORCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key_env: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: defaults::DEFAULT_CLOUD_BASE_URL.to_string(),
            api_key_env: "LTM_CLOUD_API_KEY".to_string(),
        }
    }
}
