//! Named default values referenced by the per-subsystem config structs.
//! Kept separate from `constants` (used by non-config code paths too)
//! so config defaults can evolve independently.

pub const DEFAULT_PGVECTOR_TABLE: &str = "vector_memories";
pub const DEFAULT_PGVECTOR_INDEX_TYPE: &str = "hnsw";
pub const DEFAULT_HNSW_M: u32 = 16;
pub const DEFAULT_HNSW_EF_CONSTRUCTION: u32 = 64;
pub const DEFAULT_IVFFLAT_LISTS: u32 = 1000;
pub const DEFAULT_DISTANCE_METRIC: &str = "cosine";

pub const DEFAULT_LOCAL_DB_PATH: &str = "ltm_local.sqlite3";
pub const DEFAULT_BRUTE_FORCE_THRESHOLD: usize = 10_000;

pub const DEFAULT_CLOUD_BASE_URL: &str = "https://api.example-cloud-vectors.invalid";

pub const DEFAULT_ADM_WEIGHT_QUALITY: f64 = 0.4;
pub const DEFAULT_ADM_WEIGHT_RELEVANCE: f64 = 0.35;
pub const DEFAULT_ADM_WEIGHT_INTELLIGENCE: f64 = 0.25;
pub const DEFAULT_CONSOLIDATION_THRESHOLD: f64 = 0.75;

pub const DEFAULT_LOG_LEVEL: &str = "info";
