//! # ltm-core
//!
//! Foundation crate for the long-term memory service.
//! Defines the `Memory` data model, the `VectorProvider`/`EmbeddingModel`
//! capability traits, the error taxonomy, and shared configuration.
//! Every other crate in the workspace depends on this one.

pub mod config;
pub mod constants;
pub mod errors;
pub mod memory;
pub mod models;
pub mod traits;
pub mod vector;

pub use config::LtmConfig;
pub use errors::{LtmError, LtmResult};
pub use memory::{ImportanceScore, Memory, SystemMetadata};
pub use models::{
    AdmResult, CacheEntry, DedupDecision, DedupMode, EvolutionHint, EvolutionStrategy,
    HealthStatus, ProviderConfig, ProviderHealth, QueryFilters, QueryRequest, QueryResponse,
    StoreHealth, StoreStats,
};
pub use traits::{
    ContentHashLookup, DedupAudit, EmbeddingModel, EmergencySearch, ProviderStats, RecentAccess,
    VectorProvider,
};
