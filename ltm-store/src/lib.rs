//! # ltm-store
//!
//! The unified vector store: the one component callers talk to. Owns
//! the set of providers, the embedding model, the ADM scoring engine,
//! the dedup service, and the query cache, and orchestrates them into
//! the store/query/health operations the HTTP layer exposes.
//!
//! Writes go to the designated primary and are acknowledged as soon as
//! the primary accepts them; replication into every other enabled
//! provider happens in tracked background tasks that service shutdown
//! can await or cancel. Reads consult the TTL-bounded query cache
//! first, route empty queries onto the recency path (a zero or
//! near-zero vector must never reach a similarity operator), and
//! otherwise fan out across the selected providers, merging partial
//! results.

mod builder;
mod cache;
mod engine;
mod export;
mod init;
mod ranking;
mod replication;
mod request;

pub use builder::StoreBuilder;
pub use engine::{StoreStatsReport, UnifiedStore};
pub use export::ExportCursor;
pub use init::init_from_config;
pub use request::MemoryRequest;
