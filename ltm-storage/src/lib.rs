//! # ltm-storage
//!
//! The two always-available vector providers: [`pgvector`] (PostgreSQL +
//! the `vector` extension, the primary backend) and [`local`] (an
//! embedded SQLite fallback that keeps the service usable even when no
//! database server is reachable). Both implement the full capability
//! set from `ltm_core::traits`: `VectorProvider`, `RecentAccess`,
//! `ContentHashLookup`, `DedupAudit`, and `EmergencySearch`.

mod common;
pub mod local;
pub mod pgvector;

use ltm_core::LtmError;

/// Maps a lower-level storage error into the shared taxonomy. Kept as
/// a free function rather than a `From` impl, since the source types
/// (`rusqlite::Error`, `tokio_postgres::Error`) don't belong to this
/// crate.
pub(crate) fn to_internal_err(context: &str, e: impl std::fmt::Display) -> LtmError {
    LtmError::internal(format!("{context}: {e}"))
}
