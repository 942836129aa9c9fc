use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::LtmResult;
use crate::memory::Memory;
use crate::models::{DedupDecision, ProviderHealth, QueryFilters};

/// Snapshot returned by `get_stats`: health plus the optional
/// capabilities this provider instance actually implements, so callers
/// can introspect without downcasting.
#[derive(Debug, Clone)]
pub struct ProviderStats {
    pub health: ProviderHealth,
    pub features: Vec<&'static str>,
}

/// Contract every backend must satisfy. Capability beyond this base
/// (recent-access for the empty-query path, hash lookup for dedup,
/// audit logging, emergency search) is expressed as separate traits a
/// provider may additionally implement, checked explicitly by the
/// orchestrator rather than probed via duck typing.
#[async_trait]
pub trait VectorProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Persists `content`/`embedding`/`metadata` and returns the
    /// assigned id. If `metadata` carries an `id` key the call is
    /// idempotent on re-invocation with that id; otherwise a fresh id
    /// is assigned. Fatal (propagates an error) once retries are
    /// exhausted.
    async fn store(
        &self,
        content: &str,
        embedding: &[f32],
        metadata: HashMap<String, Value>,
    ) -> LtmResult<String>;

    /// Returns up to `limit` memories ordered by descending similarity.
    /// Non-fatal provider failure returns an empty vector rather than
    /// an error, so the orchestrator can aggregate partial results
    /// across providers.
    async fn query(&self, query_embedding: &[f32], limit: usize, filters: &QueryFilters) -> Vec<Memory>;

    /// Direct lookup by id. `NotFound` when the id is unknown to this
    /// provider.
    async fn get_by_id(&self, id: &str) -> LtmResult<Memory>;

    /// Removes a memory by id. Returns whether a row was actually
    /// deleted; deleting an unknown id is not an error.
    async fn delete(&self, id: &str) -> LtmResult<bool>;

    async fn health_check(&self) -> ProviderHealth;

    async fn get_stats(&self) -> ProviderStats;
}

/// Bypasses similarity search entirely: required for the empty-query
/// path, where sending a zero or near-zero vector into a similarity
/// operator would produce undefined (possibly NaN) ordering.
#[async_trait]
pub trait RecentAccess: VectorProvider {
    async fn get_recent(&self, limit: usize, offset: usize) -> Vec<Memory>;
}

/// Exact-match dedup support: a direct lookup by content hash, backing
/// stage 1 of the deduplication pipeline.
#[async_trait]
pub trait ContentHashLookup: VectorProvider {
    async fn lookup_by_hash(&self, content_hash: &str) -> Option<Memory>;
}

/// Appends a dedup decision to a provider-owned audit log. Distinct
/// from `ContentHashLookup` because a read replica may support lookups
/// without owning the audit trail.
#[async_trait]
pub trait DedupAudit: VectorProvider {
    /// Returns the generated audit record id.
    async fn record_decision(&self, candidate_id: &str, decision: &DedupDecision) -> LtmResult<String>;

    /// Flags a past decision as a false positive. Only mutates the
    /// audit record's `reviewed` flag; does not feed back into scoring.
    async fn mark_false_positive(&self, audit_id: &str) -> LtmResult<()>;
}

/// A provider capable of serving as the dedup pipeline's and Unified
/// Store's primary: the full capability set beyond the base contract.
pub trait FullProvider: VectorProvider + RecentAccess + ContentHashLookup + DedupAudit + EmergencySearch {}

impl<T> FullProvider for T where T: VectorProvider + RecentAccess + ContentHashLookup + DedupAudit + EmergencySearch {}

/// Non-vector retrieval paths that remain available even if the
/// similarity index itself is damaged or unreachable.
#[async_trait]
pub trait EmergencySearch: VectorProvider {
    async fn emergency_all(&self, limit: usize) -> Vec<Memory>;
    async fn emergency_text(&self, query: &str, limit: usize) -> Vec<Memory>;
    async fn emergency_fuzzy(&self, query: &str, limit: usize) -> Vec<Memory>;
}
