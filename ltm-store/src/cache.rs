use std::time::Duration;

use moka::sync::Cache;

use ltm_core::models::{CacheEntry, QueryRequest, QueryResponse};

/// TTL-bounded query cache. Entries are immutable after insert and
/// never invalidated by writes: readers accept up to the TTL of
/// staleness in exchange for never touching a provider on a repeat
/// query. The `cache_hit` flag on served responses lets callers tell
/// the difference.
pub(crate) struct QueryCache {
    inner: Cache<String, CacheEntry>,
}

impl QueryCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Deterministic fingerprint over every semantically relevant
    /// request field. Filters and the allow-list are canonicalized so
    /// equal requests hash identically regardless of construction order.
    pub fn fingerprint(request: &QueryRequest) -> String {
        let allowlist = request
            .provider_allowlist
            .as_ref()
            .map(|list| {
                let mut sorted = list.clone();
                sorted.sort();
                sorted.join(",")
            })
            .unwrap_or_default();
        let canonical = format!(
            "query={}|limit={}|min_similarity={}|filters={}|allowlist={}",
            request.query,
            request.clamped_limit(),
            request.min_similarity,
            request.filters.canonical_string(),
            allowlist,
        );
        blake3::hash(canonical.as_bytes()).to_hex().to_string()
    }

    pub fn get(&self, fingerprint: &str) -> Option<QueryResponse> {
        let entry = self.inner.get(fingerprint)?;
        let mut response = entry.response;
        response.cache_hit = true;
        Some(response)
    }

    pub fn insert(&self, fingerprint: String, response: QueryResponse) {
        self.inner
            .insert(fingerprint.clone(), CacheEntry::new(fingerprint, response));
    }

    /// Drops every entry and returns how many were held.
    pub fn clear(&self) -> u64 {
        self.inner.run_pending_tasks();
        let count = self.inner.entry_count();
        self.inner.invalidate_all();
        self.inner.run_pending_tasks();
        count
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use ltm_core::models::QueryFilters;

    use super::*;

    fn request(query: &str) -> QueryRequest {
        QueryRequest::new(query)
    }

    fn response() -> QueryResponse {
        QueryResponse {
            memories: Vec::new(),
            total_found: 0,
            elapsed_ms: 3,
            providers_used: vec!["pgvector".to_string()],
            cache_hit: false,
        }
    }

    #[test]
    fn identical_requests_share_a_fingerprint() {
        assert_eq!(
            QueryCache::fingerprint(&request("hello")),
            QueryCache::fingerprint(&request("hello"))
        );
        assert_ne!(
            QueryCache::fingerprint(&request("hello")),
            QueryCache::fingerprint(&request("goodbye"))
        );
    }

    #[test]
    fn extra_filter_order_does_not_change_the_fingerprint() {
        let mut a = request("q");
        let mut b = request("q");
        let mut extra_a = HashMap::new();
        extra_a.insert("entity_name".to_string(), serde_json::json!("acme"));
        extra_a.insert("topic".to_string(), serde_json::json!("rust"));
        let mut extra_b = HashMap::new();
        extra_b.insert("topic".to_string(), serde_json::json!("rust"));
        extra_b.insert("entity_name".to_string(), serde_json::json!("acme"));
        a.filters = QueryFilters { extra: extra_a, ..QueryFilters::default() };
        b.filters = QueryFilters { extra: extra_b, ..QueryFilters::default() };

        assert_eq!(QueryCache::fingerprint(&a), QueryCache::fingerprint(&b));
    }

    #[test]
    fn allowlist_is_part_of_the_fingerprint() {
        let mut a = request("q");
        a.provider_allowlist = Some(vec!["local".to_string()]);
        let b = request("q");
        assert_ne!(QueryCache::fingerprint(&a), QueryCache::fingerprint(&b));
    }

    #[test]
    fn served_entries_are_marked_as_cache_hits() {
        let cache = QueryCache::new(16, Duration::from_secs(300));
        let key = QueryCache::fingerprint(&request("q"));
        cache.insert(key.clone(), response());

        let served = cache.get(&key).unwrap();
        assert!(served.cache_hit);
    }

    #[test]
    fn clear_reports_the_entry_count() {
        let cache = QueryCache::new(16, Duration::from_secs(300));
        cache.insert("a".to_string(), response());
        cache.insert("b".to_string(), response());
        assert_eq!(cache.clear(), 2);
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn entries_expire_after_the_ttl() {
        let cache = QueryCache::new(16, Duration::from_millis(10));
        cache.insert("k".to_string(), response());
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get("k").is_none());
    }
}
