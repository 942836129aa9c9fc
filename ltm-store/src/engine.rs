use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use ltm_adm::{AdmContext, AdmEngine};
use ltm_core::config::{DistanceMetric, StoreConfig};
use ltm_core::constants::MAX_QUERY_LIMIT;
use ltm_core::memory::{Memory, SystemMetadata, ADM_METADATA_KEY};
use ltm_core::models::{
    AdmResult, DedupMode, ProviderConfig, QueryFilters, QueryRequest, QueryResponse, StoreHealth,
    StoreStats,
};
use ltm_core::traits::{EmbeddingModel, FullProvider, ProviderStats};
use ltm_core::vector::cosine_similarity;
use ltm_core::{LtmError, LtmResult};
use ltm_dedup::{DedupCandidate, DedupService};

use crate::builder::ProviderEntry;
use crate::cache::QueryCache;
use crate::export::ExportCursor;
use crate::ranking;
use crate::replication::ReplicationSet;
use crate::request::MemoryRequest;

/// Counters plus per-provider stats, as served to a status endpoint.
#[derive(Debug, Clone)]
pub struct StoreStatsReport {
    pub counters: StoreStats,
    pub providers: Vec<(String, ProviderStats)>,
    pub outstanding_replications: usize,
}

/// The orchestrator fronting every provider.
///
/// Owns the providers, the embedding model, the ADM engine, the dedup
/// service, and the query cache for its lifetime. All shared mutable
/// state (cache, counters) sits behind its own lock; provider-internal
/// concurrency is each provider's own business.
pub struct UnifiedStore {
    dimension: usize,
    primary: Arc<dyn FullProvider>,
    primary_config: ProviderConfig,
    providers: Vec<ProviderEntry>,
    embedding_model: Option<Arc<dyn EmbeddingModel>>,
    adm: AdmEngine,
    dedup: DedupService,
    cache: QueryCache,
    stats: Mutex<StoreStats>,
    replication: ReplicationSet,
    config: StoreConfig,
    metric: DistanceMetric,
}

impl UnifiedStore {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        dimension: usize,
        primary: Arc<dyn FullProvider>,
        primary_config: ProviderConfig,
        providers: Vec<ProviderEntry>,
        embedding_model: Option<Arc<dyn EmbeddingModel>>,
        adm: AdmEngine,
        dedup: DedupService,
        config: StoreConfig,
        metric: DistanceMetric,
        replication_timeout: Duration,
    ) -> Self {
        Self {
            dimension,
            primary,
            primary_config,
            providers,
            embedding_model,
            adm,
            dedup,
            cache: QueryCache::new(
                config.cache_capacity,
                Duration::from_secs(config.cache_ttl_secs),
            ),
            stats: Mutex::new(StoreStats::default()),
            replication: ReplicationSet::new(replication_timeout),
            config,
            metric,
        }
    }

    /// Name of the backend selected as primary at initialization.
    pub fn primary_name(&self) -> &str {
        &self.primary_config.name
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn stats_lock(&self) -> std::sync::MutexGuard<'_, StoreStats> {
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Ingests one memory. The primary write happens-before the
    /// returned `Memory`; replication into secondaries is detached and
    /// may lag arbitrarily.
    pub async fn store_memory(&self, request: MemoryRequest) -> LtmResult<Memory> {
        request.validate()?;

        let embedding = self.resolve_embedding(&request).await?;
        let id = request
            .metadata
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if self.dedup.mode() != DedupMode::Off {
            let candidate = DedupCandidate {
                id: &id,
                content: &request.content,
                embedding: &embedding,
                user_id: request.user_id.as_deref(),
                importance_score: request.importance_score,
            };
            let decision = self.dedup.evaluate(&candidate, self.primary.as_ref()).await;
            if decision.is_duplicate && self.dedup.mode() == DedupMode::Active {
                if let Some(existing_id) = decision.existing_memory_id.as_deref() {
                    tracing::info!(
                        candidate_id = %id,
                        existing_id = %existing_id,
                        "duplicate blocked; returning existing memory"
                    );
                    return self.primary.get_by_id(existing_id).await;
                }
            }
        }

        let (importance, adm_result) = self.resolve_importance(&request, &embedding).await;

        let created_at = Utc::now();
        let mut metadata = request.metadata.clone();
        metadata.insert("id".to_string(), Value::String(id.clone()));
        if let Some(user_id) = &request.user_id {
            metadata.insert("user_id".to_string(), Value::String(user_id.clone()));
        }
        if let Some(conversation_id) = &request.conversation_id {
            metadata.insert("conversation_id".to_string(), Value::String(conversation_id.clone()));
        }
        metadata.insert("importance_score".to_string(), Value::from(importance));
        metadata.insert("created_at".to_string(), Value::String(created_at.to_rfc3339()));
        metadata.insert(
            "content_length".to_string(),
            Value::from(request.content.chars().count() as u64),
        );
        if let Some(adm) = &adm_result {
            if let Ok(value) = serde_json::to_value(adm) {
                metadata.insert(ADM_METADATA_KEY.to_string(), value);
            }
        }

        let stored_id = self
            .store_on_primary(&request.content, &embedding, metadata.clone())
            .await?;

        for entry in &self.providers {
            if entry.config.name != self.primary_config.name && entry.config.enabled {
                self.replication.replicate_store(
                    entry.config.name.clone(),
                    entry.provider.clone(),
                    request.content.clone(),
                    embedding.clone(),
                    metadata.clone(),
                );
            }
        }

        self.stats_lock().record_store();

        let content_length = request.content.chars().count();
        let content_hash = Memory::hash_content(&request.content);
        Ok(Memory {
            id: stored_id,
            content: request.content,
            embedding,
            system: SystemMetadata {
                user_id: request.user_id,
                conversation_id: request.conversation_id,
                content_length,
                adm: adm_result,
            },
            metadata,
            importance_score: importance.into(),
            content_hash,
            created_at,
            last_accessed: created_at,
            access_count: 0,
        })
    }

    async fn resolve_embedding(&self, request: &MemoryRequest) -> LtmResult<Vec<f32>> {
        if let Some(embedding) = &request.embedding {
            if embedding.len() != self.dimension {
                return Err(LtmError::invalid_input(format!(
                    "supplied embedding has dimension {}, expected {}",
                    embedding.len(),
                    self.dimension
                )));
            }
            return Ok(embedding.clone());
        }
        let Some(model) = &self.embedding_model else {
            return Err(LtmError::no_embedding(
                "no embedding supplied and no embedding model configured",
            ));
        };
        let deadline = Duration::from_secs(self.config.operation_timeout_secs);
        match tokio::time::timeout(deadline, model.embed_one(&request.content)).await {
            Ok(result) => result,
            Err(_) => Err(LtmError::Timeout {
                operation: "embedding".to_string(),
                elapsed_secs: deadline.as_secs_f64(),
            }),
        }
    }

    /// Supplied score wins; otherwise ADM; otherwise (ADM disabled or
    /// failed) a plain length + context heuristic. A scoring problem
    /// must never block a write.
    async fn resolve_importance(
        &self,
        request: &MemoryRequest,
        embedding: &[f32],
    ) -> (f64, Option<AdmResult>) {
        if let Some(score) = request.importance_score {
            return (score, None);
        }

        let recent_user_memories = match &request.user_id {
            Some(user_id) => {
                let filters = QueryFilters {
                    user_id: Some(user_id.clone()),
                    ..QueryFilters::default()
                };
                self.primary.query(embedding, 50, &filters).await
            }
            None => Vec::new(),
        };
        let recent_conversation_memories = match &request.conversation_id {
            Some(conversation_id) => {
                let filters = QueryFilters {
                    conversation_id: Some(conversation_id.clone()),
                    ..QueryFilters::default()
                };
                self.primary.query(embedding, 10, &filters).await
            }
            None => Vec::new(),
        };
        let context_similarities: Vec<f64> = recent_conversation_memories
            .iter()
            .filter(|m| !m.embedding.is_empty())
            .map(|m| cosine_similarity(embedding, &m.embedding))
            .collect();

        let ctx = AdmContext {
            content: &request.content,
            metadata: &request.metadata,
            created_at: Utc::now(),
            recent_user_memories: &recent_user_memories,
            recent_conversation_memories: &recent_conversation_memories,
            context_similarities: &context_similarities,
            historical_prediction_performance: 0.0,
        };
        let result = self.adm.score(&ctx, Utc::now());
        if result.error.is_some() {
            (heuristic_importance(request), None)
        } else {
            self.stats_lock().record_adm(result.adm_score);
            (result.adm_score, Some(result))
        }
    }

    async fn store_on_primary(
        &self,
        content: &str,
        embedding: &[f32],
        metadata: HashMap<String, Value>,
    ) -> LtmResult<String> {
        let retries = self.primary_config.retry_count;
        let deadline = self.primary_config.timeout();
        let mut attempt = 0u32;
        loop {
            let outcome =
                tokio::time::timeout(deadline, self.primary.store(content, embedding, metadata.clone()))
                    .await;
            let err = match outcome {
                Ok(Ok(id)) => return Ok(id),
                Ok(Err(e)) => {
                    let retryable = !matches!(
                        e,
                        LtmError::InvalidInput { .. }
                            | LtmError::NotFound { .. }
                            | LtmError::NoEmbedding { .. }
                    );
                    if !retryable {
                        return Err(e);
                    }
                    e
                }
                Err(_) => LtmError::Timeout {
                    operation: "primary store".to_string(),
                    elapsed_secs: deadline.as_secs_f64(),
                },
            };
            if attempt >= retries {
                return Err(LtmError::provider_down(&self.primary_config.name, err.to_string()));
            }
            tracing::warn!(
                provider = %self.primary_config.name,
                attempt,
                error = %err,
                "primary store failed, backing off"
            );
            tokio::time::sleep(Duration::from_millis(100 * 2u64.pow(attempt))).await;
            attempt += 1;
        }
    }

    /// Serves a read. Cache first; then either the recency path (empty
    /// query) or embedding + provider fan-out + rank.
    pub async fn query_memories(&self, request: QueryRequest) -> LtmResult<QueryResponse> {
        if !(0.0..=1.0).contains(&request.min_similarity) {
            return Err(LtmError::invalid_input(format!(
                "min_similarity {} outside [0, 1]",
                request.min_similarity
            )));
        }

        let started = Instant::now();
        let fingerprint = QueryCache::fingerprint(&request);
        if let Some(response) = self.cache.get(&fingerprint) {
            self.stats_lock()
                .record_query(started.elapsed().as_secs_f64() * 1_000.0, &[], true);
            return Ok(response);
        }

        let limit = request.clamped_limit();
        let mut response = if request.is_empty_query() {
            self.recent_response(limit).await
        } else {
            self.similarity_response(&request, limit).await?
        };
        response.elapsed_ms = started.elapsed().as_millis() as u64;

        self.cache.insert(fingerprint, response.clone());
        self.stats_lock().record_query(
            response.elapsed_ms as f64,
            &response.providers_used,
            false,
        );
        Ok(response)
    }

    /// The empty-query path. Similarity operators are undefined over a
    /// zero or near-zero query vector, so an empty query is served by
    /// recency ordering on the primary, falling back to a
    /// small-magnitude (never zero) probe against a secondary.
    async fn recent_response(&self, limit: usize) -> QueryResponse {
        let fetched = self.primary.get_recent(MAX_QUERY_LIMIT, 0).await;
        if !fetched.is_empty() {
            let total_found = fetched.len();
            let mut memories = fetched;
            memories.truncate(limit);
            return QueryResponse {
                memories,
                total_found,
                elapsed_ms: 0,
                providers_used: vec![self.primary_config.name.clone()],
                cache_hit: false,
            };
        }

        let probe: Vec<f32> = vec![1e-3; self.dimension];
        for entry in &self.providers {
            if entry.config.name == self.primary_config.name || !entry.config.enabled {
                continue;
            }
            let results = entry.provider.query(&probe, limit, &QueryFilters::default()).await;
            if !results.is_empty() {
                tracing::warn!(
                    provider = %entry.config.name,
                    "primary recency path returned nothing; served empty query from fallback"
                );
                return QueryResponse {
                    total_found: results.len(),
                    memories: results,
                    elapsed_ms: 0,
                    providers_used: vec![entry.config.name.clone()],
                    cache_hit: false,
                };
            }
        }

        QueryResponse {
            memories: Vec::new(),
            total_found: 0,
            elapsed_ms: 0,
            providers_used: vec![self.primary_config.name.clone()],
            cache_hit: false,
        }
    }

    async fn similarity_response(
        &self,
        request: &QueryRequest,
        limit: usize,
    ) -> LtmResult<QueryResponse> {
        let Some(model) = &self.embedding_model else {
            return Err(LtmError::no_embedding("no embedding model configured for queries"));
        };
        let deadline = Duration::from_secs(self.config.operation_timeout_secs);
        let query_embedding = match tokio::time::timeout(deadline, model.embed_one(&request.query)).await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(LtmError::Timeout {
                    operation: "query embedding".to_string(),
                    elapsed_secs: deadline.as_secs_f64(),
                })
            }
        };

        let selected = self.select_providers(request.provider_allowlist.as_deref());
        if selected.is_empty() {
            return Err(LtmError::invalid_input(
                "provider allow-list matches no enabled provider",
            ));
        }

        let mut gathered: Vec<Memory> = Vec::new();
        let mut providers_used: Vec<String> = Vec::new();

        let mut handles = Vec::with_capacity(selected.len());
        for entry in &selected {
            let provider = entry.provider.clone();
            let embedding = query_embedding.clone();
            let filters = request.filters.clone();
            let per_provider_deadline = entry.config.timeout();
            let name = entry.config.name.clone();
            handles.push((
                name,
                tokio::spawn(async move {
                    tokio::time::timeout(per_provider_deadline, provider.query(&embedding, limit, &filters))
                        .await
                }),
            ));
        }
        for (name, handle) in handles {
            match handle.await {
                Ok(Ok(memories)) => {
                    if !memories.is_empty() {
                        providers_used.push(name);
                    }
                    gathered.extend(memories);
                }
                Ok(Err(_)) => {
                    tracing::warn!(provider = %name, "provider query timed out; dropped from result");
                }
                Err(e) => {
                    tracing::warn!(provider = %name, error = %e, "provider query task failed");
                }
            }
        }

        let (memories, total_found) = ranking::merge_and_rank(
            gathered,
            &query_embedding,
            self.metric,
            request.min_similarity,
            limit,
        );
        Ok(QueryResponse {
            memories,
            total_found,
            elapsed_ms: 0,
            providers_used,
            cache_hit: false,
        })
    }

    fn select_providers(&self, allowlist: Option<&[String]>) -> Vec<&ProviderEntry> {
        match allowlist {
            Some(list) => self
                .providers
                .iter()
                .filter(|e| e.config.enabled && list.contains(&e.config.name))
                .collect(),
            None => self
                .providers
                .iter()
                .filter(|e| e.config.name == self.primary_config.name)
                .collect(),
        }
    }

    pub async fn get_by_id(&self, id: &str) -> LtmResult<Memory> {
        self.primary.get_by_id(id).await
    }

    /// Deletes from the primary synchronously and from every enabled
    /// secondary in the background. The returned flag reflects the
    /// primary only.
    pub async fn delete(&self, id: &str) -> LtmResult<bool> {
        let deleted = self.primary.delete(id).await?;
        for entry in &self.providers {
            if entry.config.name != self.primary_config.name && entry.config.enabled {
                self.replication.replicate_delete(
                    entry.config.name.clone(),
                    entry.provider.clone(),
                    id.to_string(),
                );
            }
        }
        Ok(deleted)
    }

    pub async fn health(&self) -> StoreHealth {
        let mut provider_health = Vec::with_capacity(self.providers.len());
        for entry in &self.providers {
            if entry.config.enabled {
                provider_health.push(entry.provider.health_check().await);
            }
        }
        StoreHealth::from_providers(provider_health, &self.primary_config.name)
    }

    pub async fn stats(&self) -> StoreStatsReport {
        let counters = self.stats_lock().clone();
        let mut providers = Vec::with_capacity(self.providers.len());
        for entry in &self.providers {
            if entry.config.enabled {
                providers.push((entry.config.name.clone(), entry.provider.get_stats().await));
            }
        }
        StoreStatsReport {
            counters,
            providers,
            outstanding_replications: self.replication.outstanding(),
        }
    }

    /// Drops every cached query response and reports how many were held.
    pub fn clear_cache(&self) -> u64 {
        self.cache.clear()
    }

    /// Ingests a batch, running the normal store pipeline per item with
    /// bounded concurrency. Per-item results come back in input order;
    /// one failing item never aborts the rest.
    pub async fn bulk_store(
        self: Arc<Self>,
        requests: Vec<MemoryRequest>,
    ) -> Vec<LtmResult<Memory>> {
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.bulk_concurrency.max(1)));
        let mut handles = Vec::with_capacity(requests.len());
        for request in requests {
            let store = Arc::clone(&self);
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                // The semaphore is never closed, so acquire can't fail;
                // holding the permit for the whole item bounds the batch.
                let _permit = semaphore.acquire().await.ok();
                store.store_memory(request).await
            }));
        }
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(match handle.await {
                Ok(result) => result,
                Err(e) => Err(LtmError::internal(format!("bulk store task failed: {e}"))),
            });
        }
        results
    }

    /// Pages every memory out of the primary, newest first, for backup
    /// and migration tooling.
    pub fn export(&self, page_size: usize) -> ExportCursor {
        ExportCursor::new(self.primary.clone(), page_size)
    }

    /// Non-vector retrieval paths that stay available even when the
    /// similarity index is damaged. Invoked only on explicit request,
    /// never as part of the default query pipeline.
    pub async fn emergency_all(&self, limit: usize) -> Vec<Memory> {
        self.primary.emergency_all(limit).await
    }

    pub async fn emergency_text(&self, query: &str, limit: usize) -> Vec<Memory> {
        self.primary.emergency_text(query, limit).await
    }

    pub async fn emergency_fuzzy(&self, query: &str, limit: usize) -> Vec<Memory> {
        self.primary.emergency_fuzzy(query, limit).await
    }

    /// Flags a dedup audit record as a false positive. The only effect
    /// is the audit record's own `reviewed` flag.
    pub async fn mark_dedup_false_positive(&self, audit_id: &str) -> LtmResult<()> {
        self.dedup.mark_false_positive(audit_id, self.primary.as_ref()).await
    }

    /// Waits for outstanding replication to land without cancelling it.
    pub async fn drain_replication(&self) {
        self.replication.drain().await;
    }

    /// Cancels outstanding replication tasks and waits for them to
    /// drain. Call once at service shutdown.
    pub async fn shutdown(&self) {
        self.replication.shutdown().await;
    }
}

/// Fallback importance when ADM is disabled or failed: content length
/// up to 500 chars plus a small bonus per attached context field.
fn heuristic_importance(request: &MemoryRequest) -> f64 {
    let length_component = (request.content.chars().count() as f64 / 500.0).min(1.0) * 0.4;
    let mut context_component = 0.0;
    if request.user_id.is_some() {
        context_component += 0.1;
    }
    if request.conversation_id.is_some() {
        context_component += 0.1;
    }
    if !request.metadata.is_empty() {
        context_component += 0.1;
    }
    (0.2 + length_component + context_component).clamp(0.0, 1.0)
}
