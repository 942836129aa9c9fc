//! End-to-end tests of the unified store over the embedded local
//! provider, with a vocabulary-axis embedding model so similarity
//! behaves predictably without a real model.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use ltm_core::config::{DedupConfig, StoreConfig};
use ltm_core::memory::Memory;
use ltm_core::models::{
    DedupMode, ProviderConfig, ProviderHealth, QueryFilters, QueryRequest,
};
use ltm_core::traits::{EmbeddingModel, ProviderStats, VectorProvider};
use ltm_core::{LtmError, LtmResult};
use ltm_dedup::DedupService;
use ltm_storage::local::LocalProvider;
use ltm_store::{MemoryRequest, StoreBuilder, UnifiedStore};

const DIMENSION: usize = 5;

/// Maps words onto four topic axes plus a constant bias axis, so texts
/// that share vocabulary get high cosine similarity and everything has
/// a non-zero vector.
struct VocabularyEmbedding;

const AXES: &[&[&str]] = &[
    &["cat", "cats", "feline", "kitten", "purr", "purrs"],
    &["sound", "sounds", "noise", "meow"],
    &["dog", "dogs", "bark", "barks"],
    &["car", "cars", "drive", "drives", "road"],
];

#[async_trait]
impl EmbeddingModel for VocabularyEmbedding {
    async fn embed_one(&self, text: &str) -> LtmResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(LtmError::invalid_input("empty input"));
        }
        let mut vector = vec![0.0_f32; DIMENSION];
        for word in text.to_lowercase().split_whitespace() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric());
            for (axis, vocabulary) in AXES.iter().enumerate() {
                if vocabulary.contains(&word) {
                    vector[axis] += 1.0;
                }
            }
        }
        vector[DIMENSION - 1] = 0.1;
        Ok(vector)
    }

    async fn embed_many(&self, texts: &[String]) -> LtmResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed_one(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }
}

fn build_store(dedup_mode: DedupMode) -> Arc<UnifiedStore> {
    let primary = Arc::new(LocalProvider::open_in_memory(DIMENSION).unwrap());
    let store = StoreBuilder::new(DIMENSION)
        .primary(ProviderConfig::new("local"), primary)
        .embedding_model(Arc::new(VocabularyEmbedding))
        .dedup_service(DedupService::new(DedupConfig {
            mode: dedup_mode,
            ..DedupConfig::default()
        }))
        .store_config(StoreConfig::default())
        .build()
        .unwrap();
    Arc::new(store)
}

#[tokio::test]
async fn empty_query_returns_most_recent_first() {
    let store = build_store(DedupMode::Off);
    for i in 0..10 {
        store
            .store_memory(MemoryRequest::new(format!("m{i}")))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(3)).await;
    }

    let mut request = QueryRequest::new("");
    request.limit = 5;
    let response = store.query_memories(request).await.unwrap();

    let contents: Vec<&str> = response.memories.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["m9", "m8", "m7", "m6", "m5"]);
    assert!(response.total_found >= 10);
    assert_eq!(response.providers_used, vec!["local".to_string()]);
    assert!(!response.cache_hit);
}

#[tokio::test]
async fn similarity_ranking_puts_the_closest_content_first() {
    let store = build_store(DedupMode::Off);
    for content in ["cats purr", "dogs bark", "cars drive"] {
        store.store_memory(MemoryRequest::new(content)).await.unwrap();
    }

    let mut request = QueryRequest::new("feline sounds");
    request.limit = 3;
    request.min_similarity = 0.0;
    let response = store.query_memories(request).await.unwrap();

    assert!(!response.memories.is_empty());
    assert_eq!(response.memories[0].content, "cats purr");
}

#[tokio::test]
async fn active_dedup_returns_the_existing_memory_without_a_new_row() {
    let store = build_store(DedupMode::Active);
    let first = store
        .store_memory(MemoryRequest::new("Hello, World!"))
        .await
        .unwrap();
    let second = store
        .store_memory(MemoryRequest::new("  hello, world!  "))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);

    let response = store.query_memories(QueryRequest::new("")).await.unwrap();
    assert_eq!(response.total_found, 1);
}

#[tokio::test]
async fn log_only_dedup_lets_the_duplicate_through() {
    let store = build_store(DedupMode::LogOnly);
    let first = store
        .store_memory(MemoryRequest::new("Hello, World!"))
        .await
        .unwrap();
    let second = store
        .store_memory(MemoryRequest::new("hello, world!"))
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn user_filter_returns_only_that_users_memories() {
    let store = build_store(DedupMode::Off);
    for i in 0..20 {
        store
            .store_memory(MemoryRequest::new(format!("note {i} alpha")).with_user("A"))
            .await
            .unwrap();
        store
            .store_memory(MemoryRequest::new(format!("note {i} beta")).with_user("B"))
            .await
            .unwrap();
    }

    let mut request = QueryRequest::new("note");
    request.limit = 50;
    request.filters = QueryFilters {
        user_id: Some("A".to_string()),
        ..QueryFilters::default()
    };
    let response = store.query_memories(request).await.unwrap();

    assert_eq!(response.memories.len(), 20);
    assert!(response
        .memories
        .iter()
        .all(|m| m.system.user_id.as_deref() == Some("A")));
}

#[tokio::test]
async fn repeated_query_is_served_from_cache() {
    let store = build_store(DedupMode::Off);
    store.store_memory(MemoryRequest::new("cats purr")).await.unwrap();

    let request = QueryRequest::new("feline sounds");
    let first = store.query_memories(request.clone()).await.unwrap();
    assert!(!first.cache_hit);

    let second = store.query_memories(request).await.unwrap();
    assert!(second.cache_hit);
    let first_ids: Vec<&str> = first.memories.iter().map(|m| m.id.as_str()).collect();
    let second_ids: Vec<&str> = second.memories.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(first_ids, second_ids);

    let report = store.stats().await;
    assert_eq!(report.counters.cache_hits, 1);
    assert_eq!(report.counters.total_queries, 2);

    assert!(store.clear_cache() >= 1);
    let third = store
        .query_memories(QueryRequest::new("feline sounds"))
        .await
        .unwrap();
    assert!(!third.cache_hit);
}

/// A secondary whose backend always fails; its query contract degrades
/// to empty results instead of raising.
struct BrokenProvider;

#[async_trait]
impl VectorProvider for BrokenProvider {
    fn name(&self) -> &str {
        "broken"
    }

    async fn store(&self, _: &str, _: &[f32], _: HashMap<String, serde_json::Value>) -> LtmResult<String> {
        Err(LtmError::ApiError {
            service: "broken".to_string(),
            reason: "backend unreachable".to_string(),
        })
    }

    async fn query(&self, _: &[f32], _: usize, _: &QueryFilters) -> Vec<Memory> {
        Vec::new()
    }

    async fn get_by_id(&self, id: &str) -> LtmResult<Memory> {
        Err(LtmError::not_found(id))
    }

    async fn delete(&self, _: &str) -> LtmResult<bool> {
        Ok(false)
    }

    async fn health_check(&self) -> ProviderHealth {
        ProviderHealth::unhealthy("broken", ltm_core::models::HealthStatus::Error, "backend unreachable")
    }

    async fn get_stats(&self) -> ProviderStats {
        ProviderStats {
            health: self.health_check().await,
            features: vec![],
        }
    }
}

#[tokio::test]
async fn read_failover_drops_the_broken_provider_from_the_result() {
    let primary = Arc::new(LocalProvider::open_in_memory(DIMENSION).unwrap());
    let store = StoreBuilder::new(DIMENSION)
        .primary(ProviderConfig::new("local"), primary)
        .secondary(ProviderConfig::new("broken"), Arc::new(BrokenProvider))
        .embedding_model(Arc::new(VocabularyEmbedding))
        .build()
        .unwrap();

    store.store_memory(MemoryRequest::new("cats purr")).await.unwrap();

    let mut request = QueryRequest::new("feline sounds");
    request.provider_allowlist = Some(vec!["local".to_string(), "broken".to_string()]);
    let response = store.query_memories(request).await.unwrap();

    assert!(!response.memories.is_empty());
    assert_eq!(response.providers_used, vec!["local".to_string()]);
}

#[tokio::test]
async fn store_then_get_by_id_round_trips() {
    let store = build_store(DedupMode::Off);
    let stored = store
        .store_memory(
            MemoryRequest::new("the database migration needs review")
                .with_user("alice")
                .with_conversation("conv-7")
                .with_importance(0.8)
                .with_metadata("topic", serde_json::json!("ops")),
        )
        .await
        .unwrap();

    let fetched = store.get_by_id(&stored.id).await.unwrap();
    assert_eq!(fetched.content, stored.content);
    assert_eq!(fetched.importance_score.value(), 0.8);
    assert_eq!(fetched.system.user_id.as_deref(), Some("alice"));
    assert_eq!(fetched.metadata.get("topic"), Some(&serde_json::json!("ops")));
    assert!(fetched.access_count >= 1);
}

#[tokio::test]
async fn missing_id_is_not_found_and_delete_reports_whether_a_row_went() {
    let store = build_store(DedupMode::Off);
    assert!(matches!(
        store.get_by_id("no-such-id").await,
        Err(LtmError::NotFound { .. })
    ));

    let stored = store.store_memory(MemoryRequest::new("short lived")).await.unwrap();
    assert!(store.delete(&stored.id).await.unwrap());
    assert!(!store.delete(&stored.id).await.unwrap());
    assert!(matches!(
        store.get_by_id(&stored.id).await,
        Err(LtmError::NotFound { .. })
    ));
}

#[tokio::test]
async fn supplied_embedding_must_match_the_dimension() {
    let store = build_store(DedupMode::Off);
    let mut request = MemoryRequest::new("some content");
    request.embedding = Some(vec![0.1, 0.2]);
    assert!(matches!(
        store.store_memory(request).await,
        Err(LtmError::InvalidInput { .. })
    ));
}

#[tokio::test]
async fn no_model_and_no_embedding_is_a_no_embedding_error() {
    let primary = Arc::new(LocalProvider::open_in_memory(DIMENSION).unwrap());
    let store = StoreBuilder::new(DIMENSION)
        .primary(ProviderConfig::new("local"), primary)
        .build()
        .unwrap();

    assert!(matches!(
        store.store_memory(MemoryRequest::new("content")).await,
        Err(LtmError::NoEmbedding { .. })
    ));

    let mut request = MemoryRequest::new("content");
    request.embedding = Some(vec![0.5; DIMENSION]);
    assert!(store.store_memory(request).await.is_ok());
}

#[tokio::test]
async fn out_of_range_min_similarity_is_rejected() {
    let store = build_store(DedupMode::Off);
    let mut request = QueryRequest::new("anything");
    request.min_similarity = 1.5;
    assert!(matches!(
        store.query_memories(request).await,
        Err(LtmError::InvalidInput { .. })
    ));
}

#[tokio::test]
async fn empty_query_falls_back_to_a_secondary_without_a_zero_vector() {
    let empty_primary = Arc::new(LocalProvider::open_in_memory(DIMENSION).unwrap());
    let populated = Arc::new(LocalProvider::open_in_memory(DIMENSION).unwrap());
    ltm_core::traits::VectorProvider::store(
        populated.as_ref(),
        "survivor",
        &[0.5; DIMENSION],
        HashMap::new(),
    )
    .await
    .unwrap();

    // Two providers share the "local" implementation; distinct names
    // keep them apart in the registry.
    let store = StoreBuilder::new(DIMENSION)
        .primary(ProviderConfig::new("scratch"), empty_primary)
        .secondary(ProviderConfig::new("populated"), populated)
        .embedding_model(Arc::new(VocabularyEmbedding))
        .build()
        .unwrap();

    let response = store.query_memories(QueryRequest::new("   ")).await.unwrap();
    assert_eq!(response.memories.len(), 1);
    assert_eq!(response.memories[0].content, "survivor");
    assert_eq!(response.providers_used, vec!["populated".to_string()]);
}

#[tokio::test]
async fn bulk_store_keeps_per_item_results_in_order() {
    let store = build_store(DedupMode::Off);
    let requests = vec![
        MemoryRequest::new("first"),
        MemoryRequest::new("   "),
        MemoryRequest::new("third"),
    ];
    let results = store.clone().bulk_store(requests).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().content, "first");
    assert!(matches!(results[1], Err(LtmError::InvalidInput { .. })));
    assert_eq!(results[2].as_ref().unwrap().content, "third");
}

#[tokio::test]
async fn export_pages_the_whole_corpus_exactly_once() {
    let store = build_store(DedupMode::Off);
    for i in 0..7 {
        store.store_memory(MemoryRequest::new(format!("export {i}"))).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let mut cursor = store.export(3);
    let mut seen = Vec::new();
    loop {
        let batch = cursor.next_batch().await;
        if batch.is_empty() {
            break;
        }
        seen.extend(batch.into_iter().map(|m| m.content));
    }

    assert_eq!(seen.len(), 7);
    let mut unique = seen.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 7);
    assert_eq!(seen[0], "export 6");
}

#[tokio::test]
async fn replication_reaches_the_secondary() {
    let primary = Arc::new(LocalProvider::open_in_memory(DIMENSION).unwrap());
    let replica = Arc::new(LocalProvider::open_in_memory(DIMENSION).unwrap());
    let store = StoreBuilder::new(DIMENSION)
        .primary(ProviderConfig::new("primary"), primary)
        .secondary(ProviderConfig::new("replica"), replica.clone())
        .embedding_model(Arc::new(VocabularyEmbedding))
        .build()
        .unwrap();

    let stored = store.store_memory(MemoryRequest::new("replicate me")).await.unwrap();
    store.drain_replication().await;

    let copy = ltm_core::traits::VectorProvider::get_by_id(replica.as_ref(), &stored.id)
        .await
        .unwrap();
    assert_eq!(copy.content, "replicate me");
}

#[tokio::test]
async fn emergency_paths_find_content_without_the_similarity_index() {
    let store = build_store(DedupMode::Off);
    store
        .store_memory(MemoryRequest::new("the quarterly revenue forecast"))
        .await
        .unwrap();
    store.store_memory(MemoryRequest::new("cats purr")).await.unwrap();

    let all = store.emergency_all(10).await;
    assert_eq!(all.len(), 2);

    let text = store.emergency_text("revenue", 10).await;
    assert_eq!(text.len(), 1);
    assert!(text[0].content.contains("revenue"));

    let fuzzy = store.emergency_fuzzy("quarterly revenue", 10).await;
    assert!(!fuzzy.is_empty());
    assert!(fuzzy[0].content.contains("quarterly"));
}

#[tokio::test]
async fn health_rolls_up_across_providers() {
    let primary = Arc::new(LocalProvider::open_in_memory(DIMENSION).unwrap());
    let store = StoreBuilder::new(DIMENSION)
        .primary(ProviderConfig::new("local"), primary)
        .secondary(ProviderConfig::new("broken"), Arc::new(BrokenProvider))
        .embedding_model(Arc::new(VocabularyEmbedding))
        .build()
        .unwrap();

    let health = store.health().await;
    assert_eq!(health.overall, ltm_core::models::HealthStatus::Degraded);
    assert_eq!(health.providers.len(), 2);
    assert_eq!(store.primary_name(), "local");
}
