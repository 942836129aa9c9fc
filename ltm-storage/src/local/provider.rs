use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use uuid::Uuid;

use ltm_core::memory::Memory;
use ltm_core::models::{DedupDecision, HealthStatus, ProviderHealth, QueryFilters};
use ltm_core::traits::{
    ContentHashLookup, DedupAudit, EmergencySearch, ProviderStats, RecentAccess, VectorProvider,
};
use ltm_core::vector::cosine_similarity;
use ltm_core::{LtmError, LtmResult};

use crate::common::system_metadata_from_parts;
use crate::local::codec::{decode_embedding, encode_embedding};
use crate::local::schema;
use crate::to_internal_err;

/// Embedded fallback provider: a single SQLite file plus an in-process
/// brute-force cosine scan. `brute_force_threshold` marks the corpus
/// size past which an approximate index should take over; until one
/// exists the scan stays brute force and only logs when it crosses the
/// threshold. Always initialized at startup so the service can start
/// even when PostgreSQL is unreachable.
pub struct LocalProvider {
    conn: Arc<Mutex<Connection>>,
    dimension: usize,
    brute_force_threshold: usize,
}

impl LocalProvider {
    pub fn open(path: &Path, dimension: usize, brute_force_threshold: usize) -> LtmResult<Self> {
        let conn = Connection::open(path).map_err(|e| to_internal_err("open local db", e))?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            dimension,
            brute_force_threshold,
        })
    }

    pub fn open_in_memory(dimension: usize) -> LtmResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| to_internal_err("open in-memory db", e))?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            dimension,
            brute_force_threshold: 10_000,
        })
    }

    /// Runs a blocking rusqlite closure on the blocking thread-pool
    /// rather than the async reactor thread, per the service's
    /// scheduling model (cooperative single-threaded scheduler plus a
    /// thread-pool for blocking I/O).
    async fn with_conn<F, T>(&self, f: F) -> LtmResult<T>
    where
        F: FnOnce(&Connection) -> LtmResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| LtmError::internal("local db mutex poisoned"))?;
            f(&guard)
        })
        .await
        .map_err(|e| to_internal_err("local db blocking task join", e))?
    }
}

fn row_to_memory(row: &Row<'_>) -> rusqlite::Result<Memory> {
    let metadata_json: String = row.get("metadata")?;
    let metadata: HashMap<String, Value> = serde_json::from_str(&metadata_json).unwrap_or_default();
    let embedding_blob: Vec<u8> = row.get("embedding")?;
    let content: String = row.get("content")?;
    let user_id: Option<String> = row.get("user_id")?;
    let conversation_id: Option<String> = row.get("conversation_id")?;
    let created_at: String = row.get("created_at")?;
    let last_accessed: String = row.get("last_accessed")?;

    let content_length = content.chars().count();
    let content_hash = Memory::hash_content(&content);
    Ok(Memory {
        id: row.get("id")?,
        content,
        embedding: decode_embedding(&embedding_blob),
        system: system_metadata_from_parts(&metadata, user_id, conversation_id, content_length),
        metadata,
        importance_score: row.get::<_, f64>("importance_score")?.into(),
        content_hash,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        last_accessed: DateTime::parse_from_rfc3339(&last_accessed)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        access_count: row.get::<_, i64>("access_count")? as u64,
    })
}

const SELECT_COLUMNS: &str = "id, content, embedding, metadata, user_id, conversation_id, \
     importance_score, created_at, last_accessed, access_count";

#[async_trait]
impl VectorProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn store(
        &self,
        content: &str,
        embedding: &[f32],
        metadata: HashMap<String, Value>,
    ) -> LtmResult<String> {
        let content = content.to_string();
        let embedding = embedding.to_vec();
        self.with_conn(move |conn| {
            let id = metadata
                .get("id")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            let user_id = metadata.get("user_id").and_then(|v| v.as_str()).map(str::to_string);
            let conversation_id = metadata
                .get("conversation_id")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            let importance_score = metadata.get("importance_score").and_then(|v| v.as_f64()).unwrap_or(0.5);
            let metadata_json = serde_json::to_string(&metadata).map_err(|e| to_internal_err("serialize metadata", e))?;
            let now = Utc::now().to_rfc3339();
            let blob = encode_embedding(&embedding);

            conn.execute_batch("SAVEPOINT local_store")
                .map_err(|e| to_internal_err("local store savepoint", e))?;

            let content_hash = Memory::hash_content(&content);
            let result = (|| -> LtmResult<()> {
                conn.execute(
                    "INSERT INTO vector_memories
                        (id, content, embedding, dimensions, metadata, user_id, conversation_id,
                         importance_score, created_at, last_accessed, access_count)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, 0)
                     ON CONFLICT(id) DO UPDATE SET
                        content = excluded.content,
                        embedding = excluded.embedding,
                        dimensions = excluded.dimensions,
                        metadata = excluded.metadata,
                        user_id = excluded.user_id,
                        conversation_id = excluded.conversation_id,
                        importance_score = excluded.importance_score",
                    params![
                        id,
                        content,
                        blob,
                        embedding.len() as i64,
                        metadata_json,
                        user_id,
                        conversation_id,
                        importance_score,
                        now,
                    ],
                )
                .map_err(|e| to_internal_err("insert vector_memories", e))?;

                conn.execute(
                    "INSERT INTO memory_content_hashes (content_hash, memory_id) VALUES (?1, ?2)
                     ON CONFLICT(content_hash) DO UPDATE SET memory_id = excluded.memory_id",
                    params![content_hash, id],
                )
                .map_err(|e| to_internal_err("insert memory_content_hashes", e))?;
                Ok(())
            })();

            match result {
                Ok(()) => {
                    conn.execute_batch("RELEASE local_store")
                        .map_err(|e| to_internal_err("local store release", e))?;
                    Ok(id)
                }
                Err(e) => {
                    let _ = conn.execute_batch("ROLLBACK TO local_store");
                    let _ = conn.execute_batch("RELEASE local_store");
                    Err(e)
                }
            }
        })
        .await
    }

    async fn query(&self, query_embedding: &[f32], limit: usize, filters: &QueryFilters) -> Vec<Memory> {
        let query_embedding = query_embedding.to_vec();
        let filters = filters.clone();
        let dimension = self.dimension;
        let brute_force_threshold = self.brute_force_threshold;
        self.with_conn(move |conn| {
            let sql = format!("SELECT {SELECT_COLUMNS} FROM vector_memories");
            let mut stmt = conn.prepare(&sql).map_err(|e| to_internal_err("prepare query", e))?;
            let rows = stmt
                .query_map([], row_to_memory)
                .map_err(|e| to_internal_err("query vector_memories", e))?;

            let mut scored: Vec<(f64, Memory)> = Vec::new();
            for row in rows {
                let memory = match row {
                    Ok(m) => m,
                    Err(_) => continue,
                };
                if memory.embedding.len() != dimension {
                    continue;
                }
                if !passes_filters(&memory, &filters) {
                    continue;
                }
                let sim = cosine_similarity(&query_embedding, &memory.embedding);
                scored.push((sim, memory));
            }
            if scored.len() > brute_force_threshold {
                tracing::debug!(
                    corpus = scored.len(),
                    threshold = brute_force_threshold,
                    "brute-force cosine scan over a corpus past the approximate-index threshold"
                );
            }
            scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
            scored.truncate(limit);
            Ok(scored.into_iter().map(|(_, m)| m).collect())
        })
        .await
        .unwrap_or_default()
    }

    async fn get_by_id(&self, id: &str) -> LtmResult<Memory> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let sql = format!("SELECT {SELECT_COLUMNS} FROM vector_memories WHERE id = ?1");
            let memory = conn
                .query_row(&sql, params![id], row_to_memory)
                .optional()
                .map_err(|e| to_internal_err("local get_by_id", e))?;
            let Some(mut memory) = memory else {
                return Err(LtmError::not_found(&id));
            };
            conn.execute(
                "UPDATE vector_memories SET access_count = access_count + 1, last_accessed = ?1 WHERE id = ?2",
                params![Utc::now().to_rfc3339(), memory.id],
            )
            .map_err(|e| to_internal_err("local access bump", e))?;
            memory.record_access();
            Ok(memory)
        })
        .await
    }

    async fn delete(&self, id: &str) -> LtmResult<bool> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let deleted = conn
                .execute("DELETE FROM vector_memories WHERE id = ?1", params![id])
                .map_err(|e| to_internal_err("local delete", e))?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn health_check(&self) -> ProviderHealth {
        match self
            .with_conn(|conn| {
                conn.query_row("SELECT 1", [], |_| Ok(()))
                    .map_err(|e| to_internal_err("health check", e))
            })
            .await
        {
            Ok(()) => ProviderHealth::healthy(self.name()),
            Err(e) => ProviderHealth::unhealthy(self.name(), HealthStatus::Error, e.to_string()),
        }
    }

    async fn get_stats(&self) -> ProviderStats {
        ProviderStats {
            health: self.health_check().await,
            features: vec!["recent_access", "content_hash_lookup", "dedup_audit", "emergency_search"],
        }
    }
}

fn passes_filters(memory: &Memory, filters: &QueryFilters) -> bool {
    if let Some(user_id) = &filters.user_id {
        if memory.system.user_id.as_deref() != Some(user_id.as_str()) {
            return false;
        }
    }
    if let Some(conversation_id) = &filters.conversation_id {
        if memory.system.conversation_id.as_deref() != Some(conversation_id.as_str()) {
            return false;
        }
    }
    if let Some(min_importance) = filters.min_importance {
        if memory.importance_score.value() < min_importance {
            return false;
        }
    }
    if let Some(start) = filters.start_time {
        if memory.created_at < start {
            return false;
        }
    }
    if let Some(end) = filters.end_time {
        if memory.created_at > end {
            return false;
        }
    }
    true
}

#[async_trait]
impl RecentAccess for LocalProvider {
    async fn get_recent(&self, limit: usize, offset: usize) -> Vec<Memory> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {SELECT_COLUMNS} FROM vector_memories ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
            );
            let mut stmt = conn.prepare(&sql).map_err(|e| to_internal_err("prepare get_recent", e))?;
            let rows = stmt
                .query_map(params![limit as i64, offset as i64], row_to_memory)
                .map_err(|e| to_internal_err("query get_recent", e))?;
            Ok(rows.filter_map(Result::ok).collect())
        })
        .await
        .unwrap_or_default()
    }
}

#[async_trait]
impl ContentHashLookup for LocalProvider {
    async fn lookup_by_hash(&self, content_hash: &str) -> Option<Memory> {
        let content_hash = content_hash.to_string();
        self.with_conn(move |conn| {
            let memory_id: Option<String> = conn
                .query_row(
                    "SELECT memory_id FROM memory_content_hashes WHERE content_hash = ?1",
                    params![content_hash],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| to_internal_err("lookup content hash", e))?;
            let Some(memory_id) = memory_id else {
                return Ok(None);
            };
            let sql = format!("SELECT {SELECT_COLUMNS} FROM vector_memories WHERE id = ?1");
            conn.query_row(&sql, params![memory_id], row_to_memory)
                .optional()
                .map_err(|e| to_internal_err("lookup memory by hash", e))
        })
        .await
        .ok()
        .flatten()
    }
}

#[async_trait]
impl DedupAudit for LocalProvider {
    async fn record_decision(&self, candidate_id: &str, decision: &DedupDecision) -> LtmResult<String> {
        let candidate_id = candidate_id.to_string();
        let decision = decision.clone();
        let audit_id = Uuid::new_v4().to_string();
        let audit_id_owned = audit_id.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO dedup_audit
                    (audit_id, candidate_id, matched_id, is_duplicate, confidence,
                     similarity_score, reason, automatic, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8)",
                params![
                    audit_id_owned,
                    candidate_id,
                    decision.existing_memory_id,
                    decision.is_duplicate as i32,
                    decision.confidence,
                    decision.similarity_score,
                    decision.reason,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| to_internal_err("insert dedup_audit", e))?;
            Ok(())
        })
        .await?;
        Ok(audit_id)
    }

    async fn mark_false_positive(&self, audit_id: &str) -> LtmResult<()> {
        let audit_id = audit_id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE dedup_audit SET reviewed = 1 WHERE audit_id = ?1",
                params![audit_id],
            )
            .map_err(|e| to_internal_err("mark dedup_audit reviewed", e))?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl EmergencySearch for LocalProvider {
    async fn emergency_all(&self, limit: usize) -> Vec<Memory> {
        self.get_recent(limit, 0).await
    }

    async fn emergency_text(&self, query: &str, limit: usize) -> Vec<Memory> {
        let pattern = format!("%{}%", query.to_lowercase());
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {SELECT_COLUMNS} FROM vector_memories WHERE lower(content) LIKE ?1 \
                 ORDER BY created_at DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql).map_err(|e| to_internal_err("prepare emergency_text", e))?;
            let rows = stmt
                .query_map(params![pattern, limit as i64], row_to_memory)
                .map_err(|e| to_internal_err("query emergency_text", e))?;
            Ok(rows.filter_map(Result::ok).collect())
        })
        .await
        .unwrap_or_default()
    }

    async fn emergency_fuzzy(&self, query: &str, limit: usize) -> Vec<Memory> {
        let tokens: Vec<String> = query
            .split_whitespace()
            .take(5)
            .map(|t| t.to_lowercase())
            .collect();
        if tokens.is_empty() {
            return Vec::new();
        }
        self.with_conn(move |conn| {
            let sql = format!("SELECT {SELECT_COLUMNS} FROM vector_memories");
            let mut stmt = conn.prepare(&sql).map_err(|e| to_internal_err("prepare emergency_fuzzy", e))?;
            let rows = stmt
                .query_map([], row_to_memory)
                .map_err(|e| to_internal_err("query emergency_fuzzy", e))?;

            let mut scored: Vec<(usize, Memory)> = Vec::new();
            for row in rows {
                let memory = match row {
                    Ok(m) => m,
                    Err(_) => continue,
                };
                let lower = memory.content.to_lowercase();
                let matches = tokens.iter().filter(|t| lower.contains(t.as_str())).count();
                if matches > 0 {
                    scored.push((matches, memory));
                }
            }
            scored.sort_by(|a, b| b.0.cmp(&a.0));
            scored.truncate(limit);
            Ok(scored.into_iter().map(|(_, m)| m).collect())
        })
        .await
        .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata(user_id: &str) -> HashMap<String, Value> {
        let mut m = HashMap::new();
        m.insert("user_id".to_string(), Value::String(user_id.to_string()));
        m
    }

    #[tokio::test]
    async fn store_then_query_roundtrips() {
        let provider = LocalProvider::open_in_memory(3).unwrap();
        let embedding = vec![1.0_f32, 0.0, 0.0];
        let id = provider
            .store("cats purr", &embedding, sample_metadata("alice"))
            .await
            .unwrap();

        let results = provider.query(&embedding, 10, &QueryFilters::default()).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
        assert_eq!(results[0].content, "cats purr");
    }

    #[tokio::test]
    async fn filters_by_user_id() {
        let provider = LocalProvider::open_in_memory(2).unwrap();
        provider.store("a", &[1.0, 0.0], sample_metadata("alice")).await.unwrap();
        provider.store("b", &[0.0, 1.0], sample_metadata("bob")).await.unwrap();

        let filters = QueryFilters {
            user_id: Some("alice".to_string()),
            ..Default::default()
        };
        let results = provider.query(&[1.0, 0.0], 10, &filters).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "a");
    }

    #[tokio::test]
    async fn get_recent_orders_newest_first() {
        let provider = LocalProvider::open_in_memory(1).unwrap();
        for i in 0..3 {
            provider
                .store(&format!("m{i}"), &[1.0], HashMap::new())
                .await
                .unwrap();
        }
        let recent = provider.get_recent(3, 0).await;
        assert_eq!(recent.len(), 3);
    }

    #[tokio::test]
    async fn content_hash_lookup_finds_stored_memory() {
        let provider = LocalProvider::open_in_memory(1).unwrap();
        provider.store("Hello, World!", &[1.0], HashMap::new()).await.unwrap();
        let hash = Memory::hash_content("Hello, World!");
        let found = provider.lookup_by_hash(&hash).await;
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn data_survives_reopening_the_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memories.sqlite3");
        let id = {
            let provider = LocalProvider::open(&path, 2, 1_000).unwrap();
            provider
                .store("persistent note", &[0.5, 0.5], HashMap::new())
                .await
                .unwrap()
        };

        let reopened = LocalProvider::open(&path, 2, 1_000).unwrap();
        let fetched = reopened.get_by_id(&id).await.unwrap();
        assert_eq!(fetched.content, "persistent note");
        assert_eq!(fetched.embedding, vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn marking_a_false_positive_flips_the_audit_record() {
        let provider = LocalProvider::open_in_memory(1).unwrap();
        let decision = ltm_core::models::DedupDecision::duplicate(
            "existing-id",
            0.97,
            "semantic match",
            Memory::hash_content("candidate"),
            Some(0.97),
        );
        let audit_id = provider.record_decision("candidate-id", &decision).await.unwrap();
        provider.mark_false_positive(&audit_id).await.unwrap();
    }
}
