use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Config, Pool, Runtime};
use pgvector::Vector;
use serde_json::Value;
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;
use uuid::Uuid;

use ltm_core::config::{DistanceMetric, PgVectorConfig, VectorIndexType};
use ltm_core::memory::Memory;
use ltm_core::models::{DedupDecision, HealthStatus, ProviderHealth, QueryFilters};
use ltm_core::traits::{
    ContentHashLookup, DedupAudit, EmergencySearch, ProviderStats, RecentAccess, VectorProvider,
};
use ltm_core::{LtmError, LtmResult};

use crate::common::system_metadata_from_parts;
use crate::pgvector::schema::{self, operator};
use crate::to_internal_err;

pub struct PgVectorProvider {
    pool: Pool,
    table: String,
    dimension: usize,
    distance_metric: DistanceMetric,
}

impl PgVectorProvider {
    pub async fn connect(cfg: &PgVectorConfig, dimension: usize) -> LtmResult<Self> {
        let mut pool_cfg = Config::new();
        pool_cfg.host = Some(cfg.host.clone());
        pool_cfg.port = Some(cfg.port);
        pool_cfg.dbname = Some(cfg.database.clone());
        pool_cfg.user = Some(cfg.user.clone());
        pool_cfg.password = std::env::var(&cfg.password_env).ok();

        let mut pool_opts = deadpool_postgres::PoolConfig::default();
        pool_opts.max_size = cfg.pool_max;
        pool_cfg.pool = Some(pool_opts);

        let pool = pool_cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| to_internal_err("create pgvector pool", e))?;

        let provider = Self {
            pool,
            table: cfg.table_name.clone(),
            dimension,
            distance_metric: cfg.distance_metric,
        };
        provider.initialize_schema(cfg.index_type).await?;
        Ok(provider)
    }

    async fn initialize_schema(&self, index_type: VectorIndexType) -> LtmResult<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| to_internal_err("acquire pgvector connection", e))?;
        let ddl = schema::ddl(&self.table, self.dimension, index_type, self.distance_metric);
        client
            .batch_execute(&ddl)
            .await
            .map_err(|e| to_internal_err("run pgvector schema DDL", e))
    }

    /// Best-effort access bump issued after the select has already
    /// been consumed by the caller; failures here never fail the read.
    fn bump_access(&self, ids: Vec<Uuid>) {
        if ids.is_empty() {
            return;
        }
        let pool = self.pool.clone();
        let table = self.table.clone();
        tokio::spawn(async move {
            let Ok(client) = pool.get().await else { return };
            let sql = format!(
                "UPDATE {table} SET access_count = access_count + 1, last_accessed = now() WHERE id = ANY($1)"
            );
            if let Err(e) = client.execute(&sql, &[&ids]).await {
                tracing::warn!(error = %e, "best-effort access bump failed");
            }
        });
    }

    fn row_to_memory(row: &tokio_postgres::Row) -> Memory {
        let content: String = row.get("content");
        let metadata_value: Value = row.get("metadata");
        let metadata: HashMap<String, Value> = match metadata_value {
            Value::Object(map) => map.into_iter().collect(),
            _ => HashMap::new(),
        };
        let user_id: Option<String> = row.try_get("user_id").ok().flatten();
        let conversation_id: Option<String> = row.try_get("conversation_id").ok().flatten();
        let content_length = content.chars().count();
        let id: Uuid = row.get("id");
        let created_at: DateTime<Utc> = row.get("created_at");
        let content_hash = Memory::hash_content(&content);
        // Present only on `query`'s result set, which needs the raw
        // vector back so the orchestrator can rank by similarity
        // without every provider having to agree on one similarity
        // scale; absent elsewhere.
        let embedding: Vec<f32> = row
            .try_get::<_, Vector>("embedding")
            .map(|v| v.to_vec())
            .unwrap_or_default();

        Memory {
            id: id.to_string(),
            system: system_metadata_from_parts(&metadata, user_id, conversation_id, content_length),
            metadata,
            embedding,
            importance_score: row.get::<_, f64>("importance_score").into(),
            content_hash,
            created_at,
            last_accessed: created_at,
            access_count: 0,
            content,
        }
    }
}

fn build_filter_clause(filters: &QueryFilters, next_param: &mut usize) -> (String, Vec<Box<dyn ToSql + Sync + Send>>) {
    let mut clauses = Vec::new();
    let mut params: Vec<Box<dyn ToSql + Sync + Send>> = Vec::new();

    if let Some(user_id) = &filters.user_id {
        clauses.push(format!("user_id = ${}", *next_param));
        *next_param += 1;
        params.push(Box::new(user_id.clone()));
    }
    if let Some(conversation_id) = &filters.conversation_id {
        clauses.push(format!("conversation_id = ${}", *next_param));
        *next_param += 1;
        params.push(Box::new(conversation_id.clone()));
    }
    if let Some(min_importance) = filters.min_importance {
        clauses.push(format!("importance_score >= ${}", *next_param));
        *next_param += 1;
        params.push(Box::new(min_importance));
    }
    if let Some(start) = filters.start_time {
        clauses.push(format!("created_at >= ${}", *next_param));
        *next_param += 1;
        params.push(Box::new(start));
    }
    if let Some(end) = filters.end_time {
        clauses.push(format!("created_at <= ${}", *next_param));
        *next_param += 1;
        params.push(Box::new(end));
    }

    let sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    (sql, params)
}

#[async_trait]
impl VectorProvider for PgVectorProvider {
    fn name(&self) -> &str {
        "pgvector"
    }

    async fn store(
        &self,
        content: &str,
        embedding: &[f32],
        metadata: HashMap<String, Value>,
    ) -> LtmResult<String> {
        if embedding.len() != self.dimension {
            return Err(LtmError::invalid_input(format!(
                "embedding dimension {} does not match configured dimension {}",
                embedding.len(),
                self.dimension
            )));
        }
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| to_internal_err("acquire pgvector connection", e))?;

        let id = metadata
            .get("id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);
        let user_id = metadata.get("user_id").and_then(|v| v.as_str());
        let conversation_id = metadata.get("conversation_id").and_then(|v| v.as_str());
        let importance_score = metadata.get("importance_score").and_then(|v| v.as_f64()).unwrap_or(0.5);
        let metadata_json = Value::Object(metadata.clone().into_iter().collect());
        let vector = Vector::from(embedding.to_vec());

        let sql = format!(
            "INSERT INTO {table} (id, content, embedding, metadata, user_id, conversation_id, importance_score)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id) DO UPDATE SET
                content = excluded.content,
                embedding = excluded.embedding,
                metadata = excluded.metadata,
                user_id = excluded.user_id,
                conversation_id = excluded.conversation_id,
                importance_score = excluded.importance_score",
            table = self.table,
        );
        client
            .execute(&sql, &[&id, &content, &vector, &metadata_json, &user_id, &conversation_id, &importance_score])
            .await
            .map_err(|e| to_internal_err("pgvector insert", e))?;

        let content_hash = Memory::hash_content(content);
        client
            .execute(
                "INSERT INTO memory_content_hashes (content_hash, memory_id) VALUES ($1, $2)
                 ON CONFLICT (content_hash) DO UPDATE SET memory_id = excluded.memory_id",
                &[&content_hash, &id],
            )
            .await
            .map_err(|e| to_internal_err("pgvector content hash insert", e))?;

        Ok(id.to_string())
    }

    async fn query(&self, query_embedding: &[f32], limit: usize, filters: &QueryFilters) -> Vec<Memory> {
        let Ok(client) = self.pool.get().await else {
            return Vec::new();
        };
        let op = operator(self.distance_metric);
        let mut next_param = 2;
        let (filter_sql, filter_params) = build_filter_clause(filters, &mut next_param);
        let limit_param = next_param;

        let sql = format!(
            "SELECT id, content, embedding, metadata, user_id, conversation_id, importance_score, created_at \
             FROM {table} {filter_sql} \
             ORDER BY embedding {op} $1 LIMIT ${limit_param}",
            table = self.table,
        );

        let vector = Vector::from(query_embedding.to_vec());
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![&vector];
        for p in &filter_params {
            params.push(p.as_ref());
        }
        let limit_i64 = limit as i64;
        params.push(&limit_i64);

        let rows = match client.query(&sql, &params).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "pgvector query failed, returning empty result");
                return Vec::new();
            }
        };

        let mut ids = Vec::with_capacity(rows.len());
        let memories: Vec<Memory> = rows
            .iter()
            .map(|row| {
                let mem = Self::row_to_memory(row);
                ids.push(Uuid::parse_str(&mem.id).unwrap_or_default());
                mem
            })
            .collect();

        self.bump_access(ids);
        memories
    }

    async fn get_by_id(&self, id: &str) -> LtmResult<Memory> {
        let uuid = Uuid::parse_str(id).map_err(|_| LtmError::not_found(id))?;
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| to_internal_err("acquire pgvector connection", e))?;
        let sql = format!(
            "SELECT id, content, metadata, user_id, conversation_id, importance_score, created_at \
             FROM {table} WHERE id = $1",
            table = self.table,
        );
        let row = client
            .query_opt(&sql, &[&uuid])
            .await
            .map_err(|e| to_internal_err("pgvector get_by_id", e))?
            .ok_or_else(|| LtmError::not_found(id))?;
        self.bump_access(vec![uuid]);
        Ok(Self::row_to_memory(&row))
    }

    async fn delete(&self, id: &str) -> LtmResult<bool> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Ok(false);
        };
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| to_internal_err("acquire pgvector connection", e))?;
        let sql = format!("DELETE FROM {table} WHERE id = $1", table = self.table);
        let deleted = client
            .execute(&sql, &[&uuid])
            .await
            .map_err(|e| to_internal_err("pgvector delete", e))?;
        Ok(deleted > 0)
    }

    async fn health_check(&self) -> ProviderHealth {
        match self.pool.get().await {
            Ok(client) => match client.query_one("SELECT 1", &[]).await {
                Ok(_) => ProviderHealth::healthy(self.name()),
                Err(e) => ProviderHealth::unhealthy(self.name(), HealthStatus::Error, e.to_string()),
            },
            Err(e) => ProviderHealth::unhealthy(self.name(), HealthStatus::Error, e.to_string()),
        }
    }

    async fn get_stats(&self) -> ProviderStats {
        let status = self.pool.status();
        let mut health = self.health_check().await;
        let pool_detail = format!("pool size={} available={}", status.size, status.available);
        health.detail = Some(match health.detail.take() {
            Some(existing) => format!("{existing}; {pool_detail}"),
            None => pool_detail,
        });
        ProviderStats {
            health,
            features: vec![
                "recent_access",
                "content_hash_lookup",
                "dedup_audit",
                "emergency_search",
                "pool_size",
            ],
        }
    }
}

#[async_trait]
impl RecentAccess for PgVectorProvider {
    async fn get_recent(&self, limit: usize, offset: usize) -> Vec<Memory> {
        let Ok(client) = self.pool.get().await else {
            return Vec::new();
        };
        let sql = format!(
            "SELECT id, content, metadata, user_id, conversation_id, importance_score, created_at \
             FROM {table} ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            table = self.table,
        );
        match client.query(&sql, &[&(limit as i64), &(offset as i64)]).await {
            Ok(rows) => rows.iter().map(Self::row_to_memory).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "pgvector get_recent failed");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl ContentHashLookup for PgVectorProvider {
    async fn lookup_by_hash(&self, content_hash: &str) -> Option<Memory> {
        let client = self.pool.get().await.ok()?;
        let sql = format!(
            "SELECT m.id, m.content, m.metadata, m.user_id, m.conversation_id, m.importance_score, m.created_at \
             FROM {table} m JOIN memory_content_hashes h ON h.memory_id = m.id \
             WHERE h.content_hash = $1",
            table = self.table,
        );
        let row = client.query_opt(&sql, &[&content_hash]).await.ok()??;
        Some(Self::row_to_memory(&row))
    }
}

#[async_trait]
impl DedupAudit for PgVectorProvider {
    async fn record_decision(&self, candidate_id: &str, decision: &DedupDecision) -> LtmResult<String> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| to_internal_err("acquire pgvector connection", e))?;
        let audit_id = Uuid::new_v4();
        let candidate_uuid = Uuid::parse_str(candidate_id).unwrap_or_else(|_| Uuid::new_v4());
        let matched_uuid = decision
            .existing_memory_id
            .as_deref()
            .and_then(|s| Uuid::parse_str(s).ok());
        client
            .execute(
                "INSERT INTO dedup_audit
                    (audit_id, candidate_id, matched_id, is_duplicate, confidence,
                     similarity_score, reason, automatic)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, true)",
                &[
                    &audit_id,
                    &candidate_uuid,
                    &matched_uuid,
                    &decision.is_duplicate,
                    &decision.confidence,
                    &decision.similarity_score,
                    &decision.reason,
                ],
            )
            .await
            .map_err(|e| to_internal_err("pgvector dedup_audit insert", e))?;
        Ok(audit_id.to_string())
    }

    async fn mark_false_positive(&self, audit_id: &str) -> LtmResult<()> {
        let uuid = Uuid::parse_str(audit_id).map_err(|_| LtmError::not_found(audit_id))?;
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| to_internal_err("acquire pgvector connection", e))?;
        let updated = client
            .execute("UPDATE dedup_audit SET reviewed = true WHERE audit_id = $1", &[&uuid])
            .await
            .map_err(|e| to_internal_err("pgvector dedup_audit review", e))?;
        if updated == 0 {
            return Err(LtmError::not_found(audit_id));
        }
        Ok(())
    }
}

#[async_trait]
impl EmergencySearch for PgVectorProvider {
    async fn emergency_all(&self, limit: usize) -> Vec<Memory> {
        self.get_recent(limit, 0).await
    }

    async fn emergency_text(&self, query: &str, limit: usize) -> Vec<Memory> {
        let Ok(client) = self.pool.get().await else {
            return Vec::new();
        };
        let sql = format!(
            "SELECT id, content, metadata, user_id, conversation_id, importance_score, created_at \
             FROM {table} \
             WHERE to_tsvector('english', content) @@ plainto_tsquery('english', $1) \
             ORDER BY ts_rank_cd(to_tsvector('english', content), plainto_tsquery('english', $1)) DESC \
             LIMIT $2",
            table = self.table,
        );
        match client.query(&sql, &[&query, &(limit as i64)]).await {
            Ok(rows) => rows.iter().map(Self::row_to_memory).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "pgvector emergency_text failed");
                Vec::new()
            }
        }
    }

    async fn emergency_fuzzy(&self, query: &str, limit: usize) -> Vec<Memory> {
        let tokens: Vec<String> = query.split_whitespace().take(5).map(str::to_lowercase).collect();
        if tokens.is_empty() {
            return Vec::new();
        }
        let Ok(client) = self.pool.get().await else {
            return Vec::new();
        };
        let match_exprs: Vec<String> = tokens
            .iter()
            .enumerate()
            .map(|(i, _)| format!("(CASE WHEN lower(content) LIKE ${} THEN 1 ELSE 0 END)", i + 1))
            .collect();
        let score_expr = match_exprs.join(" + ");
        let like_params: Vec<String> = tokens.iter().map(|t| format!("%{t}%")).collect();
        let limit_param_idx = tokens.len() + 1;

        let sql = format!(
            "SELECT id, content, metadata, user_id, conversation_id, importance_score, created_at, \
             ({score_expr}) AS match_count \
             FROM {table} \
             WHERE ({score_expr}) > 0 \
             ORDER BY match_count DESC \
             LIMIT ${limit_param_idx}",
            table = self.table,
        );

        let mut params: Vec<&(dyn ToSql + Sync)> = like_params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        let limit_i64 = limit as i64;
        params.push(&limit_i64);

        match client.query(&sql, &params).await {
            Ok(rows) => rows.iter().map(Self::row_to_memory).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "pgvector emergency_fuzzy failed");
                Vec::new()
            }
        }
    }
}
