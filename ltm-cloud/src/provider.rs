use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use ltm_core::config::CloudConfig;
use ltm_core::constants::DEFAULT_OPERATION_TIMEOUT_SECS;
use ltm_core::memory::{Memory, SystemMetadata};
use ltm_core::models::{HealthStatus, ProviderHealth, QueryFilters};
use ltm_core::traits::{ProviderStats, VectorProvider};
use ltm_core::{LtmError, LtmResult};

use crate::protocol::{
    CloudRequest, CloudResponse, DeleteAck, QueryMatches, QueryPayload, UpsertAck, UpsertPayload,
};

/// Adapter over a remote managed vector service.
///
/// The remote owns its own index; this provider only translates between
/// the canonical [`Memory`] shape and the service's stringly-typed wire
/// format. It is registered as a secondary: the orchestrator replicates
/// into it in the background and may fan a read out to it, but never
/// selects it as primary while a local provider exists.
pub struct CloudVectorProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    dimension: usize,
}

impl CloudVectorProvider {
    pub fn new(config: &CloudConfig, dimension: usize) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            tracing::warn!(
                key_env = %config.api_key_env,
                "cloud provider constructed without an API key; every call will degrade"
            );
        }
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            dimension,
        }
    }

    async fn post<P: Serialize, R: DeserializeOwned>(&self, path: &str, payload: P) -> LtmResult<R> {
        let Some(key) = &self.api_key else {
            return Err(LtmError::ApiError {
                service: "cloud".to_string(),
                reason: "no API key configured".to_string(),
            });
        };
        let envelope = CloudRequest::new(payload);
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(key)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LtmError::Timeout {
                        operation: format!("cloud {path}"),
                        elapsed_secs: DEFAULT_OPERATION_TIMEOUT_SECS as f64,
                    }
                } else {
                    LtmError::ApiError { service: "cloud".to_string(), reason: e.to_string() }
                }
            })?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LtmError::RateLimited { service: "cloud".to_string(), retry_after_secs: None });
        }
        if !response.status().is_success() {
            return Err(LtmError::ApiError {
                service: "cloud".to_string(),
                reason: format!("{} returned {}", path, response.status()),
            });
        }

        let parsed: CloudResponse<R> = response
            .json()
            .await
            .map_err(|e| LtmError::ApiError { service: "cloud".to_string(), reason: e.to_string() })?;
        if !parsed.success {
            return Err(LtmError::ApiError {
                service: "cloud".to_string(),
                reason: parsed.error.unwrap_or_else(|| "unspecified remote error".to_string()),
            });
        }
        parsed.data.ok_or_else(|| LtmError::ApiError {
            service: "cloud".to_string(),
            reason: "success response with empty data".to_string(),
        })
    }

    fn memory_from_match(m: crate::protocol::CloudMatch) -> Memory {
        let user_id = m.metadata.get("user_id").cloned();
        let conversation_id = m.metadata.get("conversation_id").cloned();
        let importance_score = m
            .metadata
            .get("importance_score")
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.5);
        let content_length = m.content.chars().count();
        let content_hash = Memory::hash_content(&m.content);
        let created_at = m.created_at.unwrap_or_else(Utc::now);
        // Stringified on the way in, so it comes back as strings; the
        // canonical metadata map keeps them as JSON strings rather than
        // guessing at the original types.
        let metadata: HashMap<String, Value> =
            m.metadata.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
        Memory {
            id: m.id,
            content: m.content,
            embedding: m.values,
            system: SystemMetadata {
                user_id,
                conversation_id,
                content_length,
                adm: None,
            },
            metadata,
            importance_score: importance_score.into(),
            content_hash,
            created_at,
            last_accessed: created_at,
            access_count: 0,
        }
    }
}

/// The remote accepts only string metadata values; everything else is
/// rendered to its JSON text form.
fn stringify_metadata(metadata: &HashMap<String, Value>) -> HashMap<String, String> {
    metadata
        .iter()
        .map(|(k, v)| {
            let s = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), s)
        })
        .collect()
}

#[async_trait]
impl VectorProvider for CloudVectorProvider {
    fn name(&self) -> &str {
        "cloud"
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
        let id = metadata
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let payload = UpsertPayload {
            id: id.clone(),
            content: content.to_string(),
            values: embedding.to_vec(),
            metadata: stringify_metadata(&metadata),
        };
        let _: UpsertAck = self.post("/vectors/upsert", payload).await?;
        Ok(id)
    }

    async fn query(&self, query_embedding: &[f32], limit: usize, filters: &QueryFilters) -> Vec<Memory> {
        let mut filter = HashMap::new();
        if let Some(user_id) = &filters.user_id {
            filter.insert("user_id".to_string(), user_id.clone());
        }
        if let Some(conversation_id) = &filters.conversation_id {
            filter.insert("conversation_id".to_string(), conversation_id.clone());
        }
        let payload = QueryPayload {
            vector: query_embedding.to_vec(),
            top_k: limit,
            filter,
            include_values: true,
        };
        match self.post::<_, QueryMatches>("/vectors/query", payload).await {
            Ok(result) => result.matches.into_iter().map(Self::memory_from_match).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "cloud query degraded to empty result");
                Vec::new()
            }
        }
    }

    async fn get_by_id(&self, id: &str) -> LtmResult<Memory> {
        let mut filter = HashMap::new();
        filter.insert("id".to_string(), id.to_string());
        let payload = QueryPayload {
            vector: Vec::new(),
            top_k: 1,
            filter,
            include_values: true,
        };
        let result: QueryMatches = self.post("/vectors/fetch", payload).await?;
        result
            .matches
            .into_iter()
            .next()
            .map(Self::memory_from_match)
            .ok_or_else(|| LtmError::not_found(id))
    }

    async fn delete(&self, id: &str) -> LtmResult<bool> {
        let mut filter = HashMap::new();
        filter.insert("id".to_string(), id.to_string());
        match self
            .post::<_, DeleteAck>("/vectors/delete", filter)
            .await
        {
            Ok(ack) => Ok(ack.deleted > 0),
            Err(e) => {
                tracing::warn!(error = %e, "cloud delete degraded to no-op");
                Ok(false)
            }
        }
    }

    async fn health_check(&self) -> ProviderHealth {
        if self.api_key.is_none() {
            return ProviderHealth::unhealthy(self.name(), HealthStatus::Disabled, "no API key configured");
        }
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => ProviderHealth::healthy(self.name()),
            Ok(resp) => ProviderHealth::unhealthy(
                self.name(),
                HealthStatus::Degraded,
                format!("health endpoint returned {}", resp.status()),
            ),
            Err(e) => ProviderHealth::unhealthy(self.name(), HealthStatus::Error, e.to_string()),
        }
    }

    async fn get_stats(&self) -> ProviderStats {
        ProviderStats {
            health: self.health_check().await,
            features: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stringify_keeps_strings_and_renders_the_rest() {
        let mut metadata = HashMap::new();
        metadata.insert("topic".to_string(), Value::String("rust".to_string()));
        metadata.insert("count".to_string(), Value::from(3));
        metadata.insert("nested".to_string(), serde_json::json!({"a": 1}));

        let out = stringify_metadata(&metadata);
        assert_eq!(out["topic"], "rust");
        assert_eq!(out["count"], "3");
        assert_eq!(out["nested"], r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn store_rejects_wrong_dimension() {
        let provider = CloudVectorProvider::new(&CloudConfig::default(), 4);
        let err = provider.store("content", &[0.1, 0.2], HashMap::new()).await;
        assert!(matches!(err, Err(LtmError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn query_without_key_degrades_to_empty() {
        let provider = CloudVectorProvider::new(&CloudConfig::default(), 2);
        let results = provider.query(&[0.1, 0.2], 5, &QueryFilters::default()).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn health_without_key_reports_disabled() {
        let provider = CloudVectorProvider::new(&CloudConfig::default(), 2);
        let health = provider.health_check().await;
        assert_eq!(health.status, HealthStatus::Disabled);
    }
}
