use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ltm_core::config::EmbeddingConfig;
use ltm_core::traits::EmbeddingModel;
use ltm_core::{LtmError, LtmResult};

use crate::truncate_input;

const MAX_RETRIES: u32 = 4;
const INITIAL_BACKOFF_MS: u64 = 250;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedResponseItem>,
}

#[derive(Deserialize)]
struct EmbedResponseItem {
    embedding: Vec<f32>,
    index: usize,
}

/// HTTP client over a remote embedding API. Chunks batches to
/// `batch_size`, retries rate-limited and transient failures with
/// exponential backoff, and surfaces `RateLimited`/`ApiError`/`Timeout`
/// distinctly once retries are exhausted.
pub struct RemoteEmbeddingModel {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    dimension: usize,
    batch_size: usize,
    max_input_chars: usize,
}

impl RemoteEmbeddingModel {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok();
        Self {
            client: reqwest::Client::new(),
            api_base: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.example.com/v1/embeddings".to_string()),
            api_key,
            dimension: config.dimension,
            batch_size: config.batch_size.max(1),
            max_input_chars: config.max_input_chars,
        }
    }

    async fn embed_chunk(&self, chunk: &[String]) -> LtmResult<Vec<Vec<f32>>> {
        let mut attempt = 0;
        loop {
            let mut request = self.client.post(&self.api_base).json(&EmbedRequest { input: chunk });
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let start = std::time::Instant::now();
            let result = request.send().await;

            match result {
                Ok(resp) if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after = resp
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok());
                    if attempt >= MAX_RETRIES {
                        return Err(LtmError::RateLimited {
                            service: "embedding".to_string(),
                            retry_after_secs: retry_after,
                        });
                    }
                    tokio::time::sleep(backoff_delay(attempt, retry_after)).await;
                    attempt += 1;
                }
                Ok(resp) if resp.status().is_server_error() => {
                    if attempt >= MAX_RETRIES {
                        return Err(LtmError::ApiError {
                            service: "embedding".to_string(),
                            reason: format!("server error: {}", resp.status()),
                        });
                    }
                    tokio::time::sleep(backoff_delay(attempt, None)).await;
                    attempt += 1;
                }
                Ok(resp) if !resp.status().is_success() => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    return Err(LtmError::ApiError {
                        service: "embedding".to_string(),
                        reason: format!("{status}: {body}"),
                    });
                }
                Ok(resp) => {
                    let parsed: EmbedResponse = resp
                        .json()
                        .await
                        .map_err(|e| LtmError::ApiError { service: "embedding".to_string(), reason: e.to_string() })?;
                    let mut ordered = vec![Vec::new(); chunk.len()];
                    for item in parsed.data {
                        if item.index < ordered.len() {
                            ordered[item.index] = item.embedding;
                        }
                    }
                    return Ok(ordered);
                }
                Err(e) if e.is_timeout() => {
                    if attempt >= MAX_RETRIES {
                        return Err(LtmError::Timeout {
                            operation: "embedding".to_string(),
                            elapsed_secs: start.elapsed().as_secs_f64(),
                        });
                    }
                    tokio::time::sleep(backoff_delay(attempt, None)).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt >= MAX_RETRIES {
                        return Err(LtmError::ApiError { service: "embedding".to_string(), reason: e.to_string() });
                    }
                    tokio::time::sleep(backoff_delay(attempt, None)).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn backoff_delay(attempt: u32, retry_after_secs: Option<u64>) -> Duration {
    if let Some(secs) = retry_after_secs {
        return Duration::from_secs(secs);
    }
    Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt))
}

#[async_trait]
impl EmbeddingModel for RemoteEmbeddingModel {
    async fn embed_one(&self, text: &str) -> LtmResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(LtmError::invalid_input("empty or whitespace-only input"));
        }
        let results = self.embed_many(&[text.to_string()]).await?;
        results.into_iter().next().ok_or_else(|| LtmError::internal("empty embedding response"))
    }

    async fn embed_many(&self, texts: &[String]) -> LtmResult<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(LtmError::invalid_input("empty or whitespace-only input in batch"));
        }
        let truncated: Vec<String> = texts.iter().map(|t| truncate_input(t, self.max_input_chars)).collect();

        let mut out = Vec::with_capacity(truncated.len());
        for chunk in truncated.chunks(self.batch_size) {
            out.extend(self.embed_chunk(chunk).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
