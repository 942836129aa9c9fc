use async_trait::async_trait;

use crate::errors::LtmResult;

/// Polymorphic embedding source. Implementations: a remote model
/// client and a deterministic mock used in tests and as a last-resort
/// fallback.
///
/// Contracts common to every implementation: empty or whitespace-only
/// input fails with `InvalidInput`; input longer than
/// `MAX_EMBEDDING_INPUT_CHARS` is truncated, not rejected; every
/// returned vector has length `dimension()`.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed_one(&self, text: &str) -> LtmResult<Vec<f32>>;

    /// Order-preserving batch embed. Implementations may chunk
    /// internally to a provider-declared maximum batch size; chunking
    /// must be transparent to the caller.
    async fn embed_many(&self, texts: &[String]) -> LtmResult<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;
}
