//! # ltm-embeddings
//!
//! The two [`ltm_core::traits::EmbeddingModel`] implementations: a
//! [`remote::RemoteEmbeddingModel`] backed by an HTTP embedding API, and
//! a [`mock::MockEmbeddingModel`] that derives a deterministic
//! pseudo-embedding from a hash of the input, used in tests and as a
//! dependency-free default.

pub mod mock;
pub mod remote;

pub use mock::MockEmbeddingModel;
pub use remote::RemoteEmbeddingModel;

/// Truncates input to `max_chars`, logging a warning when truncation
/// actually happens. Shared by both models so truncation behavior never
/// drifts between them.
pub(crate) fn truncate_input(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    tracing::warn!(max_chars, "embedding input truncated");
    text.chars().take(max_chars).collect()
}
