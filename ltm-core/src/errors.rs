//! The error taxonomy surfaced to callers of the unified store.
//!
//! Kinds, not types: every outbound failure (provider, embedding model,
//! cache) is mapped into one of these variants before it crosses a
//! component boundary. Internal helper errors (SQL errors, HTTP errors)
//! are folded into `details` strings here rather than kept as distinct
//! nested error types, since nothing downstream needs to match on them.

/// Result alias used throughout the workspace.
pub type LtmResult<T> = Result<T, LtmError>;

#[derive(Debug, thiserror::Error)]
pub enum LtmError {
    /// Empty content, bad similarity bound, malformed filter value.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// No embedding supplied and no embedding model configured/available.
    #[error("no embedding available: {reason}")]
    NoEmbedding { reason: String },

    /// Primary provider unreachable after retries, no fallback available.
    #[error("provider '{provider}' is down: {reason}")]
    ProviderDown { provider: String, reason: String },

    /// Outbound call rejected by rate limiting. Retried internally with
    /// backoff up to the provider's configured retry count; surfaced only
    /// once retries are exhausted.
    #[error("rate limited by {service}: retry after {retry_after_secs:?}s")]
    RateLimited {
        service: String,
        retry_after_secs: Option<u64>,
    },

    /// An outbound call exceeded its deadline.
    #[error("timed out after {elapsed_secs}s calling {operation}")]
    Timeout { operation: String, elapsed_secs: f64 },

    /// A non-rate-limit, non-timeout failure from an external API.
    #[error("{service} API error: {reason}")]
    ApiError { service: String, reason: String },

    /// An id lookup that found nothing.
    #[error("memory '{id}' not found")]
    NotFound { id: String },

    /// Unexpected internal failure. Logged with full context by the
    /// caller; this variant's `Display` is the only thing that should
    /// ever reach an external surface.
    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl LtmError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn no_embedding(reason: impl Into<String>) -> Self {
        Self::NoEmbedding {
            reason: reason.into(),
        }
    }

    pub fn provider_down(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProviderDown {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Whether this error represents a transient outbound failure worth
    /// retrying with backoff (used by the remote embedding client and
    /// provider retry loops).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::ApiError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let e = LtmError::provider_down("pgvector", "connection refused");
        let msg = e.to_string();
        assert!(msg.contains("pgvector"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn retryable_classification() {
        assert!(LtmError::RateLimited {
            service: "embedding".into(),
            retry_after_secs: Some(1)
        }
        .is_retryable());
        assert!(!LtmError::NotFound { id: "x".into() }.is_retryable());
        assert!(!LtmError::invalid_input("empty content").is_retryable());
    }
}
