use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_EMBEDDING_BATCH_SIZE, DEFAULT_EMBEDDING_DIM, MAX_EMBEDDING_INPUT_CHARS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    Remote,
    Mock,
}

impl Default for EmbeddingBackend {
    fn default() -> Self {
        Self::Mock
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub dimension: usize,
    pub batch_size: usize,
    pub max_input_chars: usize,
    /// Base URL for the remote backend; ignored by the mock.
    pub api_base: Option<String>,
    /// Name of the environment variable holding the remote API key, not
    /// the key itself.
    pub api_key_env: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            dimension: DEFAULT_EMBEDDING_DIM,
            batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            max_input_chars: MAX_EMBEDDING_INPUT_CHARS,
            api_base: None,
            api_key_env: "LTM_EMBEDDING_API_KEY".to_string(),
        }
    }
}
