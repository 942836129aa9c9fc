use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::memory::ImportanceScore;
use crate::models::AdmResult;

/// Key under which the unified store embeds the ADM triple in a
/// memory's metadata map. Providers read it back out when
/// reconstructing [`SystemMetadata`], so the typed sub-struct and the
/// opaque map stay in sync without the providers knowing anything
/// about ADM scoring itself.
pub const ADM_METADATA_KEY: &str = "_adm";

/// Fields the core itself writes, kept separate from caller-supplied
/// metadata so that schema evolution of one never collides with the
/// other (the source system keeps both in one JSON blob; splitting
/// them here is deliberate).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemMetadata {
    pub user_id: Option<String>,
    pub conversation_id: Option<String>,
    pub content_length: usize,
    pub adm: Option<AdmResult>,
}

/// The fundamental persisted entity: content, its embedding, caller
/// metadata, an importance score, and access bookkeeping.
///
/// `content_hash` is derived (`SHA-256` of normalized content) and
/// stored alongside rather than recomputed on every dedup lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub system: SystemMetadata,
    pub importance_score: ImportanceScore,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u64,
}

impl Memory {
    /// Normalizes content the same way for both hashing and dedup
    /// comparison: lowercase, trimmed. Whitespace collapsing beyond
    /// trimming is intentionally not performed, since it would let two
    /// materially different memories collide.
    pub fn normalize_content(content: &str) -> String {
        content.trim().to_lowercase()
    }

    pub fn hash_content(content: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(Self::normalize_content(content).as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn record_access(&mut self) {
        self.access_count += 1;
        self.last_accessed = Utc::now();
    }

    pub fn age_days(&self) -> f64 {
        (Utc::now() - self.created_at).num_seconds() as f64 / 86_400.0
    }

    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}
