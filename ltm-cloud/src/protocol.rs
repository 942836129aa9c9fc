//! Versioned wire protocol for the managed vector service: JSON with
//! forward compatibility.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current protocol version.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Envelope for every outbound request.
#[derive(Debug, Clone, Serialize)]
pub struct CloudRequest<T: Serialize> {
    /// Protocol version for forward compatibility.
    pub version: String,
    /// Unique request ID for tracing.
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub payload: T,
}

impl<T: Serialize> CloudRequest<T> {
    pub fn new(payload: T) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            request_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Envelope for every response.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudResponse<T> {
    pub version: String,
    /// Echoed request ID.
    pub request_id: String,
    pub success: bool,
    /// Error message if `success` is false.
    pub error: Option<String>,
    pub data: Option<T>,
}

/// One vector upsert. The remote only accepts string metadata values,
/// so the provider stringifies everything before it reaches this type.
#[derive(Debug, Clone, Serialize)]
pub struct UpsertPayload {
    pub id: String,
    pub content: String,
    pub values: Vec<f32>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertAck {
    pub upserted: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryPayload {
    pub vector: Vec<f32>,
    pub top_k: usize,
    /// Equality filters on stringified metadata keys.
    pub filter: HashMap<String, String>,
    /// Ask the remote to echo stored vectors back so the caller can
    /// re-rank locally on its own similarity scale.
    pub include_values: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryMatches {
    pub matches: Vec<CloudMatch>,
}

/// One similarity hit from the remote.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudMatch {
    pub id: String,
    pub score: f64,
    pub content: String,
    #[serde(default)]
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteAck {
    pub deleted: usize,
}
