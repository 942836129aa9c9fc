use std::collections::HashMap;

use serde_json::Value;

use ltm_core::memory::{SystemMetadata, ADM_METADATA_KEY};
use ltm_core::models::AdmResult;

/// Rebuilds the typed `SystemMetadata` from provider-native columns
/// plus whatever the caller's metadata map happens to carry under
/// [`ADM_METADATA_KEY`]. The ADM value is left in the map too; this
/// is read-only reconstruction, not extraction.
pub fn system_metadata_from_parts(
    metadata: &HashMap<String, Value>,
    user_id: Option<String>,
    conversation_id: Option<String>,
    content_length: usize,
) -> SystemMetadata {
    let adm = metadata
        .get(ADM_METADATA_KEY)
        .and_then(|v| serde_json::from_value::<AdmResult>(v.clone()).ok());
    SystemMetadata {
        user_id,
        conversation_id,
        content_length,
        adm,
    }
}
