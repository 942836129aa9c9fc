use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ltm_core::{LtmError, LtmResult};

/// A write request as the HTTP layer hands it to the core. Everything
/// beyond `content` is optional: a missing embedding is generated, a
/// missing importance score is computed by the ADM engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryRequest {
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub embedding: Option<Vec<f32>>,
    pub importance_score: Option<f64>,
    pub user_id: Option<String>,
    pub conversation_id: Option<String>,
}

impl MemoryRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_importance(mut self, score: f64) -> Self {
        self.importance_score = Some(score);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub(crate) fn validate(&self) -> LtmResult<()> {
        if self.content.trim().is_empty() {
            return Err(LtmError::invalid_input("content must not be empty"));
        }
        if let Some(score) = self.importance_score {
            if !(0.0..=1.0).contains(&score) {
                return Err(LtmError::invalid_input(format!(
                    "importance_score {score} outside [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_is_rejected() {
        assert!(MemoryRequest::new("   ").validate().is_err());
        assert!(MemoryRequest::new("real content").validate().is_ok());
    }

    #[test]
    fn out_of_range_importance_is_rejected() {
        assert!(MemoryRequest::new("x").with_importance(1.5).validate().is_err());
        assert!(MemoryRequest::new("x").with_importance(0.5).validate().is_ok());
    }
}
