use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use ltm_core::config::AdmConfig;
use ltm_core::memory::Memory;
use ltm_core::models::AdmResult;

use crate::factors::{intelligence, quality, relevance};

/// Everything the engine needs to score one candidate. Borrowed rather
/// than owned: the caller (the Unified Store) already holds this data
/// from its own provider lookups, and scoring happens inline with a
/// single store/query call.
pub struct AdmContext<'a> {
    pub content: &'a str,
    pub metadata: &'a HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    /// Caller's last ≤50 memories, used for user-pattern relevance.
    pub recent_user_memories: &'a [Memory],
    /// Last ≤10 memories in the same conversation.
    pub recent_conversation_memories: &'a [Memory],
    /// Similarity of this candidate against supplied context memories.
    pub context_similarities: &'a [f64],
    pub historical_prediction_performance: f64,
}

/// Computes the weighted triple. Fails on a misconfigured weight set or
/// empty content; the engine converts either into the neutral fallback.
pub fn compute(ctx: &AdmContext, config: &AdmConfig, now: DateTime<Utc>) -> Result<AdmResult, String> {
    if !config.weights_sum_to_one() {
        return Err(format!(
            "ADM weights do not sum to 1.0: quality={} relevance={} intelligence={}",
            config.weight_quality, config.weight_relevance, config.weight_intelligence
        ));
    }
    if ctx.content.trim().is_empty() {
        return Err("cannot score empty content".to_string());
    }

    let data_quality = quality::data_quality(ctx.content, ctx.metadata, ctx.created_at, now).clamp(0.0, 1.0);
    let data_relevance = relevance::data_relevance(
        ctx.content,
        ctx.recent_user_memories,
        ctx.recent_conversation_memories,
        ctx.context_similarities,
    )
    .clamp(0.0, 1.0);
    let data_intelligence =
        intelligence::data_intelligence(ctx.content, ctx.historical_prediction_performance).clamp(0.0, 1.0);

    let adm_score = (config.weight_quality * data_quality
        + config.weight_relevance * data_relevance
        + config.weight_intelligence * data_intelligence)
        .clamp(0.0, 1.0);

    Ok(AdmResult {
        data_quality,
        data_relevance,
        data_intelligence,
        adm_score,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_content() {
        let metadata = HashMap::new();
        let ctx = AdmContext {
            content: "   ",
            metadata: &metadata,
            created_at: Utc::now(),
            recent_user_memories: &[],
            recent_conversation_memories: &[],
            context_similarities: &[],
            historical_prediction_performance: 0.0,
        };
        assert!(compute(&ctx, &AdmConfig::default(), Utc::now()).is_err());
    }

    #[test]
    fn scores_are_bounded() {
        let metadata = HashMap::new();
        let ctx = AdmContext {
            content: "We should deploy the api server tomorrow. I learned a valuable lesson about databases.",
            metadata: &metadata,
            created_at: Utc::now(),
            recent_user_memories: &[],
            recent_conversation_memories: &[],
            context_similarities: &[0.5],
            historical_prediction_performance: 0.5,
        };
        let result = compute(&ctx, &AdmConfig::default(), Utc::now()).unwrap();
        assert!((0.0..=1.0).contains(&result.adm_score));
        assert!(result.error.is_none());
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn every_component_stays_in_the_unit_interval(
                content in "[a-zA-Z0-9 .,:!?\n]{1,400}",
                similarities in proptest::collection::vec(0.0f64..1.0, 0..8),
                performance in 0.0f64..1.0,
            ) {
                prop_assume!(!content.trim().is_empty());
                let metadata = HashMap::new();
                let ctx = AdmContext {
                    content: &content,
                    metadata: &metadata,
                    created_at: Utc::now(),
                    recent_user_memories: &[],
                    recent_conversation_memories: &[],
                    context_similarities: &similarities,
                    historical_prediction_performance: performance,
                };
                let result = compute(&ctx, &AdmConfig::default(), Utc::now()).unwrap();
                prop_assert!((0.0..=1.0).contains(&result.data_quality));
                prop_assert!((0.0..=1.0).contains(&result.data_relevance));
                prop_assert!((0.0..=1.0).contains(&result.data_intelligence));
                prop_assert!((0.0..=1.0).contains(&result.adm_score));
            }
        }
    }
}
