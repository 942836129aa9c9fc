use ltm_core::config::DedupConfig;
use ltm_core::memory::Memory;
use ltm_core::models::{DedupDecision, DedupMode, QueryFilters};
use ltm_core::traits::FullProvider;
use ltm_core::vector::cosine_similarity;
use ltm_core::LtmResult;

use crate::rules::{self, RuleOutcome};

/// An incoming memory as seen by the pipeline: the id is pre-assigned
/// by the unified store so the audit trail can reference the candidate
/// even when the write is subsequently blocked.
pub struct DedupCandidate<'a> {
    pub id: &'a str,
    pub content: &'a str,
    pub embedding: &'a [f32],
    pub user_id: Option<&'a str>,
    pub importance_score: Option<f64>,
}

pub struct DedupService {
    config: DedupConfig,
}

impl DedupService {
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    pub fn mode(&self) -> DedupMode {
        self.config.mode
    }

    /// Runs the full pipeline against the primary provider and records
    /// the decision in the audit table. Never fails: audit errors are
    /// logged and the decision is returned regardless, and a candidate
    /// the pipeline cannot assess is reported as non-duplicate.
    pub async fn evaluate(
        &self,
        candidate: &DedupCandidate<'_>,
        provider: &dyn FullProvider,
    ) -> DedupDecision {
        let content_hash = Memory::hash_content(candidate.content);
        if self.config.mode == DedupMode::Off {
            return DedupDecision::unique(content_hash, "deduplication disabled");
        }

        let decision = self.run_stages(candidate, content_hash, provider).await;

        if let Err(e) = provider.record_decision(candidate.id, &decision).await {
            tracing::warn!(candidate_id = %candidate.id, error = %e, "dedup audit write failed");
        }
        tracing::debug!(
            candidate_id = %candidate.id,
            is_duplicate = decision.is_duplicate,
            reason = %decision.reason,
            "dedup decision"
        );
        decision
    }

    async fn run_stages(
        &self,
        candidate: &DedupCandidate<'_>,
        content_hash: String,
        provider: &dyn FullProvider,
    ) -> DedupDecision {
        // Stage 1: exact match on the normalized content hash.
        if let Some(existing) = provider.lookup_by_hash(&content_hash).await {
            return self.judge_match(candidate, &existing, 1.0, None, content_hash);
        }

        // Stage 2: single nearest neighbour against the primary.
        if candidate.embedding.is_empty() {
            return DedupDecision::failed_open(content_hash, "no embedding available for semantic match");
        }
        let neighbours = provider
            .query(candidate.embedding, 1, &QueryFilters::default())
            .await;
        let Some(nearest) = neighbours.into_iter().next() else {
            return DedupDecision::unique(content_hash, "no stored memories to compare against");
        };
        if nearest.embedding.is_empty() {
            return DedupDecision::unique(content_hash, "nearest neighbour carries no embedding");
        }

        let similarity = cosine_similarity(candidate.embedding, &nearest.embedding);
        if similarity < self.config.similarity_threshold {
            let mut decision = DedupDecision::unique(content_hash, "below similarity threshold");
            decision.similarity_score = Some(similarity);
            return decision;
        }

        self.judge_match(candidate, &nearest, similarity, Some(similarity), content_hash)
    }

    /// Stage 3: the business rules, applied to exact and semantic
    /// matches alike. An exact content hit for a different user is
    /// still that user's own memory, not a duplicate.
    fn judge_match(
        &self,
        candidate: &DedupCandidate<'_>,
        existing: &Memory,
        confidence: f64,
        similarity: Option<f64>,
        content_hash: String,
    ) -> DedupDecision {
        let (outcome, reason) = rules::apply(
            candidate.user_id,
            candidate.importance_score,
            existing,
            &self.config,
        );
        match outcome {
            RuleOutcome::Duplicate => DedupDecision::duplicate(
                existing.id.clone(),
                confidence,
                if similarity.is_some() { "semantic match" } else { "exact content hash match" },
                content_hash,
                similarity,
            ),
            RuleOutcome::Unique => {
                let mut decision = DedupDecision::unique(content_hash, reason);
                decision.similarity_score = similarity;
                decision
            }
            RuleOutcome::ReviewNeeded => DedupDecision {
                is_duplicate: false,
                existing_memory_id: Some(existing.id.clone()),
                confidence: 0.5,
                reason: format!("review needed: {reason}"),
                content_hash,
                similarity_score: similarity,
            },
        }
    }

    /// Flags a past audit record as a false positive. The only effect is
    /// the audit record's `reviewed` flag; nothing feeds back into the
    /// similarity threshold or scoring.
    pub async fn mark_false_positive(
        &self,
        audit_id: &str,
        provider: &dyn FullProvider,
    ) -> LtmResult<()> {
        provider.mark_false_positive(audit_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use ltm_core::memory::SystemMetadata;
    use ltm_core::models::ProviderHealth;
    use ltm_core::traits::{
        ContentHashLookup, DedupAudit, EmergencySearch, ProviderStats, RecentAccess, VectorProvider,
    };
    use ltm_core::LtmError;

    use super::*;

    /// Minimal in-memory primary for pipeline tests. Cosine search over
    /// everything stored, hash lookups over a side map, audit records
    /// collected for assertions.
    #[derive(Default)]
    struct FakePrimary {
        memories: Mutex<Vec<Memory>>,
        audits: Mutex<Vec<DedupDecision>>,
        fail_audit: bool,
    }

    impl FakePrimary {
        fn insert(&self, content: &str, embedding: Vec<f32>, user_id: Option<&str>, importance: f64, age_days: i64) -> String {
            let created_at = chrono::Utc::now() - chrono::Duration::days(age_days);
            let id = format!("mem-{}", self.memories.lock().unwrap().len());
            let memory = Memory {
                id: id.clone(),
                content: content.to_string(),
                embedding,
                metadata: HashMap::new(),
                system: SystemMetadata {
                    user_id: user_id.map(str::to_string),
                    conversation_id: None,
                    content_length: content.chars().count(),
                    adm: None,
                },
                importance_score: importance.into(),
                content_hash: Memory::hash_content(content),
                created_at,
                last_accessed: created_at,
                access_count: 0,
            };
            self.memories.lock().unwrap().push(memory);
            id
        }
    }

    #[async_trait]
    impl VectorProvider for FakePrimary {
        fn name(&self) -> &str {
            "fake"
        }

        async fn store(&self, _: &str, _: &[f32], _: HashMap<String, Value>) -> LtmResult<String> {
            unimplemented!("pipeline tests never store through the provider")
        }

        async fn query(&self, query_embedding: &[f32], limit: usize, _: &QueryFilters) -> Vec<Memory> {
            let mut scored: Vec<(f64, Memory)> = self
                .memories
                .lock()
                .unwrap()
                .iter()
                .map(|m| (cosine_similarity(query_embedding, &m.embedding), m.clone()))
                .collect();
            scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
            scored.into_iter().take(limit).map(|(_, m)| m).collect()
        }

        async fn get_by_id(&self, id: &str) -> LtmResult<Memory> {
            self.memories
                .lock()
                .unwrap()
                .iter()
                .find(|m| m.id == id)
                .cloned()
                .ok_or_else(|| LtmError::not_found(id))
        }

        async fn delete(&self, _: &str) -> LtmResult<bool> {
            Ok(false)
        }

        async fn health_check(&self) -> ProviderHealth {
            ProviderHealth::healthy(self.name())
        }

        async fn get_stats(&self) -> ProviderStats {
            ProviderStats {
                health: ProviderHealth::healthy(self.name()),
                features: vec![],
            }
        }
    }

    #[async_trait]
    impl RecentAccess for FakePrimary {
        async fn get_recent(&self, limit: usize, _: usize) -> Vec<Memory> {
            self.memories.lock().unwrap().iter().rev().take(limit).cloned().collect()
        }
    }

    #[async_trait]
    impl ContentHashLookup for FakePrimary {
        async fn lookup_by_hash(&self, content_hash: &str) -> Option<Memory> {
            self.memories
                .lock()
                .unwrap()
                .iter()
                .find(|m| m.content_hash == content_hash)
                .cloned()
        }
    }

    #[async_trait]
    impl DedupAudit for FakePrimary {
        async fn record_decision(&self, _: &str, decision: &DedupDecision) -> LtmResult<String> {
            if self.fail_audit {
                return Err(LtmError::internal("audit table unavailable"));
            }
            self.audits.lock().unwrap().push(decision.clone());
            Ok("audit-0".to_string())
        }

        async fn mark_false_positive(&self, _: &str) -> LtmResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl EmergencySearch for FakePrimary {
        async fn emergency_all(&self, limit: usize) -> Vec<Memory> {
            self.get_recent(limit, 0).await
        }

        async fn emergency_text(&self, _: &str, _: usize) -> Vec<Memory> {
            Vec::new()
        }

        async fn emergency_fuzzy(&self, _: &str, _: usize) -> Vec<Memory> {
            Vec::new()
        }
    }

    fn active_service() -> DedupService {
        DedupService::new(DedupConfig {
            mode: DedupMode::Active,
            ..DedupConfig::default()
        })
    }

    fn candidate<'a>(content: &'a str, embedding: &'a [f32], user_id: Option<&'a str>) -> DedupCandidate<'a> {
        DedupCandidate {
            id: "candidate-1",
            content,
            embedding,
            user_id,
            importance_score: None,
        }
    }

    #[tokio::test]
    async fn normalized_exact_match_is_a_duplicate() {
        let provider = FakePrimary::default();
        let existing_id = provider.insert("Hello, World!", vec![1.0, 0.0], None, 0.5, 1);

        let service = active_service();
        let decision = service
            .evaluate(&candidate("  hello, world!  ", &[1.0, 0.0], None), &provider)
            .await;

        assert!(decision.is_duplicate);
        assert_eq!(decision.existing_memory_id.as_deref(), Some(existing_id.as_str()));
        assert_eq!(decision.confidence, 1.0);
    }

    #[tokio::test]
    async fn exact_match_for_another_user_stays_unique() {
        let provider = FakePrimary::default();
        provider.insert("shared note", vec![1.0, 0.0], Some("bob"), 0.5, 1);

        let decision = active_service()
            .evaluate(&candidate("shared note", &[1.0, 0.0], Some("alice")), &provider)
            .await;

        assert!(!decision.is_duplicate);
        assert_eq!(decision.reason, "different user");
    }

    #[tokio::test]
    async fn near_identical_embedding_above_threshold_is_a_duplicate() {
        let provider = FakePrimary::default();
        let existing_id = provider.insert("the cat purred", vec![1.0, 0.01], None, 0.5, 1);

        let decision = active_service()
            .evaluate(&candidate("a cat was purring", &[1.0, 0.0], None), &provider)
            .await;

        assert!(decision.is_duplicate);
        assert_eq!(decision.existing_memory_id.as_deref(), Some(existing_id.as_str()));
        assert!(decision.similarity_score.unwrap() > 0.95);
    }

    #[tokio::test]
    async fn dissimilar_embedding_stays_unique() {
        let provider = FakePrimary::default();
        provider.insert("the cat purred", vec![1.0, 0.0], None, 0.5, 1);

        let decision = active_service()
            .evaluate(&candidate("quarterly revenue report", &[0.0, 1.0], None), &provider)
            .await;

        assert!(!decision.is_duplicate);
        assert_eq!(decision.reason, "below similarity threshold");
    }

    #[tokio::test]
    async fn stale_match_is_flagged_for_review_not_blocked() {
        let provider = FakePrimary::default();
        let existing_id = provider.insert("old decision record", vec![1.0, 0.0], None, 0.5, 60);

        let decision = active_service()
            .evaluate(&candidate("old decision record", &[1.0, 0.0], None), &provider)
            .await;

        assert!(!decision.is_duplicate);
        assert!(decision.reason.starts_with("review needed"));
        assert_eq!(decision.existing_memory_id.as_deref(), Some(existing_id.as_str()));
    }

    #[tokio::test]
    async fn off_mode_skips_pipeline_and_audit() {
        let provider = FakePrimary::default();
        provider.insert("hello", vec![1.0, 0.0], None, 0.5, 1);

        let service = DedupService::new(DedupConfig::default());
        let decision = service.evaluate(&candidate("hello", &[1.0, 0.0], None), &provider).await;

        assert!(!decision.is_duplicate);
        assert!(provider.audits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn audit_failure_does_not_block_the_decision() {
        let provider = FakePrimary {
            fail_audit: true,
            ..FakePrimary::default()
        };
        provider.insert("hello", vec![1.0, 0.0], None, 0.5, 1);

        let decision = active_service()
            .evaluate(&candidate("hello", &[1.0, 0.0], None), &provider)
            .await;

        assert!(decision.is_duplicate);
    }

    #[tokio::test]
    async fn every_assessed_decision_is_audited() {
        let provider = FakePrimary::default();
        provider.insert("first", vec![1.0, 0.0], None, 0.5, 1);

        let service = active_service();
        service.evaluate(&candidate("first", &[1.0, 0.0], None), &provider).await;
        service.evaluate(&candidate("unrelated", &[0.0, 1.0], None), &provider).await;

        assert_eq!(provider.audits.lock().unwrap().len(), 2);
    }
}
