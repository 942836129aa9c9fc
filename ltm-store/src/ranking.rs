use std::collections::HashMap;

use ltm_core::config::DistanceMetric;
use ltm_core::constants::{RANK_IMPORTANCE_WEIGHT, RANK_SIMILARITY_WEIGHT};
use ltm_core::memory::Memory;
use ltm_core::vector;

struct Scored {
    memory: Memory,
    similarity: f64,
}

impl Scored {
    fn combined(&self) -> f64 {
        RANK_SIMILARITY_WEIGHT * self.similarity
            + RANK_IMPORTANCE_WEIGHT * self.memory.importance_score.value()
    }
}

/// Merges fan-out results into one ranked list.
///
/// Replicas share ids across providers, so candidates are first deduped
/// by id (keeping the copy with the best similarity), then filtered by
/// `min_similarity`, then ordered by the combined similarity/importance
/// score. Ordering is deterministic for a fixed candidate set: score
/// ties break on id. Returns the ranked page and the pre-truncation
/// match count.
pub(crate) fn merge_and_rank(
    candidates: Vec<Memory>,
    query_embedding: &[f32],
    metric: DistanceMetric,
    min_similarity: f64,
    limit: usize,
) -> (Vec<Memory>, usize) {
    let mut best: HashMap<String, Scored> = HashMap::new();
    for memory in candidates {
        if memory.embedding.is_empty() {
            // A provider that doesn't echo vectors back can't be scored
            // on the caller's similarity scale; dropping beats ranking
            // on garbage.
            continue;
        }
        let similarity = vector::similarity(metric, query_embedding, &memory.embedding);
        if similarity < min_similarity {
            continue;
        }
        match best.get(&memory.id) {
            Some(existing) if existing.similarity >= similarity => {}
            _ => {
                best.insert(memory.id.clone(), Scored { memory, similarity });
            }
        }
    }

    let mut ranked: Vec<Scored> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        b.combined()
            .partial_cmp(&a.combined())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.memory.id.cmp(&b.memory.id))
    });
    let total_found = ranked.len();
    ranked.truncate(limit);
    (ranked.into_iter().map(|s| s.memory).collect(), total_found)
}
