use ltm_core::memory::Memory;

const TECHNICAL_KEYWORDS: &[&str] = &["code", "function", "api", "bug", "deploy", "server", "database", "algorithm"];
const PERSONAL_KEYWORDS: &[&str] = &["feel", "family", "friend", "home", "birthday", "health", "hobby"];
const BUSINESS_KEYWORDS: &[&str] = &["revenue", "client", "meeting", "contract", "budget", "strategy", "deadline"];

/// Topic alignment against the user's recent memories (already limited
/// to the last ≤50 by the caller) plus a small activity bonus.
pub fn user_pattern_relevance(content: &str, recent_user_memories: &[Memory]) -> f64 {
    if recent_user_memories.is_empty() {
        return 0.0;
    }
    let content_words = word_set(content);
    let overlaps: Vec<f64> = recent_user_memories
        .iter()
        .map(|m| jaccard(&content_words, &word_set(&m.content)))
        .collect();
    let avg_overlap = overlaps.iter().sum::<f64>() / overlaps.len() as f64;
    let activity_bonus = (recent_user_memories.len() as f64 / 50.0 * 0.2).min(0.2);
    (avg_overlap + activity_bonus).clamp(0.0, 1.0)
}

/// Average importance of the last ≤10 memories in the same
/// conversation (0.7) plus a length factor (0.3).
pub fn conversation_coherence(recent_conversation_memories: &[Memory]) -> f64 {
    if recent_conversation_memories.is_empty() {
        return 0.0;
    }
    let avg_importance = recent_conversation_memories
        .iter()
        .map(|m| m.importance_score.value())
        .sum::<f64>()
        / recent_conversation_memories.len() as f64;
    let length_factor = (recent_conversation_memories.len() as f64 / 10.0).min(1.0);
    (0.7 * avg_importance + 0.3 * length_factor).clamp(0.0, 1.0)
}

/// Average similarity against supplied context memories, with a 0.2
/// novelty bonus when the mean similarity lies in `[0.3, 0.8]`: close
/// enough to be relevant, not so close it's a near-duplicate.
pub fn semantic_relevance(context_similarities: &[f64]) -> f64 {
    if context_similarities.is_empty() {
        return 0.0;
    }
    let mean = context_similarities.iter().sum::<f64>() / context_similarities.len() as f64;
    let novelty_bonus = if (0.3..=0.8).contains(&mean) { 0.2 } else { 0.0 };
    (mean + novelty_bonus).clamp(0.0, 1.0)
}

/// Keyword coverage across three built-in topic buckets.
pub fn topic_keyword_relevance(content: &str) -> f64 {
    let lower = content.to_lowercase();
    let buckets = [TECHNICAL_KEYWORDS, PERSONAL_KEYWORDS, BUSINESS_KEYWORDS];
    let hits: usize = buckets
        .iter()
        .map(|bucket| bucket.iter().filter(|kw| lower.contains(*kw)).count())
        .sum();
    let total_keywords: usize = buckets.iter().map(|b| b.len()).sum();
    (hits as f64 / total_keywords as f64 * 5.0).clamp(0.0, 1.0)
}

fn word_set(text: &str) -> std::collections::HashSet<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}

fn jaccard(a: &std::collections::HashSet<String>, b: &std::collections::HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

/// Combines the four sub-signals with weights 0.3 / 0.3 / 0.25 / 0.15.
pub fn data_relevance(
    content: &str,
    recent_user_memories: &[Memory],
    recent_conversation_memories: &[Memory],
    context_similarities: &[f64],
) -> f64 {
    let pattern = user_pattern_relevance(content, recent_user_memories);
    let coherence = conversation_coherence(recent_conversation_memories);
    let semantic = semantic_relevance(context_similarities);
    let topic = topic_keyword_relevance(content);
    (0.3 * pattern + 0.3 * coherence + 0.25 * semantic + 0.15 * topic).clamp(0.0, 1.0)
}
