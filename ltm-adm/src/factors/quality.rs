use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use ltm_core::constants::ADM_FRESHNESS_HALF_LIFE_DAYS;

const CONTENT_LENGTH_CAP: f64 = 500.0;
const TARGET_WORDS_PER_SENTENCE: f64 = 15.0;

/// Blend of length, sentence-complexity, and lexical-diversity signals.
pub fn content_quality(content: &str) -> f64 {
    let length_score = logistic(content.chars().count() as f64, CONTENT_LENGTH_CAP);
    let complexity_score = sentence_complexity(content);
    let diversity_score = unique_word_ratio(content);
    (0.4 * length_score + 0.3 * complexity_score + 0.3 * diversity_score).clamp(0.0, 1.0)
}

fn logistic(value: f64, cap: f64) -> f64 {
    if cap <= 0.0 {
        return 0.0;
    }
    1.0 / (1.0 + (-(value / cap - 0.5) * 6.0).exp())
}

fn sentence_complexity(content: &str) -> f64 {
    let sentences: Vec<&str> = content
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.is_empty() {
        return 0.0;
    }
    let avg_words = sentences
        .iter()
        .map(|s| s.split_whitespace().count() as f64)
        .sum::<f64>()
        / sentences.len() as f64;
    let distance = (avg_words - TARGET_WORDS_PER_SENTENCE).abs() / TARGET_WORDS_PER_SENTENCE;
    (1.0 - distance).clamp(0.0, 1.0)
}

fn unique_word_ratio(content: &str) -> f64 {
    let words: Vec<String> = content.split_whitespace().map(|w| w.to_lowercase()).collect();
    if words.is_empty() {
        return 0.0;
    }
    let unique: std::collections::HashSet<&String> = words.iter().collect();
    unique.len() as f64 / words.len() as f64
}

/// Weighted presence of core fields (0.7) and enrichment fields (0.3).
pub fn metadata_completeness(metadata: &HashMap<String, Value>) -> f64 {
    const CORE: &[&str] = &["user_id", "conversation_id", "created_at"];
    const ENRICHMENT: &[&str] = &["importance_score", "topic", "sentiment", "entities", "context"];

    let core_present = CORE.iter().filter(|k| metadata.contains_key(**k)).count() as f64 / CORE.len() as f64;
    let enrichment_present =
        ENRICHMENT.iter().filter(|k| metadata.contains_key(**k)).count() as f64 / ENRICHMENT.len() as f64;

    (0.7 * core_present + 0.3 * enrichment_present).clamp(0.0, 1.0)
}

/// Exponential decay from `created_at` with a 30-day half-life.
pub fn temporal_freshness(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_days = (now - created_at).num_seconds().max(0) as f64 / 86_400.0;
    (-age_days / ADM_FRESHNESS_HALF_LIFE_DAYS * std::f64::consts::LN_2).exp().clamp(0.0, 1.0)
}

/// Heuristic structural signals averaged: multiline, key/value markers,
/// digits, capitalization, minimum word count.
pub fn structural_consistency(content: &str) -> f64 {
    let checks = [
        content.contains('\n'),
        content.contains(':') || content.contains('='),
        content.chars().any(|c| c.is_ascii_digit()),
        content.chars().any(|c| c.is_uppercase()),
        content.split_whitespace().count() >= 5,
    ];
    checks.iter().filter(|c| **c).count() as f64 / checks.len() as f64
}

/// Combines the four sub-signals with weights 0.4 / 0.2 / 0.2 / 0.2.
pub fn data_quality(
    content: &str,
    metadata: &HashMap<String, Value>,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    let quality = content_quality(content);
    let completeness = metadata_completeness(metadata);
    let freshness = temporal_freshness(created_at, now);
    let structure = structural_consistency(content);
    (0.4 * quality + 0.2 * completeness + 0.2 * freshness + 0.2 * structure).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_scores_low_complexity() {
        assert_eq!(sentence_complexity(""), 0.0);
    }

    #[test]
    fn metadata_completeness_full_set_is_one() {
        let mut m = HashMap::new();
        for k in ["user_id", "conversation_id", "created_at", "importance_score", "topic", "sentiment", "entities", "context"] {
            m.insert(k.to_string(), Value::Bool(true));
        }
        assert_eq!(metadata_completeness(&m), 1.0);
    }

    #[test]
    fn freshness_decays_over_time() {
        let now = Utc::now();
        let fresh = temporal_freshness(now, now);
        let old = temporal_freshness(now - chrono::Duration::days(60), now);
        assert!(fresh > old);
    }
}
