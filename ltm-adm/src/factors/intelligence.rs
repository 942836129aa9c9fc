const MODAL_KEYWORDS: &[&str] = &["should", "must", "need to", "todo", "action", "will", "plan to"];
const REFLECTION_KEYWORDS: &[&str] = &["learned", "realized", "understand", "insight", "lesson", "reflect"];
const FORECAST_KEYWORDS: &[&str] = &["predict", "expect", "forecast", "will likely", "anticipate", "projected"];

/// Surface-feature density proxying named-entity richness: capitalized
/// multi-word runs and numeric tokens, scaled by word count.
pub fn knowledge_density(content: &str) -> f64 {
    let words: Vec<&str> = content.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }
    let entity_like = words
        .iter()
        .filter(|w| w.chars().next().map(char::is_uppercase).unwrap_or(false) || w.chars().any(|c| c.is_ascii_digit()))
        .count();
    (entity_like as f64 / words.len() as f64 * 5.0).clamp(0.0, 1.0)
}

/// Modal/imperative keyword density plus a temporal-context bonus.
pub fn actionability(content: &str) -> f64 {
    let lower = content.to_lowercase();
    let hits = MODAL_KEYWORDS.iter().filter(|kw| lower.contains(*kw)).count();
    let temporal_bonus = if lower.contains("today") || lower.contains("tomorrow") || lower.contains("next week") {
        0.2
    } else {
        0.0
    };
    (hits as f64 / 10.0 + temporal_bonus).clamp(0.0, 1.0)
}

/// Reflection keyword density plus a complexity bonus for longer content.
pub fn learning_potential(content: &str) -> f64 {
    let lower = content.to_lowercase();
    let hits = REFLECTION_KEYWORDS.iter().filter(|kw| lower.contains(*kw)).count();
    let complexity_bonus = if content.chars().count() > 200 { 0.1 } else { 0.0 };
    (hits as f64 / 8.0 + complexity_bonus).clamp(0.0, 1.0)
}

/// Forecast keyword density plus a bonus proportional to historical
/// prediction performance supplied by the caller (0.0 if unknown).
pub fn prediction_value(content: &str, historical_performance: f64) -> f64 {
    let lower = content.to_lowercase();
    let hits = FORECAST_KEYWORDS.iter().filter(|kw| lower.contains(*kw)).count();
    let performance_bonus = historical_performance.clamp(0.0, 1.0) * 0.2;
    (hits as f64 / 8.0 + performance_bonus).clamp(0.0, 1.0)
}

/// Combines the four sub-signals with weights 0.3 / 0.25 / 0.25 / 0.2.
pub fn data_intelligence(content: &str, historical_prediction_performance: f64) -> f64 {
    let density = knowledge_density(content);
    let action = actionability(content);
    let learning = learning_potential(content);
    let prediction = prediction_value(content, historical_prediction_performance);
    (0.3 * density + 0.25 * action + 0.25 * learning + 0.2 * prediction).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_has_zero_density() {
        assert_eq!(knowledge_density(""), 0.0);
    }

    #[test]
    fn actionable_content_scores_above_plain_content() {
        let actionable = actionability("I should fix this today, we must deploy tomorrow");
        let plain = actionability("the sky is blue");
        assert!(actionable > plain);
    }

    #[test]
    fn reflection_keywords_increase_learning_potential() {
        let reflective = learning_potential("I learned a valuable lesson and realized my mistake");
        assert!(reflective > 0.0);
    }
}
