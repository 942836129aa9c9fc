use ltm_core::config::DedupConfig;
use ltm_core::memory::Memory;

/// What the business rules concluded about a raw candidate match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    Duplicate,
    Unique,
    /// The match is old enough that automatic replacement is unsafe; the
    /// write proceeds and the decision is recorded for human review.
    ReviewNeeded,
}

/// Applies the stage-3 rules to a candidate the earlier stages matched.
///
/// Order matters: the user-scoping rule runs before the age rule so a
/// cross-user match is always reported as unique, never as
/// review-needed, regardless of how stale it is.
pub fn apply(
    candidate_user_id: Option<&str>,
    candidate_importance: Option<f64>,
    existing: &Memory,
    config: &DedupConfig,
) -> (RuleOutcome, &'static str) {
    if let Some(importance) = candidate_importance {
        if (importance - existing.importance_score.value()).abs() > config.importance_delta_guard {
            return (RuleOutcome::Unique, "importance differs beyond guard");
        }
    }

    if candidate_user_id != existing.system.user_id.as_deref() {
        return (RuleOutcome::Unique, "different user");
    }

    if existing.age_days() > config.review_age_days as f64 {
        return (RuleOutcome::ReviewNeeded, "existing memory older than review age");
    }

    (RuleOutcome::Duplicate, "business rules passed")
}
