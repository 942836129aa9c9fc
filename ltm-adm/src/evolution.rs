use ltm_core::models::{AdmResult, EvolutionHint, EvolutionStrategy};

/// Five ordered rules, first match wins. `consolidation_threshold` comes
/// from the engine's `AdmConfig` rather than being hardcoded here, since
/// it's the one ADM tunable callers are expected to adjust per tenant.
pub fn decide(adm: &AdmResult, access_count: u64, age_days: f64, consolidation_threshold: f64) -> EvolutionHint {
    if adm.adm_score >= 0.8 && access_count > 5 {
        return EvolutionHint::new(EvolutionStrategy::Reinforcement, 0.9, "high score and frequently accessed");
    }
    if adm.adm_score < 0.2 && access_count == 0 && age_days > 30.0 {
        return EvolutionHint::new(EvolutionStrategy::Pruning, 0.8, "low score, never accessed, stale");
    }
    if (0.4..=0.7).contains(&adm.adm_score) && access_count < 3 {
        return EvolutionHint::new(EvolutionStrategy::Diversification, 0.6, "moderate score, rarely accessed");
    }
    if adm.adm_score >= consolidation_threshold {
        return EvolutionHint::new(EvolutionStrategy::Consolidation, 0.7, "score exceeds consolidation threshold");
    }
    EvolutionHint::new(EvolutionStrategy::Reinforcement, 0.3, "no other rule matched")
}
