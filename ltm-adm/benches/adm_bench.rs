use std::collections::HashMap;

use chrono::Utc;
use criterion::{criterion_group, criterion_main, Criterion};
use ltm_adm::{AdmContext, AdmEngine};
use ltm_core::config::AdmConfig;

fn bench_score(c: &mut Criterion) {
    let engine = AdmEngine::new(AdmConfig::default());
    let metadata = HashMap::new();
    let content = "I realized we should deploy the api server before the client meeting tomorrow, \
        and the database migration needs a review first.";

    c.bench_function("adm_engine_score", |b| {
        b.iter(|| {
            let ctx = AdmContext {
                content,
                metadata: &metadata,
                created_at: Utc::now(),
                recent_user_memories: &[],
                recent_conversation_memories: &[],
                context_similarities: &[0.4, 0.6],
                historical_prediction_performance: 0.3,
            };
            engine.score(&ctx, Utc::now())
        });
    });
}

criterion_group!(benches, bench_score);
criterion_main!(benches);
