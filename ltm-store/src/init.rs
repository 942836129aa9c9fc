use std::path::Path;
use std::sync::Arc;

use ltm_adm::AdmEngine;
use ltm_cloud::CloudVectorProvider;
use ltm_core::config::{DistanceMetric, EmbeddingBackend, LtmConfig};
use ltm_core::models::ProviderConfig;
use ltm_core::traits::EmbeddingModel;
use ltm_core::{LtmError, LtmResult};
use ltm_dedup::DedupService;
use ltm_embeddings::{MockEmbeddingModel, RemoteEmbeddingModel};
use ltm_storage::local::LocalProvider;
use ltm_storage::pgvector::PgVectorProvider;

use crate::builder::StoreBuilder;
use crate::engine::UnifiedStore;

/// Builds the store from configuration, usually `LtmConfig::from_env()`.
///
/// Provider selection is explicit and happens exactly once, here:
/// pgvector is the primary when it initializes, the embedded local
/// provider takes over when it doesn't, and the cloud adapter only ever
/// joins as a secondary. An unreachable backend or absent secret
/// downgrades the topology instead of blocking startup; only losing
/// every provider is fatal. The choice is reported by
/// [`UnifiedStore::primary_name`], not written back into any config.
pub async fn init_from_config(config: &LtmConfig) -> LtmResult<UnifiedStore> {
    let dimension = config.embedding.dimension;

    let embedding_model: Arc<dyn EmbeddingModel> = match config.embedding.backend {
        EmbeddingBackend::Remote => Arc::new(RemoteEmbeddingModel::new(&config.embedding)),
        EmbeddingBackend::Mock => {
            Arc::new(MockEmbeddingModel::new(dimension, config.embedding.max_input_chars))
        }
    };

    let mut builder = StoreBuilder::new(dimension)
        .embedding_model(embedding_model)
        .adm_engine(AdmEngine::new(config.adm.clone()))
        .dedup_service(DedupService::new(config.dedup.clone()))
        .store_config(config.store.clone());

    let mut have_primary = false;
    let mut pgvector_is_primary = false;
    if config.pgvector.enabled {
        match PgVectorProvider::connect(&config.pgvector, dimension).await {
            Ok(provider) => {
                builder = builder.primary(ProviderConfig::new("pgvector"), Arc::new(provider));
                have_primary = true;
                pgvector_is_primary = true;
                tracing::info!("pgvector initialized as primary");
            }
            Err(e) => {
                tracing::warn!(error = %e, "pgvector failed to initialize; trying the local fallback as primary");
            }
        }
    }

    if config.local.enabled {
        match LocalProvider::open(
            Path::new(&config.local.db_path),
            dimension,
            config.local.brute_force_threshold,
        ) {
            Ok(provider) => {
                let provider = Arc::new(provider);
                if have_primary {
                    builder = builder.secondary(ProviderConfig::new("local"), provider);
                } else {
                    builder = builder.primary(ProviderConfig::new("local"), provider);
                    have_primary = true;
                    tracing::warn!("local provider selected as primary");
                }
            }
            Err(e) if have_primary => {
                tracing::warn!(error = %e, "local provider failed to initialize; continuing without it");
            }
            Err(e) => return Err(e),
        }
    }

    if !have_primary {
        return Err(LtmError::provider_down(
            "none",
            "no provider initialized; enable pgvector or the local fallback",
        ));
    }

    if config.cloud.enabled {
        builder = builder.secondary(
            ProviderConfig::new("cloud"),
            Arc::new(CloudVectorProvider::new(&config.cloud, dimension)),
        );
    }

    // Ranking converts distances on the primary's metric; the local
    // provider is cosine-only.
    let metric = if pgvector_is_primary {
        config.pgvector.distance_metric
    } else {
        DistanceMetric::Cosine
    };
    builder.distance_metric(metric).build()
}
