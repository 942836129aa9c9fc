use std::sync::Arc;
use std::time::Duration;

use ltm_adm::AdmEngine;
use ltm_core::config::{AdmConfig, DedupConfig, DistanceMetric, StoreConfig};
use ltm_core::models::ProviderConfig;
use ltm_core::traits::{EmbeddingModel, FullProvider, VectorProvider};
use ltm_core::{LtmError, LtmResult};
use ltm_dedup::DedupService;

use crate::engine::UnifiedStore;

/// One registered backend as the engine sees it: the declarative config
/// record plus the trait object used on the fan-out path.
pub(crate) struct ProviderEntry {
    pub config: ProviderConfig,
    pub provider: Arc<dyn VectorProvider>,
}

/// Assembles a [`UnifiedStore`] from explicitly chosen parts. The
/// environment-driven path (`init_from_config`) goes through this too;
/// tests and embedders wire their own providers directly.
///
/// The primary is an explicit builder argument, not a flag toggled on a
/// config record: whoever builds the store decides which backend is
/// authoritative, and that choice is immutable for the store's lifetime.
pub struct StoreBuilder {
    dimension: usize,
    primary: Option<(ProviderConfig, Arc<dyn FullProvider>, Arc<dyn VectorProvider>)>,
    secondaries: Vec<ProviderEntry>,
    embedding_model: Option<Arc<dyn EmbeddingModel>>,
    adm: Option<AdmEngine>,
    dedup: Option<DedupService>,
    store_config: StoreConfig,
    metric: DistanceMetric,
}

impl StoreBuilder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            primary: None,
            secondaries: Vec::new(),
            embedding_model: None,
            adm: None,
            dedup: None,
            store_config: StoreConfig::default(),
            metric: DistanceMetric::default(),
        }
    }

    /// Registers the authoritative backend. Must carry the full
    /// capability set: the recency path, hash lookups, the audit trail,
    /// and emergency search all run against the primary.
    pub fn primary<P>(mut self, config: ProviderConfig, provider: Arc<P>) -> Self
    where
        P: FullProvider + 'static,
    {
        let full: Arc<dyn FullProvider> = provider.clone();
        let base: Arc<dyn VectorProvider> = provider;
        self.primary = Some((config, full, base));
        self
    }

    /// Registers a replication target / fan-out participant.
    pub fn secondary<P>(mut self, config: ProviderConfig, provider: Arc<P>) -> Self
    where
        P: VectorProvider + 'static,
    {
        self.secondaries.push(ProviderEntry {
            config,
            provider,
        });
        self
    }

    pub fn embedding_model(mut self, model: Arc<dyn EmbeddingModel>) -> Self {
        self.embedding_model = Some(model);
        self
    }

    pub fn adm_engine(mut self, engine: AdmEngine) -> Self {
        self.adm = Some(engine);
        self
    }

    pub fn dedup_service(mut self, service: DedupService) -> Self {
        self.dedup = Some(service);
        self
    }

    pub fn store_config(mut self, config: StoreConfig) -> Self {
        self.store_config = config;
        self
    }

    pub fn distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn build(self) -> LtmResult<UnifiedStore> {
        let (primary_config, primary, primary_base) = self.primary.ok_or_else(|| {
            LtmError::provider_down("none", "no primary provider was registered")
        })?;

        let mut providers = Vec::with_capacity(self.secondaries.len() + 1);
        providers.push(ProviderEntry {
            config: primary_config.clone(),
            provider: primary_base,
        });
        providers.extend(self.secondaries);

        let replication_timeout = Duration::from_secs(self.store_config.replication_timeout_secs);
        Ok(UnifiedStore::assemble(
            self.dimension,
            primary,
            primary_config,
            providers,
            self.embedding_model,
            self.adm.unwrap_or_else(|| AdmEngine::new(AdmConfig::default())),
            self.dedup.unwrap_or_else(|| DedupService::new(DedupConfig::default())),
            self.store_config,
            self.metric,
            replication_timeout,
        ))
    }
}
