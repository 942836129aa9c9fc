pub mod embedding;
pub mod provider;

pub use embedding::EmbeddingModel;
pub use provider::{
    ContentHashLookup, DedupAudit, EmergencySearch, FullProvider, ProviderStats, RecentAccess, VectorProvider,
};
