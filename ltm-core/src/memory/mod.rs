pub mod importance;
pub mod memory;

pub use importance::ImportanceScore;
pub use memory::{Memory, SystemMetadata, ADM_METADATA_KEY};
