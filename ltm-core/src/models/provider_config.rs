use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::constants::{DEFAULT_OPERATION_TIMEOUT_SECS, DEFAULT_RETRY_COUNT};

/// Declarative provider record, built at startup from environment and
/// immutable thereafter.
///
/// `primary` is set once during the unified store's initialization
/// (see the startup-selection discussion in the design notes) and not
/// mutated afterward by callers; the store itself may choose a
/// different primary than the one declared here if the declared
/// primary failed to initialize, returning that choice explicitly
/// rather than flipping this flag in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub enabled: bool,
    pub primary: bool,
    /// Backend-specific settings (DSN fragments, API keys, table names, …).
    pub settings: HashMap<String, String>,
    pub retry_count: u32,
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            primary: false,
            settings: HashMap::new(),
            retry_count: DEFAULT_RETRY_COUNT,
            timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
