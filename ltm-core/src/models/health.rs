use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse health state reported per provider and rolled up for the
/// whole store. `Disabled` is distinct from `Error`: a disabled
/// provider was never asked to do anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Error,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub name: String,
    pub status: HealthStatus,
    pub last_checked: DateTime<Utc>,
    pub detail: Option<String>,
}

impl ProviderHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Healthy,
            last_checked: Utc::now(),
            detail: None,
        }
    }

    pub fn unhealthy(
        name: impl Into<String>,
        status: HealthStatus,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            status,
            last_checked: Utc::now(),
            detail: Some(detail.into()),
        }
    }
}

/// Aggregate health across all configured providers. The store is
/// `Healthy` only if its primary is healthy; a healthy secondary can't
/// compensate for a down primary, but a degraded secondary alone
/// doesn't pull the whole store down either.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreHealth {
    pub overall: HealthStatus,
    pub providers: Vec<ProviderHealth>,
    pub checked_at: DateTime<Utc>,
}

impl StoreHealth {
    pub fn from_providers(providers: Vec<ProviderHealth>, primary_name: &str) -> Self {
        let primary_status = providers
            .iter()
            .find(|p| p.name == primary_name)
            .map(|p| p.status)
            .unwrap_or(HealthStatus::Error);
        let secondary_trouble = providers.iter().any(|p| {
            p.name != primary_name
                && matches!(p.status, HealthStatus::Degraded | HealthStatus::Error)
        });
        let overall = match primary_status {
            HealthStatus::Healthy if secondary_trouble => HealthStatus::Degraded,
            HealthStatus::Healthy => HealthStatus::Healthy,
            HealthStatus::Degraded => HealthStatus::Degraded,
            HealthStatus::Error | HealthStatus::Disabled => HealthStatus::Error,
        };
        Self {
            overall,
            providers,
            checked_at: Utc::now(),
        }
    }
}
