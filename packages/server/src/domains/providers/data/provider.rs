use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domains::providers::models::{ProviderType, UserProvider};
use crate::domains::templates::models::ApprovalStatus;

/// Body of `POST /v1/user-providers`
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterProviderInput {
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// Provider-specific credential fields plus the sending number
    pub credentials: serde_json::Value,
}

/// Provider as returned to clients. Never carries the credentials reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderData {
    pub id: String,
    pub name: String,
    pub from_phone_number: String,
    pub status: ApprovalStatus,
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub webhook_url: String,
}

impl ProviderData {
    pub fn from_model(provider: UserProvider, app_url: &str) -> Self {
        Self {
            webhook_url: format!("{}/v1/templates/webhook/{}", app_url, provider.id),
            id: provider.id.to_string(),
            name: provider.name,
            from_phone_number: provider.from_phone_number,
            status: provider.status,
            provider_type: provider.provider_type,
            created_at: provider.created_at,
            updated_at: provider.updated_at,
        }
    }
}
