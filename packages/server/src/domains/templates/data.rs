use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::ProviderId;
use crate::domains::providers::models::ProviderType;
use crate::domains::templates::models::{ApprovalStatus, Platform, Template};

/// Body of `POST /v1/templates` and `PUT /v1/templates/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateInput {
    pub name: String,
    /// Provider content payload (`friendly_name`, `language`, `variables`, `types`)
    pub content: serde_json::Value,
    pub provider_id: ProviderId,
    pub platform: Platform,
    pub provider_type: ProviderType,
}

/// Body of `POST /v1/templates/approve/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApproveTemplateInput {
    pub name: String,
    pub category: String,
}

/// Template as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateData {
    pub id: String,
    pub name: String,
    pub content: serde_json::Value,
    pub status: ApprovalStatus,
    pub platform: Platform,
    pub provider_type: ProviderType,
    pub provider_id: String,
    pub external_id: Option<String>,
    pub next_check: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Template> for TemplateData {
    fn from(template: Template) -> Self {
        Self {
            id: template.id.to_string(),
            name: template.name,
            content: template.content,
            status: template.status,
            platform: template.platform,
            provider_type: template.provider_type,
            provider_id: template.provider_id.to_string(),
            external_id: template.external_id,
            next_check: template.next_check,
            created_at: template.created_at,
            updated_at: template.updated_at,
        }
    }
}

/// Outcome counts of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Templates checked in this pass
    pub due: usize,
    /// Templates whose stored status changed
    pub updated: usize,
    /// Templates whose check failed (kept for the next pass)
    pub failed: usize,
}

/// Form body of a provider alert callback (`POST /v1/templates/webhook/{id}`).
///
/// Only the account sid is required; it has to match the provider's
/// credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProviderAlert {
    pub account_sid: String,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
