use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use crate::common::{ProviderId, TemplateId, UserId};
use crate::domains::providers::models::ProviderType;
use crate::kernel::BaseTemplateStore;

/// Approval status shared by templates and provider accounts.
///
/// Provider-reported strings are trusted verbatim once mapped; no transition
/// legality is enforced locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "approval_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Unsubmitted,
    InReview,
    Approved,
    Rejected,
    Paused,
    Disabled,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid status string: {0}")]
pub struct InvalidStatus(pub String);

impl ApprovalStatus {
    /// Map a provider status string into the local vocabulary.
    ///
    /// `received`, `submitted` and `pending` are provider aliases for
    /// `inreview`.
    pub fn from_provider(raw: &str) -> Result<Self, InvalidStatus> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "unsubmitted" => Ok(Self::Unsubmitted),
            "inreview" | "received" | "submitted" | "pending" => Ok(Self::InReview),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "paused" => Ok(Self::Paused),
            "disabled" => Ok(Self::Disabled),
            _ => Err(InvalidStatus(raw.to_string())),
        }
    }

    /// Still waiting on the provider; reconciliation keeps polling.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::InReview)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Approved | Self::Rejected | Self::Paused | Self::Disabled
        )
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApprovalStatus::Unsubmitted => write!(f, "unsubmitted"),
            ApprovalStatus::InReview => write!(f, "inreview"),
            ApprovalStatus::Approved => write!(f, "approved"),
            ApprovalStatus::Rejected => write!(f, "rejected"),
            ApprovalStatus::Paused => write!(f, "paused"),
            ApprovalStatus::Disabled => write!(f, "disabled"),
        }
    }
}

/// Channel a template renders for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "platform")]
pub enum Platform {
    #[serde(rename = "WhatsApp")]
    #[sqlx(rename = "WhatsApp")]
    WhatsApp,
    #[serde(rename = "sms")]
    #[sqlx(rename = "sms")]
    Sms,
    #[serde(rename = "email")]
    #[sqlx(rename = "email")]
    Email,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::WhatsApp => write!(f, "WhatsApp"),
            Platform::Sms => write!(f, "sms"),
            Platform::Email => write!(f, "email"),
        }
    }
}

/// Template model - a message definition tracked against the provider's
/// content approval workflow
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Template {
    pub id: TemplateId,
    pub user_id: UserId,
    pub name: String,
    /// Provider content payload, stored as submitted
    pub content: serde_json::Value,
    pub status: ApprovalStatus,
    pub platform: Platform,
    pub provider_type: ProviderType,
    pub provider_id: ProviderId,
    /// Provider-assigned content id, set once submission succeeds
    pub external_id: Option<String>,
    /// None means not scheduled for reconciliation
    pub next_check: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    pub async fn find_by_id_optional(id: TemplateId, pool: &PgPool) -> Result<Option<Self>> {
        let template = sqlx::query_as::<_, Self>("SELECT * FROM templates WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(template)
    }

    pub async fn find_by_owner(user_id: UserId, pool: &PgPool) -> Result<Vec<Self>> {
        let templates = sqlx::query_as::<_, Self>(
            "SELECT * FROM templates WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(templates)
    }

    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>> {
        let templates =
            sqlx::query_as::<_, Self>("SELECT * FROM templates ORDER BY created_at DESC")
                .fetch_all(pool)
                .await?;
        Ok(templates)
    }

    pub async fn find_by_provider(provider_id: ProviderId, pool: &PgPool) -> Result<Vec<Self>> {
        let templates = sqlx::query_as::<_, Self>(
            "SELECT * FROM templates WHERE provider_id = $1 ORDER BY created_at ASC",
        )
        .bind(provider_id)
        .fetch_all(pool)
        .await?;
        Ok(templates)
    }

    /// Templates due for reconciliation
    pub async fn find_due(now: DateTime<Utc>, pool: &PgPool) -> Result<Vec<Self>> {
        let templates = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM templates
            WHERE next_check IS NOT NULL AND next_check < $1
            ORDER BY next_check ASC
            "#,
        )
        .bind(now)
        .fetch_all(pool)
        .await?;
        Ok(templates)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        let template = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO templates (
                id, user_id, name, content, status, platform, provider_type,
                provider_id, external_id, next_check, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(self.user_id)
        .bind(&self.name)
        .bind(&self.content)
        .bind(self.status)
        .bind(self.platform)
        .bind(self.provider_type)
        .bind(self.provider_id)
        .bind(&self.external_id)
        .bind(self.next_check)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await?;
        Ok(template)
    }

    pub async fn update(&self, pool: &PgPool) -> Result<Self> {
        let template = sqlx::query_as::<_, Self>(
            r#"
            UPDATE templates SET
                name = $2,
                content = $3,
                status = $4,
                platform = $5,
                provider_type = $6,
                provider_id = $7,
                external_id = $8,
                next_check = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(&self.name)
        .bind(&self.content)
        .bind(self.status)
        .bind(self.platform)
        .bind(self.provider_type)
        .bind(self.provider_id)
        .bind(&self.external_id)
        .bind(self.next_check)
        .fetch_one(pool)
        .await?;
        Ok(template)
    }

    pub async fn update_review_state(
        id: TemplateId,
        status: Option<ApprovalStatus>,
        next_check: Option<DateTime<Utc>>,
        pool: &PgPool,
    ) -> Result<Self> {
        let template = sqlx::query_as::<_, Self>(
            r#"
            UPDATE templates SET
                status = COALESCE($2, status),
                next_check = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(next_check)
        .fetch_one(pool)
        .await?;
        Ok(template)
    }

    pub async fn delete(id: TemplateId, pool: &PgPool) -> Result<()> {
        sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

/// Postgres-backed BaseTemplateStore
#[derive(Clone)]
pub struct PgTemplateStore {
    pool: PgPool,
}

impl PgTemplateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseTemplateStore for PgTemplateStore {
    async fn find_by_id(&self, id: TemplateId) -> Result<Option<Template>> {
        Template::find_by_id_optional(id, &self.pool).await
    }

    async fn find_by_owner(&self, user_id: UserId) -> Result<Vec<Template>> {
        Template::find_by_owner(user_id, &self.pool).await
    }

    async fn find_all(&self) -> Result<Vec<Template>> {
        Template::find_all(&self.pool).await
    }

    async fn find_by_provider(&self, provider_id: ProviderId) -> Result<Vec<Template>> {
        Template::find_by_provider(provider_id, &self.pool).await
    }

    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Template>> {
        Template::find_due(now, &self.pool).await
    }

    async fn insert(&self, template: &Template) -> Result<Template> {
        template.insert(&self.pool).await
    }

    async fn update(&self, template: &Template) -> Result<Template> {
        template.update(&self.pool).await
    }

    async fn update_review_state(
        &self,
        id: TemplateId,
        status: Option<ApprovalStatus>,
        next_check: Option<DateTime<Utc>>,
    ) -> Result<Template> {
        Template::update_review_state(id, status, next_check, &self.pool).await
    }

    async fn delete(&self, id: TemplateId) -> Result<()> {
        Template::delete(id, &self.pool).await
    }
}
