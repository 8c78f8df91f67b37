use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{ProviderId, UserId};
use crate::domains::templates::models::ApprovalStatus;
use crate::kernel::BaseProviderStore;

/// Provider type enum for type-safe querying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "provider_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Twilio,
    Plivo,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::Twilio => write!(f, "twilio"),
            ProviderType::Plivo => write!(f, "plivo"),
        }
    }
}

impl std::str::FromStr for ProviderType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "twilio" => Ok(ProviderType::Twilio),
            "plivo" => Ok(ProviderType::Plivo),
            _ => Err(anyhow::anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// UserProvider model - a messaging-provider account owned by a user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProvider {
    pub id: ProviderId,
    pub user_id: UserId,
    pub name: String,

    /// Secret store reference. Set once at creation, never sent to clients.
    #[serde(skip_serializing)]
    pub provider_credentials: String,

    pub from_phone_number: String,
    pub status: ApprovalStatus,
    pub provider_type: ProviderType,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProvider {
    /// Find provider by ID, returning None if not found
    pub async fn find_by_id_optional(id: ProviderId, pool: &PgPool) -> Result<Option<Self>> {
        let provider = sqlx::query_as::<_, Self>("SELECT * FROM user_providers WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(provider)
    }

    /// Find all providers owned by a user
    pub async fn find_by_owner(user_id: UserId, pool: &PgPool) -> Result<Vec<Self>> {
        let providers = sqlx::query_as::<_, Self>(
            "SELECT * FROM user_providers WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(providers)
    }

    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>> {
        let providers =
            sqlx::query_as::<_, Self>("SELECT * FROM user_providers ORDER BY created_at DESC")
                .fetch_all(pool)
                .await?;
        Ok(providers)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        let provider = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO user_providers (
                id, user_id, name, provider_credentials, from_phone_number,
                status, provider_type, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(self.user_id)
        .bind(&self.name)
        .bind(&self.provider_credentials)
        .bind(&self.from_phone_number)
        .bind(self.status)
        .bind(self.provider_type)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await?;
        Ok(provider)
    }

    pub async fn delete(id: ProviderId, pool: &PgPool) -> Result<()> {
        sqlx::query("DELETE FROM user_providers WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

/// Postgres-backed BaseProviderStore
#[derive(Clone)]
pub struct PgProviderStore {
    pool: PgPool,
}

impl PgProviderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseProviderStore for PgProviderStore {
    async fn find_by_id(&self, id: ProviderId) -> Result<Option<UserProvider>> {
        UserProvider::find_by_id_optional(id, &self.pool).await
    }

    async fn find_by_owner(&self, user_id: UserId) -> Result<Vec<UserProvider>> {
        UserProvider::find_by_owner(user_id, &self.pool).await
    }

    async fn find_all(&self) -> Result<Vec<UserProvider>> {
        UserProvider::find_all(&self.pool).await
    }

    async fn insert(&self, provider: &UserProvider) -> Result<UserProvider> {
        provider.insert(&self.pool).await
    }

    async fn delete(&self, id: ProviderId) -> Result<()> {
        UserProvider::delete(id, &self.pool).await
    }
}
