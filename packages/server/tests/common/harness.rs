//! Postgres harness for the store tests.
//!
//! One Postgres 16 container is started and migrated on first use and shared
//! by every test in the binary. Tests never truncate: each one works on rows
//! keyed by fresh ids, so they can run in parallel against the same database.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use messenger_core::common::UserId;
use messenger_core::domains::contacts::{Contact, PgContactStore};
use messenger_core::domains::providers::{PgProviderStore, UserProvider};
use messenger_core::domains::templates::{ApprovalStatus, PgTemplateStore, Template};
use messenger_core::kernel::{BaseProviderStore, BaseTemplateStore, TestDependencies};
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct MigratedDatabase {
    url: String,
    _container: ContainerAsync<Postgres>,
}

static DATABASE: OnceCell<MigratedDatabase> = OnceCell::const_new();

async fn start_database() -> Result<MigratedDatabase> {
    // RUST_LOG=debug cargo test -- --ignored --nocapture
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let container = Postgres::default()
        .with_tag("16")
        .start()
        .await
        .context("Failed to start Postgres container")?;

    let url = format!(
        "postgresql://postgres:postgres@{}:{}/postgres",
        container.get_host().await?,
        container.get_host_port_ipv4(5432).await?
    );

    let pool = PgPool::connect(&url).await?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    pool.close().await;

    Ok(MigratedDatabase {
        url,
        _container: container,
    })
}

pub struct TestHarness {
    pub db_pool: PgPool,
    fixtures: TestDependencies,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.db_pool.close().await;
    }
}

impl TestHarness {
    /// Connect a fresh pool to the shared, migrated database.
    pub async fn new() -> Result<Self> {
        let database = DATABASE.get_or_try_init(start_database).await?;
        let db_pool = PgPool::connect(&database.url)
            .await
            .context("Failed to connect to test database")?;

        Ok(Self {
            db_pool,
            fixtures: TestDependencies::new(),
        })
    }

    pub fn providers(&self) -> PgProviderStore {
        PgProviderStore::new(self.db_pool.clone())
    }

    pub fn templates(&self) -> PgTemplateStore {
        PgTemplateStore::new(self.db_pool.clone())
    }

    pub fn contacts(&self) -> PgContactStore {
        PgContactStore::new(self.db_pool.clone())
    }

    /// Persist an approved Twilio provider for a fresh user.
    pub async fn insert_provider(&self) -> UserProvider {
        let provider = self.fixtures.seed_provider(UserId::new());
        self.providers()
            .insert(&provider)
            .await
            .expect("Failed to insert provider")
    }

    pub async fn insert_template(
        &self,
        provider: &UserProvider,
        status: ApprovalStatus,
        next_check: Option<DateTime<Utc>>,
    ) -> Template {
        let template = self
            .fixtures
            .seed_template(provider, status, Some("HX1"), next_check);
        self.templates()
            .insert(&template)
            .await
            .expect("Failed to insert template")
    }

    /// Contacts have no write path in the API, so rows go in directly.
    pub async fn insert_contact(&self, contact: &Contact) {
        sqlx::query(
            "INSERT INTO user_contacts (id, user_id, name, phone_number, email, metadata)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(contact.id)
        .bind(contact.user_id)
        .bind(&contact.name)
        .bind(&contact.phone_number)
        .bind(&contact.email)
        .bind(&contact.metadata)
        .execute(&self.db_pool)
        .await
        .expect("Failed to insert contact");
    }
}
