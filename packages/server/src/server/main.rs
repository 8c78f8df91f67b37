// Main entry point for the messenger API server

use std::sync::Arc;

use anyhow::{Context, Result};
use messenger_core::common::WorkerPool;
use messenger_core::domains::auth::JwtService;
use messenger_core::domains::contacts::PgContactStore;
use messenger_core::domains::providers::PgProviderStore;
use messenger_core::domains::templates::PgTemplateStore;
use messenger_core::kernel::{
    start_scheduler, GoogleSecretManager, ServerDeps, ServiceAccountKey, TwilioClientFactory,
};
use messenger_core::server::{build_app, AppState};
use messenger_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,messenger_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting messenger API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let service_account = ServiceAccountKey::from_json(&config.google_credentials)
        .context("GOOGLE_CREDENTIALS is not a valid service-account key")?;
    tracing::info!(project_id = %service_account.project_id, "Secret manager configured");
    let secrets = GoogleSecretManager::new(service_account, &config.branch_name);

    let deps = ServerDeps::new(
        Arc::new(PgProviderStore::new(pool.clone())),
        Arc::new(PgTemplateStore::new(pool.clone())),
        Arc::new(PgContactStore::new(pool.clone())),
        Arc::new(secrets),
        Arc::new(TwilioClientFactory::new()),
        Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone())),
        config.app_url.clone(),
        WorkerPool::new(config.dispatch_workers)?,
        WorkerPool::new(config.validation_workers)?,
        WorkerPool::new(config.reconcile_workers)?,
        config.template_recheck()?,
    );

    // Keep the scheduler alive for the lifetime of the server
    let _scheduler = start_scheduler(deps.clone(), &config.reconcile_schedule)
        .await
        .context("Failed to start scheduled tasks")?;

    let app = build_app(AppState::new(deps, Some(pool)), &config.allowed_origins);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
