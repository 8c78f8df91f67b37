use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

/// Upper bound for TEMPLATE_RECHECK_SECS (30 days)
const MAX_TEMPLATE_RECHECK_SECS: i64 = 30 * 24 * 60 * 60;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Public base URL, used to build provider webhook URLs
    pub app_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    /// Service-account JSON for Google Secret Manager
    pub google_credentials: String,
    /// Namespaces generated secret ids per deployment
    pub branch_name: String,
    pub allowed_origins: Vec<String>,
    pub dispatch_workers: usize,
    pub validation_workers: usize,
    pub reconcile_workers: usize,
    pub template_recheck_secs: i64,
    pub reconcile_schedule: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let config = Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: parse_or("PORT", 8080)?,
            app_url: env::var("APP_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string())
                .trim_end_matches('/')
                .to_string(),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "messenger".to_string()),
            google_credentials: env::var("GOOGLE_CREDENTIALS")
                .context("GOOGLE_CREDENTIALS must be set")?,
            branch_name: env::var("BRANCH_NAME").unwrap_or_else(|_| "dev".to_string()),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:8000".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            dispatch_workers: parse_or("DISPATCH_WORKERS", 10)?,
            validation_workers: parse_or("VALIDATION_WORKERS", 10)?,
            reconcile_workers: parse_or("RECONCILE_WORKERS", 10)?,
            template_recheck_secs: parse_or("TEMPLATE_RECHECK_SECS", 300)?,
            reconcile_schedule: env::var("RECONCILE_SCHEDULE")
                .unwrap_or_else(|_| "0 * * * * *".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("DISPATCH_WORKERS", self.dispatch_workers),
            ("VALIDATION_WORKERS", self.validation_workers),
            ("RECONCILE_WORKERS", self.reconcile_workers),
        ] {
            if value == 0 {
                bail!("{} must be at least 1", name);
            }
        }
        if !(1..=MAX_TEMPLATE_RECHECK_SECS).contains(&self.template_recheck_secs) {
            bail!(
                "TEMPLATE_RECHECK_SECS must be between 1 and {}",
                MAX_TEMPLATE_RECHECK_SECS
            );
        }
        Ok(())
    }

    /// Delay between a template's status checks while it is in review
    pub fn template_recheck(&self) -> Result<chrono::Duration> {
        chrono::Duration::try_seconds(self.template_recheck_secs)
            .context("TEMPLATE_RECHECK_SECS is out of range")
    }
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", name)),
        Err(_) => Ok(default),
    }
}
