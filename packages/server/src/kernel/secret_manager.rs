//! Google Secret Manager adapter (implements BaseSecretStore)
//!
//! Secrets are created under `projects/{project}/secrets/{prefix}-{hash}`
//! where `hash` is the hex SHA-256 of a fresh v4 UUID. Access tokens come
//! from a service-account JWT exchanged at the OAuth token endpoint and are
//! cached until shortly before they expire.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{BaseSecretStore, SecretError};

pub const DEFAULT_BASE_URL: &str = "https://secretmanager.googleapis.com";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Refresh this long before the token's stated expiry.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// The fields we need from a service-account JSON key file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("GOOGLE_CREDENTIALS is not a valid service-account key")
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Where access tokens come from.
pub enum TokenSource {
    ServiceAccount(ServiceAccountKey),
    /// Fixed bearer token (local emulators and tests)
    Static(String),
}

pub struct GoogleSecretManager {
    client: Client,
    project_id: String,
    secret_prefix: String,
    base_url: String,
    token_source: TokenSource,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleSecretManager {
    /// `branch` namespaces secret ids per deployment (`messenger-{branch}-...`).
    pub fn new(key: ServiceAccountKey, branch: &str) -> Self {
        Self {
            client: Client::new(),
            project_id: key.project_id.clone(),
            secret_prefix: format!("messenger-{}", branch),
            base_url: DEFAULT_BASE_URL.to_string(),
            token_source: TokenSource::ServiceAccount(key),
            token: Mutex::new(None),
        }
    }

    pub fn with_static_token(project_id: &str, branch: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            project_id: project_id.to_string(),
            secret_prefix: format!("messenger-{}", branch),
            base_url: DEFAULT_BASE_URL.to_string(),
            token_source: TokenSource::Static(token.to_string()),
            token: Mutex::new(None),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn new_secret_id(&self) -> String {
        let digest = Sha256::digest(Uuid::new_v4().to_string().as_bytes());
        format!("{}-{}", self.secret_prefix, hex::encode(digest))
    }

    async fn access_token(&self) -> Result<String> {
        let key = match &self.token_source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::ServiceAccount(key) => key,
        };

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) > Utc::now() {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting Google access token");
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: &key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .context("service-account private key is not valid PEM")?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)?;

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("token exchange returned {}: {}", status, body));
        }
        let token: TokenResponse = response.json().await?;

        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        });
        Ok(token.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct AccessSecretVersionResponse {
    payload: SecretPayload,
}

#[derive(Debug, Deserialize)]
struct SecretPayload {
    data: String,
}

/// Turn a non-success response into the right `SecretError`.
async fn check(response: Response, reference: &str) -> Result<Response, SecretError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(SecretError::NotFound(reference.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    Err(SecretError::Transport(anyhow!(
        "secret manager returned {}: {}",
        status,
        body
    )))
}

fn transport(err: impl Into<anyhow::Error>) -> SecretError {
    SecretError::Transport(err.into())
}

#[async_trait]
impl BaseSecretStore for GoogleSecretManager {
    async fn store(&self, value: &[u8]) -> Result<String, SecretError> {
        let token = self.access_token().await?;
        let secret_id = self.new_secret_id();
        let reference = format!("projects/{}/secrets/{}", self.project_id, secret_id);

        let response = self
            .client
            .post(format!(
                "{}/v1/projects/{}/secrets",
                self.base_url, self.project_id
            ))
            .query(&[("secretId", secret_id.as_str())])
            .bearer_auth(&token)
            .json(&json!({ "replication": { "automatic": {} } }))
            .send()
            .await
            .map_err(transport)?;
        check(response, &reference).await?;

        let response = self
            .client
            .post(format!("{}/v1/{}:addVersion", self.base_url, reference))
            .bearer_auth(&token)
            .json(&json!({ "payload": { "data": STANDARD.encode(value) } }))
            .send()
            .await
            .map_err(transport);

        let added = match response {
            Ok(response) => check(response, &reference).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = added {
            // Don't leave an empty secret behind.
            if let Err(cleanup) = self.delete(&reference).await {
                warn!(reference = %reference, error = %cleanup, "Failed to remove empty secret");
            }
            return Err(e);
        }

        debug!(reference = %reference, "Stored secret");
        Ok(reference)
    }

    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, SecretError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .get(format!(
                "{}/v1/{}/versions/latest:access",
                self.base_url, reference
            ))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(transport)?;
        let response = check(response, reference).await?;

        let body: AccessSecretVersionResponse = response.json().await.map_err(transport)?;
        STANDARD
            .decode(body.payload.data)
            .map_err(|e| transport(anyhow!("secret payload is not base64: {}", e)))
    }

    async fn delete(&self, reference: &str) -> Result<(), SecretError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .delete(format!("{}/v1/{}", self.base_url, reference))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(transport)?;
        check(response, reference).await?;

        debug!(reference = %reference, "Deleted secret");
        Ok(())
    }
}
