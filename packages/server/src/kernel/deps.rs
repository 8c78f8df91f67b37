//! Server dependencies for domain actions (using traits for testability)
//!
//! This module provides the central dependency container used by all domain actions.
//! All external services and stores use trait abstractions to enable testing.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;
use twilio::models::{ApprovalRequest, ContentCreateRequest, CreateMessage};
use twilio::{TwilioOptions, TwilioService};

use crate::common::WorkerPool;
use crate::domains::auth::JwtService;
use crate::domains::providers::credentials::TwilioCredential;
use crate::kernel::{
    BaseContactStore, BaseMessagingClient, BaseMessagingClientFactory, BaseProviderStore,
    BaseSecretStore, BaseTemplateStore, OutboundMessage,
};

// =============================================================================
// TwilioService Adapter (implements BaseMessagingClient trait)
// =============================================================================

/// Wrapper around TwilioService that implements BaseMessagingClient trait
pub struct TwilioAdapter(pub Arc<TwilioService>);

impl TwilioAdapter {
    pub fn new(service: Arc<TwilioService>) -> Self {
        Self(service)
    }
}

#[async_trait]
impl BaseMessagingClient for TwilioAdapter {
    async fn create_content(&self, content: &ContentCreateRequest) -> Result<String> {
        self.0
            .create_content(content)
            .await
            .map(|resource| resource.sid)
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    async fn delete_content(&self, external_id: &str) -> Result<()> {
        self.0
            .delete_content(external_id)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    async fn submit_approval(
        &self,
        external_id: &str,
        name: &str,
        category: &str,
    ) -> Result<String> {
        let request = ApprovalRequest {
            name: name.to_string(),
            category: category.to_string(),
        };
        self.0
            .create_whatsapp_approval(external_id, &request)
            .await
            .map(|response| response.status)
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    async fn fetch_approval_status(&self, external_id: &str) -> Result<String> {
        let approval = self
            .0
            .fetch_approval(external_id)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        approval
            .whatsapp
            .and_then(|whatsapp| whatsapp.status)
            .ok_or_else(|| anyhow::anyhow!("approval response has no whatsapp status"))
    }

    async fn send_message(&self, message: &OutboundMessage) -> Result<String> {
        let request = CreateMessage {
            to: message.to.clone(),
            from: message.from.clone(),
            messaging_service_sid: message.messaging_service_sid.clone(),
            content_sid: message.content_sid.clone(),
            content_variables: message.content_variables.clone(),
        };
        self.0
            .send_message(&request)
            .await
            .map(|resource| resource.sid)
            .map_err(|e| anyhow::anyhow!("{}", e))
    }
}

/// Builds one Twilio client per provider account.
#[derive(Debug, Clone, Default)]
pub struct TwilioClientFactory {
    base_url: Option<String>,
}

impl TwilioClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route every client to one host (mock servers in tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
        }
    }
}

impl BaseMessagingClientFactory for TwilioClientFactory {
    fn twilio(&self, credential: &TwilioCredential) -> Arc<dyn BaseMessagingClient> {
        let mut options = TwilioOptions::new(&credential.account_sid, &credential.auth_token);
        if let Some(base_url) = &self.base_url {
            options = options.with_base_url(base_url.clone());
        }
        Arc::new(TwilioAdapter::new(Arc::new(TwilioService::new(options))))
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to actions (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub providers: Arc<dyn BaseProviderStore>,
    pub templates: Arc<dyn BaseTemplateStore>,
    pub contacts: Arc<dyn BaseContactStore>,
    pub secrets: Arc<dyn BaseSecretStore>,
    pub messaging: Arc<dyn BaseMessagingClientFactory>,
    /// JWT service for token verification
    pub jwt_service: Arc<JwtService>,
    /// Public base URL, used for provider webhook URLs
    pub app_url: String,
    pub dispatch_pool: WorkerPool,
    pub validation_pool: WorkerPool,
    pub reconcile_pool: WorkerPool,
    /// How far ahead `next_check` is scheduled while a template is in review
    pub template_recheck: Duration,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        providers: Arc<dyn BaseProviderStore>,
        templates: Arc<dyn BaseTemplateStore>,
        contacts: Arc<dyn BaseContactStore>,
        secrets: Arc<dyn BaseSecretStore>,
        messaging: Arc<dyn BaseMessagingClientFactory>,
        jwt_service: Arc<JwtService>,
        app_url: String,
        dispatch_pool: WorkerPool,
        validation_pool: WorkerPool,
        reconcile_pool: WorkerPool,
        template_recheck: Duration,
    ) -> Self {
        Self {
            providers,
            templates,
            contacts,
            secrets,
            messaging,
            jwt_service,
            app_url,
            dispatch_pool,
            validation_pool,
            reconcile_pool,
            template_recheck,
        }
    }
}
