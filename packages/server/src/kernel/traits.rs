// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (resolving providers, dispatching batches, reconciling
// templates) lives in domain actions that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseSecretStore, BaseTemplateStore)

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use twilio::models::ContentCreateRequest;

use crate::common::{ContactId, ContactListId, ProviderId, TemplateId, UserId};
use crate::domains::contacts::models::{Contact, ContactListWithContacts};
use crate::domains::providers::credentials::TwilioCredential;
use crate::domains::providers::models::UserProvider;
use crate::domains::templates::models::{ApprovalStatus, Template};

// =============================================================================
// Secret Store Trait (Infrastructure - opaque credential blobs)
// =============================================================================

/// `NotFound` is recoverable; everything else is fatal to the caller and is
/// never retried inside the store.
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("secret not found: {0}")]
    NotFound(String),

    #[error("secret store error: {0}")]
    Transport(#[from] anyhow::Error),
}

#[async_trait]
pub trait BaseSecretStore: Send + Sync {
    /// Store a new secret and return its reference
    /// (`projects/{project}/secrets/{name}`)
    async fn store(&self, value: &[u8]) -> Result<String, SecretError>;

    /// Fetch the latest version of the secret behind `reference`
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, SecretError>;

    /// Delete the secret and all its versions
    async fn delete(&self, reference: &str) -> Result<(), SecretError>;
}

// =============================================================================
// Messaging Provider Traits (Infrastructure - content, approval, send)
// =============================================================================

/// One outbound message, already addressed in the provider's format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    pub from: String,
    pub messaging_service_sid: String,
    pub content_sid: String,
    /// JSON object encoded as a string
    pub content_variables: String,
}

/// A client bound to one provider account's credentials.
#[async_trait]
pub trait BaseMessagingClient: Send + Sync {
    /// Submit template content, returning the provider-assigned external id
    async fn create_content(&self, content: &ContentCreateRequest) -> Result<String>;

    async fn delete_content(&self, external_id: &str) -> Result<()>;

    /// Submit a WhatsApp approval request, returning the provider's status string
    async fn submit_approval(&self, external_id: &str, name: &str, category: &str)
        -> Result<String>;

    /// Fetch the provider's current WhatsApp approval status string
    async fn fetch_approval_status(&self, external_id: &str) -> Result<String>;

    /// Send one message, returning the provider's message id
    async fn send_message(&self, message: &OutboundMessage) -> Result<String>;
}

/// Builds messaging clients from decoded credentials.
pub trait BaseMessagingClientFactory: Send + Sync {
    fn twilio(&self, credential: &TwilioCredential) -> Arc<dyn BaseMessagingClient>;
}

// =============================================================================
// Store Traits (Infrastructure - persistence)
// =============================================================================

#[async_trait]
pub trait BaseProviderStore: Send + Sync {
    async fn find_by_id(&self, id: ProviderId) -> Result<Option<UserProvider>>;

    async fn find_by_owner(&self, user_id: UserId) -> Result<Vec<UserProvider>>;

    async fn find_all(&self) -> Result<Vec<UserProvider>>;

    async fn insert(&self, provider: &UserProvider) -> Result<UserProvider>;

    /// Fails while templates still reference the provider
    async fn delete(&self, id: ProviderId) -> Result<()>;
}

#[async_trait]
pub trait BaseTemplateStore: Send + Sync {
    async fn find_by_id(&self, id: TemplateId) -> Result<Option<Template>>;

    async fn find_by_owner(&self, user_id: UserId) -> Result<Vec<Template>>;

    async fn find_all(&self) -> Result<Vec<Template>>;

    /// Templates submitted through this provider, oldest first
    async fn find_by_provider(&self, provider_id: ProviderId) -> Result<Vec<Template>>;

    /// Templates whose `next_check` is set and earlier than `now`
    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Template>>;

    async fn insert(&self, template: &Template) -> Result<Template>;

    /// Overwrite every mutable column of an existing template
    async fn update(&self, template: &Template) -> Result<Template>;

    /// Write the review state. `status: None` leaves the stored status
    /// untouched; `next_check` is always written (None clears it). Returns
    /// the stored row.
    async fn update_review_state(
        &self,
        id: TemplateId,
        status: Option<ApprovalStatus>,
        next_check: Option<DateTime<Utc>>,
    ) -> Result<Template>;

    async fn delete(&self, id: TemplateId) -> Result<()>;
}

/// Contact lookups. No access control here; callers check ownership.
#[async_trait]
pub trait BaseContactStore: Send + Sync {
    async fn find_by_ids(&self, ids: &[ContactId]) -> Result<Vec<Contact>>;

    async fn find_list_with_contacts(
        &self,
        id: ContactListId,
    ) -> Result<Option<ContactListWithContacts>>;
}
