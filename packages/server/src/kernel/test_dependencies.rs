// TestDependencies - mock implementations for testing
//
// Provides in-memory stores, a secret store, and a messaging client factory
// that can be injected into ServerDeps so domain actions run without
// Postgres or network access.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use twilio::models::ContentCreateRequest;

use super::{
    BaseContactStore, BaseMessagingClient, BaseMessagingClientFactory, BaseProviderStore,
    BaseSecretStore, BaseTemplateStore, OutboundMessage, SecretError, ServerDeps,
};
use crate::common::{ContactId, ContactListId, ProviderId, TemplateId, UserId, WorkerPool};
use crate::domains::auth::JwtService;
use crate::domains::contacts::models::{Contact, ContactList, ContactListWithContacts};
use crate::domains::providers::credentials::{ProviderCredential, TwilioCredential};
use crate::domains::providers::models::{ProviderType, UserProvider};
use crate::domains::templates::models::{ApprovalStatus, Platform, Template};

pub const TEST_JWT_SECRET: &str = "test_secret_key";
pub const TEST_JWT_ISSUER: &str = "test_issuer";
pub const TEST_APP_URL: &str = "https://messenger.test";

// =============================================================================
// Mock Secret Store
// =============================================================================

pub struct MockSecretStore {
    secrets: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    counter: Arc<Mutex<u32>>,
    deleted: Arc<Mutex<Vec<String>>>,
    fail_store: bool,
    fail_fetch: bool,
    fail_delete: bool,
}

impl MockSecretStore {
    pub fn new() -> Self {
        Self {
            secrets: Arc::new(Mutex::new(HashMap::new())),
            counter: Arc::new(Mutex::new(0)),
            deleted: Arc::new(Mutex::new(Vec::new())),
            fail_store: false,
            fail_fetch: false,
            fail_delete: false,
        }
    }

    /// Every store call fails with a transport error
    pub fn failing_store(mut self) -> Self {
        self.fail_store = true;
        self
    }

    /// Every fetch fails with a transport error
    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    /// Every delete fails with a transport error
    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    /// Place a secret under a known reference
    pub fn put(&self, reference: &str, value: Vec<u8>) {
        self.secrets
            .lock()
            .unwrap()
            .insert(reference.to_string(), value);
    }

    /// Drop a secret without recording a delete call
    pub fn forget(&self, reference: &str) {
        self.secrets.lock().unwrap().remove(reference);
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.secrets.lock().unwrap().contains_key(reference)
    }

    pub fn len(&self) -> usize {
        self.secrets.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// References that delete was called with, in call order
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

impl Default for MockSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseSecretStore for MockSecretStore {
    async fn store(&self, value: &[u8]) -> Result<String, SecretError> {
        if self.fail_store {
            return Err(SecretError::Transport(anyhow::anyhow!(
                "mock secret store unavailable"
            )));
        }
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        let reference = format!("projects/test/secrets/messenger-test-{}", counter);
        self.put(&reference, value.to_vec());
        Ok(reference)
    }

    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, SecretError> {
        if self.fail_fetch {
            return Err(SecretError::Transport(anyhow::anyhow!(
                "mock secret store unavailable"
            )));
        }
        self.secrets
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(reference.to_string()))
    }

    async fn delete(&self, reference: &str) -> Result<(), SecretError> {
        self.deleted.lock().unwrap().push(reference.to_string());
        if self.fail_delete {
            return Err(SecretError::Transport(anyhow::anyhow!(
                "mock secret store unavailable"
            )));
        }
        match self.secrets.lock().unwrap().remove(reference) {
            Some(_) => Ok(()),
            None => Err(SecretError::NotFound(reference.to_string())),
        }
    }
}

// =============================================================================
// Mock Messaging Client
// =============================================================================

pub struct MockMessagingClient {
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    created: Arc<Mutex<Vec<ContentCreateRequest>>>,
    deleted: Arc<Mutex<Vec<String>>>,
    approvals: Arc<Mutex<Vec<(String, String, String)>>>,
    failing_numbers: HashSet<String>,
    statuses: Arc<Mutex<HashMap<String, String>>>,
    failing_status: HashSet<String>,
    submit_status: String,
    fail_create: bool,
    fail_delete: bool,
    counter: Arc<Mutex<u32>>,
}

impl MockMessagingClient {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            created: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
            approvals: Arc::new(Mutex::new(Vec::new())),
            failing_numbers: HashSet::new(),
            statuses: Arc::new(Mutex::new(HashMap::new())),
            failing_status: HashSet::new(),
            submit_status: "received".to_string(),
            fail_create: false,
            fail_delete: false,
            counter: Arc::new(Mutex::new(0)),
        }
    }

    /// Sends to this E.164 number fail (matched with or without channel prefix)
    pub fn with_failing_number(mut self, e164: &str) -> Self {
        self.failing_numbers.insert(e164.to_string());
        self
    }

    /// Status string returned by submit_approval
    pub fn with_submit_status(mut self, status: &str) -> Self {
        self.submit_status = status.to_string();
        self
    }

    /// Status string reported for one content id
    pub fn with_approval_status(self, external_id: &str, status: &str) -> Self {
        self.set_approval_status(external_id, status);
        self
    }

    /// Status fetches for this content id fail
    pub fn with_failing_status(mut self, external_id: &str) -> Self {
        self.failing_status.insert(external_id.to_string());
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn set_approval_status(&self, external_id: &str, status: &str) {
        self.statuses
            .lock()
            .unwrap()
            .insert(external_id.to_string(), status.to_string());
    }

    /// Messages accepted so far, in completion order
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<ContentCreateRequest> {
        self.created.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// `(external_id, name, category)` of each approval submission
    pub fn approvals(&self) -> Vec<(String, String, String)> {
        self.approvals.lock().unwrap().clone()
    }

    fn is_failing(&self, address: &str) -> bool {
        let number = address.strip_prefix("whatsapp:").unwrap_or(address);
        self.failing_numbers.contains(number)
    }
}

impl Default for MockMessagingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseMessagingClient for MockMessagingClient {
    async fn create_content(&self, content: &ContentCreateRequest) -> Result<String> {
        if self.fail_create {
            anyhow::bail!("mock provider rejected content");
        }
        self.created.lock().unwrap().push(content.clone());
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        Ok(format!("HX{:032}", counter))
    }

    async fn delete_content(&self, external_id: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(external_id.to_string());
        if self.fail_delete {
            anyhow::bail!("mock provider could not delete {}", external_id);
        }
        Ok(())
    }

    async fn submit_approval(
        &self,
        external_id: &str,
        name: &str,
        category: &str,
    ) -> Result<String> {
        self.approvals.lock().unwrap().push((
            external_id.to_string(),
            name.to_string(),
            category.to_string(),
        ));
        Ok(self.submit_status.clone())
    }

    async fn fetch_approval_status(&self, external_id: &str) -> Result<String> {
        if self.failing_status.contains(external_id) {
            anyhow::bail!("mock provider timed out for {}", external_id);
        }
        self.statuses
            .lock()
            .unwrap()
            .get(external_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("approval response has no whatsapp status"))
    }

    async fn send_message(&self, message: &OutboundMessage) -> Result<String> {
        if self.is_failing(&message.to) {
            anyhow::bail!("21211: invalid 'To' phone number {}", message.to);
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(format!("SM{:032}", sent.len()))
    }
}

/// Hands out one shared mock client and records the credentials it was asked for.
pub struct MockMessagingFactory {
    client: Arc<MockMessagingClient>,
    credentials: Arc<Mutex<Vec<TwilioCredential>>>,
}

impl MockMessagingFactory {
    pub fn new(client: Arc<MockMessagingClient>) -> Self {
        Self {
            client,
            credentials: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn credentials(&self) -> Vec<TwilioCredential> {
        self.credentials.lock().unwrap().clone()
    }
}

impl BaseMessagingClientFactory for MockMessagingFactory {
    fn twilio(&self, credential: &TwilioCredential) -> Arc<dyn BaseMessagingClient> {
        self.credentials.lock().unwrap().push(credential.clone());
        self.client.clone()
    }
}

// =============================================================================
// In-memory Stores
// =============================================================================

pub struct InMemoryProviderStore {
    rows: Arc<Mutex<Vec<UserProvider>>>,
    templates: Mutex<Option<Arc<Mutex<Vec<Template>>>>>,
    fail_insert: bool,
}

impl InMemoryProviderStore {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(Mutex::new(Vec::new())),
            templates: Mutex::new(None),
            fail_insert: false,
        }
    }

    pub fn failing_insert(mut self) -> Self {
        self.fail_insert = true;
        self
    }

    /// Refuse deletes while `templates` holds rows for the provider, like the
    /// foreign key on `templates.provider_id`
    pub fn link_templates(&self, templates: &InMemoryTemplateStore) {
        *self.templates.lock().unwrap() = Some(templates.rows.clone());
    }

    pub fn put(&self, provider: UserProvider) {
        self.rows.lock().unwrap().push(provider);
    }

    pub fn get(&self, id: ProviderId) -> Option<UserProvider> {
        self.rows.lock().unwrap().iter().find(|p| p.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryProviderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseProviderStore for InMemoryProviderStore {
    async fn find_by_id(&self, id: ProviderId) -> Result<Option<UserProvider>> {
        Ok(self.get(id))
    }

    async fn find_by_owner(&self, user_id: UserId) -> Result<Vec<UserProvider>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<UserProvider>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn insert(&self, provider: &UserProvider) -> Result<UserProvider> {
        if self.fail_insert {
            anyhow::bail!("mock database unavailable");
        }
        self.put(provider.clone());
        Ok(provider.clone())
    }

    async fn delete(&self, id: ProviderId) -> Result<()> {
        if let Some(templates) = self.templates.lock().unwrap().as_ref() {
            if templates.lock().unwrap().iter().any(|t| t.provider_id == id) {
                anyhow::bail!("templates still reference provider {}", id);
            }
        }
        self.rows.lock().unwrap().retain(|p| p.id != id);
        Ok(())
    }
}

pub struct InMemoryTemplateStore {
    rows: Arc<Mutex<Vec<Template>>>,
    fail_insert: bool,
    fail_update: bool,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(Mutex::new(Vec::new())),
            fail_insert: false,
            fail_update: false,
        }
    }

    pub fn failing_insert(mut self) -> Self {
        self.fail_insert = true;
        self
    }

    /// Full updates fail; review-state writes still succeed
    pub fn failing_update(mut self) -> Self {
        self.fail_update = true;
        self
    }

    pub fn put(&self, template: Template) {
        self.rows.lock().unwrap().push(template);
    }

    pub fn get(&self, id: TemplateId) -> Option<Template> {
        self.rows.lock().unwrap().iter().find(|t| t.id == id).cloned()
    }
}

impl Default for InMemoryTemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseTemplateStore for InMemoryTemplateStore {
    async fn find_by_id(&self, id: TemplateId) -> Result<Option<Template>> {
        Ok(self.get(id))
    }

    async fn find_by_owner(&self, user_id: UserId) -> Result<Vec<Template>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<Template>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn find_by_provider(&self, provider_id: ProviderId) -> Result<Vec<Template>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.provider_id == provider_id)
            .cloned()
            .collect())
    }

    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Template>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.next_check.is_some_and(|at| at < now))
            .cloned()
            .collect())
    }

    async fn insert(&self, template: &Template) -> Result<Template> {
        if self.fail_insert {
            anyhow::bail!("mock database unavailable");
        }
        self.put(template.clone());
        Ok(template.clone())
    }

    async fn update(&self, template: &Template) -> Result<Template> {
        if self.fail_update {
            anyhow::bail!("mock database unavailable");
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|t| t.id == template.id)
            .ok_or_else(|| anyhow::anyhow!("template {} not found", template.id))?;
        *row = Template {
            updated_at: Utc::now(),
            ..template.clone()
        };
        Ok(row.clone())
    }

    async fn update_review_state(
        &self,
        id: TemplateId,
        status: Option<ApprovalStatus>,
        next_check: Option<DateTime<Utc>>,
    ) -> Result<Template> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| anyhow::anyhow!("template {} not found", id))?;
        if let Some(status) = status {
            row.status = status;
        }
        row.next_check = next_check;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete(&self, id: TemplateId) -> Result<()> {
        self.rows.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }
}

pub struct InMemoryContactStore {
    contacts: Arc<Mutex<Vec<Contact>>>,
    lists: Arc<Mutex<Vec<(ContactList, Vec<ContactId>)>>>,
}

impl InMemoryContactStore {
    pub fn new() -> Self {
        Self {
            contacts: Arc::new(Mutex::new(Vec::new())),
            lists: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn put(&self, contact: Contact) {
        self.contacts.lock().unwrap().push(contact);
    }

    /// Members are kept in the given order
    pub fn put_list(&self, list: ContactList, members: Vec<ContactId>) {
        self.lists.lock().unwrap().push((list, members));
    }
}

impl Default for InMemoryContactStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseContactStore for InMemoryContactStore {
    async fn find_by_ids(&self, ids: &[ContactId]) -> Result<Vec<Contact>> {
        Ok(self
            .contacts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn find_list_with_contacts(
        &self,
        id: ContactListId,
    ) -> Result<Option<ContactListWithContacts>> {
        let lists = self.lists.lock().unwrap();
        let Some((list, members)) = lists.iter().find(|(list, _)| list.id == id) else {
            return Ok(None);
        };
        let contacts = self.contacts.lock().unwrap();
        let members = members
            .iter()
            .filter_map(|member| contacts.iter().find(|c| c.id == *member).cloned())
            .collect();
        Ok(Some(ContactListWithContacts {
            list: list.clone(),
            contacts: members,
        }))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn twilio_credential() -> TwilioCredential {
    TwilioCredential {
        account_sid: "AC00000000000000000000000000000000".to_string(),
        auth_token: "test_auth_token".to_string(),
        messaging_service_sid: "MG00000000000000000000000000000000".to_string(),
    }
}

pub fn contact(user_id: UserId, phone_number: &str) -> Contact {
    let now = Utc::now();
    Contact {
        id: ContactId::new(),
        user_id,
        name: "Test Contact".to_string(),
        phone_number: phone_number.to_string(),
        email: String::new(),
        metadata: serde_json::json!({}),
        created_at: now,
        updated_at: now,
    }
}

pub fn template_content() -> serde_json::Value {
    serde_json::json!({
        "friendly_name": "order_update",
        "language": "en",
        "variables": {"1": "customer"},
        "types": {"twilio/text": {"body": "Hi {{1}}, your order shipped."}}
    })
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

pub struct TestDependencies {
    pub providers: Arc<InMemoryProviderStore>,
    pub templates: Arc<InMemoryTemplateStore>,
    pub contacts: Arc<InMemoryContactStore>,
    pub secrets: Arc<MockSecretStore>,
    pub messaging: Arc<MockMessagingClient>,
    pub factory: Arc<MockMessagingFactory>,
    pub pool: WorkerPool,
    pub template_recheck: Duration,
}

impl TestDependencies {
    pub fn new() -> Self {
        let messaging = Arc::new(MockMessagingClient::new());
        let providers = InMemoryProviderStore::new();
        let templates = InMemoryTemplateStore::new();
        providers.link_templates(&templates);
        Self {
            providers: Arc::new(providers),
            templates: Arc::new(templates),
            contacts: Arc::new(InMemoryContactStore::new()),
            secrets: Arc::new(MockSecretStore::new()),
            factory: Arc::new(MockMessagingFactory::new(messaging.clone())),
            messaging,
            pool: WorkerPool::default(),
            template_recheck: Duration::minutes(5),
        }
    }

    /// Set a mock secret store
    pub fn mock_secrets(mut self, secrets: MockSecretStore) -> Self {
        self.secrets = Arc::new(secrets);
        self
    }

    /// Set a mock messaging client (shared by every provider)
    pub fn mock_messaging(mut self, client: MockMessagingClient) -> Self {
        self.messaging = Arc::new(client);
        self.factory = Arc::new(MockMessagingFactory::new(self.messaging.clone()));
        self
    }

    /// Set a mock provider store
    pub fn mock_providers(mut self, providers: InMemoryProviderStore) -> Self {
        providers.link_templates(&self.templates);
        self.providers = Arc::new(providers);
        self
    }

    /// Set a mock template store
    pub fn mock_templates(mut self, templates: InMemoryTemplateStore) -> Self {
        self.providers.link_templates(&templates);
        self.templates = Arc::new(templates);
        self
    }

    /// Use this pool for dispatch, validation and reconciliation
    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn jwt_service() -> JwtService {
        JwtService::new(TEST_JWT_SECRET, TEST_JWT_ISSUER.to_string())
    }

    /// Register a Twilio provider for `user_id`, with its secret in the mock store
    pub fn seed_provider(&self, user_id: UserId) -> UserProvider {
        self.seed_provider_with(user_id, ProviderCredential::Twilio(twilio_credential()))
    }

    pub fn seed_provider_with(
        &self,
        user_id: UserId,
        credential: ProviderCredential,
    ) -> UserProvider {
        let now = Utc::now();
        let id = ProviderId::new();
        let reference = format!("projects/test/secrets/messenger-test-{}", id);
        if let Ok(bytes) = credential.encode() {
            self.secrets.put(&reference, bytes);
        }
        let provider = UserProvider {
            id,
            user_id,
            name: "Test Provider".to_string(),
            provider_credentials: reference,
            from_phone_number: "+14155550000".to_string(),
            status: ApprovalStatus::Approved,
            provider_type: credential.provider_type(),
            created_at: now,
            updated_at: now,
        };
        self.providers.put(provider.clone());
        provider
    }

    /// Store a WhatsApp template that already has provider content
    pub fn seed_template(
        &self,
        provider: &UserProvider,
        status: ApprovalStatus,
        external_id: Option<&str>,
        next_check: Option<DateTime<Utc>>,
    ) -> Template {
        let now = Utc::now();
        let template = Template {
            id: TemplateId::new(),
            user_id: provider.user_id,
            name: "order_update".to_string(),
            content: template_content(),
            status,
            platform: Platform::WhatsApp,
            provider_type: ProviderType::Twilio,
            provider_id: provider.id,
            external_id: external_id.map(str::to_string),
            next_check,
            created_at: now,
            updated_at: now,
        };
        self.templates.put(template.clone());
        template
    }

    pub fn seed_contact(&self, user_id: UserId, phone_number: &str) -> Contact {
        let contact = contact(user_id, phone_number);
        self.contacts.put(contact.clone());
        contact
    }

    pub fn seed_list(&self, user_id: UserId, members: &[&Contact]) -> ContactList {
        let now = Utc::now();
        let list = ContactList {
            id: ContactListId::new(),
            user_id,
            name: "Test List".to_string(),
            created_at: now,
            updated_at: now,
        };
        self.contacts
            .put_list(list.clone(), members.iter().map(|c| c.id).collect());
        list
    }

    /// Build ServerDeps backed by these doubles. The doubles stay shared, so
    /// the test can inspect them afterwards.
    pub fn server_deps(&self) -> ServerDeps {
        ServerDeps::new(
            self.providers.clone(),
            self.templates.clone(),
            self.contacts.clone(),
            self.secrets.clone(),
            self.factory.clone(),
            Arc::new(Self::jwt_service()),
            TEST_APP_URL.to_string(),
            self.pool,
            self.pool,
            self.pool,
            self.template_recheck,
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
