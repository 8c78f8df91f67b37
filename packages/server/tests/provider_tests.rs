//! Provider registration, lookup and deletion.

use messenger_core::common::{Actor, AppError, ProviderId, UserId};
use messenger_core::domains::providers::actions::{
    delete_provider, get_provider, list_all_providers, list_my_providers, register_provider,
};
use messenger_core::domains::providers::{ProviderData, ProviderType, RegisterProviderInput};
use messenger_core::domains::templates::actions::delete_template;
use messenger_core::domains::templates::ApprovalStatus;
use messenger_core::kernel::test_dependencies::{InMemoryProviderStore, MockSecretStore};
use messenger_core::kernel::{BaseProviderStore, TestDependencies};
use serde_json::json;

fn twilio_input() -> RegisterProviderInput {
    RegisterProviderInput {
        name: "Main account".to_string(),
        provider_type: ProviderType::Twilio,
        credentials: json!({
            "twilio_account_sid": "AC123",
            "twilio_auth_token": "secret-token",
            "twilio_messaging_service_sid": "MG123",
            "twilio_from_phone_number": "+1 (415) 555-0199"
        }),
    }
}

#[tokio::test]
async fn test_register_stores_secret_and_row() {
    let test_deps = TestDependencies::new();
    let deps = test_deps.server_deps();
    let user = UserId::new();

    let provider = register_provider(Actor::user(user), twilio_input(), &deps)
        .await
        .unwrap();

    assert_eq!(provider.user_id, user);
    assert_eq!(provider.status, ApprovalStatus::Approved);
    assert_eq!(provider.from_phone_number, "+14155550199");
    assert!(test_deps.secrets.contains(&provider.provider_credentials));
    assert!(test_deps.providers.get(provider.id).is_some());

    let data = serde_json::to_value(ProviderData::from_model(provider.clone(), &deps.app_url))
        .unwrap();
    assert!(data.get("provider_credentials").is_none());
    assert_eq!(
        data["webhook_url"],
        format!("https://messenger.test/v1/templates/webhook/{}", provider.id)
    );
}

#[tokio::test]
async fn test_register_rejects_incomplete_credentials() {
    let test_deps = TestDependencies::new();
    let deps = test_deps.server_deps();
    let mut input = twilio_input();
    input.credentials["twilio_messaging_service_sid"] = json!("");

    let err = register_provider(Actor::user(UserId::new()), input, &deps)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
    assert!(test_deps.secrets.is_empty());
}

#[tokio::test]
async fn test_register_removes_secret_when_insert_fails() {
    let test_deps =
        TestDependencies::new().mock_providers(InMemoryProviderStore::new().failing_insert());
    let deps = test_deps.server_deps();

    let err = register_provider(Actor::user(UserId::new()), twilio_input(), &deps)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Internal(_)));
    assert!(test_deps.secrets.is_empty());
    assert_eq!(test_deps.secrets.deleted().len(), 1);
}

#[tokio::test]
async fn test_get_provider_checks_ownership() {
    let test_deps = TestDependencies::new();
    let owner = UserId::new();
    let provider = test_deps.seed_provider(owner);
    let deps = test_deps.server_deps();

    assert!(get_provider(Actor::user(owner), provider.id, &deps).await.is_ok());
    assert!(get_provider(Actor::admin(UserId::new()), provider.id, &deps)
        .await
        .is_ok());

    let err = get_provider(Actor::user(UserId::new()), provider.id, &deps)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccessDenied));
}

#[tokio::test]
async fn test_listing_is_scoped_to_owner_unless_admin() {
    let test_deps = TestDependencies::new();
    let alice = UserId::new();
    let bob = UserId::new();
    test_deps.seed_provider(alice);
    test_deps.seed_provider(bob);
    let deps = test_deps.server_deps();

    let mine = list_my_providers(Actor::user(alice), &deps).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].user_id, alice);

    let err = list_all_providers(Actor::user(alice), &deps)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccessDenied));

    let all = list_all_providers(Actor::admin(UserId::new()), &deps)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_delete_removes_secret_then_row() {
    let test_deps = TestDependencies::new();
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let deps = test_deps.server_deps();

    delete_provider(Actor::user(user), provider.id, &deps)
        .await
        .unwrap();

    assert!(!test_deps.secrets.contains(&provider.provider_credentials));
    assert!(test_deps.providers.get(provider.id).is_none());
}

#[tokio::test]
async fn test_delete_with_missing_secret_still_removes_row() {
    let test_deps = TestDependencies::new();
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    test_deps.secrets.forget(&provider.provider_credentials);
    let deps = test_deps.server_deps();

    delete_provider(Actor::user(user), provider.id, &deps)
        .await
        .unwrap();

    assert!(test_deps.providers.get(provider.id).is_none());
}

#[tokio::test]
async fn test_delete_keeps_row_when_secret_store_fails() {
    let test_deps = TestDependencies::new().mock_secrets(MockSecretStore::new().failing_delete());
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let deps = test_deps.server_deps();

    let err = delete_provider(Actor::user(user), provider.id, &deps)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Internal(_)));
    assert!(test_deps.providers.get(provider.id).is_some());
}

#[tokio::test]
async fn test_delete_refused_while_templates_remain() {
    let test_deps = TestDependencies::new();
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let template = test_deps.seed_template(&provider, ApprovalStatus::InReview, Some("HX1"), None);
    let deps = test_deps.server_deps();

    let err = delete_provider(Actor::user(user), provider.id, &deps)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
    assert!(test_deps.providers.get(provider.id).is_some());
    assert!(test_deps.secrets.contains(&provider.provider_credentials));
    assert!(test_deps.secrets.deleted().is_empty());

    delete_template(Actor::user(user), template.id, &deps)
        .await
        .unwrap();
    assert_eq!(test_deps.messaging.deleted(), vec!["HX1".to_string()]);

    delete_provider(Actor::user(user), provider.id, &deps)
        .await
        .unwrap();
    assert!(test_deps.providers.get(provider.id).is_none());
}

#[tokio::test]
async fn test_provider_store_rejects_delete_with_templates() {
    let test_deps = TestDependencies::new();
    let provider = test_deps.seed_provider(UserId::new());
    test_deps.seed_template(&provider, ApprovalStatus::Approved, Some("HX1"), None);

    assert!(test_deps.providers.delete(provider.id).await.is_err());
    assert!(test_deps.providers.get(provider.id).is_some());
}

#[tokio::test]
async fn test_delete_unknown_provider_is_not_found() {
    let test_deps = TestDependencies::new();
    let deps = test_deps.server_deps();

    let err = delete_provider(
        Actor::admin(UserId::new()),
        ProviderId::new(),
        &deps,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_register_secret_store_outage_stores_no_row() {
    let test_deps = TestDependencies::new().mock_secrets(MockSecretStore::new().failing_store());
    let deps = test_deps.server_deps();

    let err = register_provider(Actor::user(UserId::new()), twilio_input(), &deps)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Internal(_)));
    assert_eq!(test_deps.providers.len(), 0);
}
