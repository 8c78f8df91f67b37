//! Template lifecycle and approval reconciliation.

use chrono::{Duration, Utc};
use messenger_core::common::{Actor, AppError, ProviderId, UserId};
use messenger_core::domains::providers::ProviderType;
use messenger_core::domains::templates::actions::{
    approve_template, create_template, delete_template, list_all_templates, update_template,
};
use messenger_core::domains::templates::{
    handle_provider_alert, reconcile_due_templates, sync_templates, ApprovalStatus,
    ApproveTemplateInput, Platform, ProviderAlert, SyncReport, TemplateInput,
};
use messenger_core::kernel::test_dependencies::{
    template_content, twilio_credential, InMemoryTemplateStore, MockMessagingClient,
};
use messenger_core::kernel::TestDependencies;
use serde_json::json;

fn input(provider_id: ProviderId) -> TemplateInput {
    TemplateInput {
        name: "order_update".to_string(),
        content: template_content(),
        provider_id,
        platform: Platform::WhatsApp,
        provider_type: ProviderType::Twilio,
    }
}

fn approve_input() -> ApproveTemplateInput {
    ApproveTemplateInput {
        name: "order_update".to_string(),
        category: "UTILITY".to_string(),
    }
}

#[tokio::test]
async fn test_create_submits_content_and_stores_unsubmitted() {
    let test_deps = TestDependencies::new();
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let deps = test_deps.server_deps();

    let template = create_template(Actor::user(user), input(provider.id), &deps)
        .await
        .unwrap();

    assert_eq!(template.status, ApprovalStatus::Unsubmitted);
    assert!(template.external_id.is_some());
    assert!(template.next_check.is_none());
    assert_eq!(test_deps.messaging.created().len(), 1);
    assert!(test_deps.templates.get(template.id).is_some());
}

#[tokio::test]
async fn test_create_rejects_mismatched_provider_type() {
    let test_deps = TestDependencies::new();
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let deps = test_deps.server_deps();

    let mut template_input = input(provider.id);
    template_input.provider_type = ProviderType::Plivo;

    let err = create_template(Actor::user(user), template_input, &deps)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert!(test_deps.messaging.created().is_empty());
}

#[tokio::test]
async fn test_create_rejects_malformed_content() {
    let test_deps = TestDependencies::new();
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let deps = test_deps.server_deps();

    let mut template_input = input(provider.id);
    template_input.content = json!({ "friendly_name": "no language or types" });

    let err = create_template(Actor::user(user), template_input, &deps)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(m) if m.contains("content is not valid")));
}

#[tokio::test]
async fn test_provider_rejection_stores_nothing() {
    let test_deps = TestDependencies::new().mock_messaging(MockMessagingClient::new().failing_create());
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let deps = test_deps.server_deps();

    let err = create_template(Actor::user(user), input(provider.id), &deps)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));
    assert!(list_all_templates(Actor::admin(user), &deps)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_failed_insert_removes_submitted_content() {
    let test_deps =
        TestDependencies::new().mock_templates(InMemoryTemplateStore::new().failing_insert());
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let deps = test_deps.server_deps();

    let err = create_template(Actor::user(user), input(provider.id), &deps)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Internal(_)));
    assert_eq!(test_deps.messaging.created().len(), 1);
    assert_eq!(test_deps.messaging.deleted(), vec![format!("HX{:032}", 1)]);
}

#[tokio::test]
async fn test_failed_update_removes_new_content_and_keeps_old() {
    let test_deps =
        TestDependencies::new().mock_templates(InMemoryTemplateStore::new().failing_update());
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let template = test_deps.seed_template(&provider, ApprovalStatus::Approved, Some("HX_OLD"), None);
    let deps = test_deps.server_deps();

    let err = update_template(Actor::user(user), template.id, input(provider.id), &deps)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Internal(_)));
    assert_eq!(test_deps.messaging.deleted(), vec![format!("HX{:032}", 1)]);
    let stored = test_deps.templates.get(template.id).unwrap();
    assert_eq!(stored.external_id.as_deref(), Some("HX_OLD"));
    assert_eq!(stored.status, ApprovalStatus::Approved);
}

#[tokio::test]
async fn test_approve_maps_received_to_inreview_and_schedules_check() {
    let test_deps = TestDependencies::new();
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let template = test_deps.seed_template(&provider, ApprovalStatus::Unsubmitted, Some("HX1"), None);
    let deps = test_deps.server_deps();

    let before = Utc::now();
    let approved = approve_template(Actor::user(user), template.id, approve_input(), &deps)
        .await
        .unwrap();

    assert_eq!(approved.status, ApprovalStatus::InReview);
    let stored = test_deps.templates.get(template.id).unwrap();
    assert_eq!(approved.next_check, stored.next_check);
    assert_eq!(approved.updated_at, stored.updated_at);
    let next_check = stored.next_check.unwrap();
    assert!(next_check >= before + Duration::minutes(5));
    assert!(next_check <= Utc::now() + Duration::minutes(5));

    assert_eq!(
        test_deps.messaging.approvals(),
        vec![(
            "HX1".to_string(),
            "order_update".to_string(),
            "UTILITY".to_string()
        )]
    );
}

#[tokio::test]
async fn test_approve_by_non_owner_is_denied() {
    let test_deps = TestDependencies::new();
    let owner = UserId::new();
    let provider = test_deps.seed_provider(owner);
    let template = test_deps.seed_template(&provider, ApprovalStatus::Unsubmitted, Some("HX1"), None);
    let deps = test_deps.server_deps();

    let err = approve_template(Actor::user(UserId::new()), template.id, approve_input(), &deps)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccessDenied));
    assert!(test_deps.messaging.approvals().is_empty());
}

#[tokio::test]
async fn test_admin_manages_other_users_templates() {
    let test_deps = TestDependencies::new();
    let owner = UserId::new();
    let admin = Actor::admin(UserId::new());
    let provider = test_deps.seed_provider(owner);
    let template = test_deps.seed_template(&provider, ApprovalStatus::Unsubmitted, Some("HX_OLD"), None);
    let deps = test_deps.server_deps();

    let approved = approve_template(admin, template.id, approve_input(), &deps)
        .await
        .unwrap();
    assert_eq!(approved.status, ApprovalStatus::InReview);
    assert_eq!(approved.user_id, owner);

    let updated = update_template(admin, template.id, input(provider.id), &deps)
        .await
        .unwrap();
    assert_eq!(updated.status, ApprovalStatus::Unsubmitted);
    assert_eq!(updated.user_id, owner);

    delete_template(admin, template.id, &deps).await.unwrap();
    assert!(test_deps.templates.get(template.id).is_none());
    assert_eq!(
        test_deps.messaging.deleted(),
        vec!["HX_OLD".to_string(), format!("HX{:032}", 1)]
    );
}

#[tokio::test]
async fn test_update_resets_status_and_removes_old_content() {
    let test_deps = TestDependencies::new();
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let template = test_deps.seed_template(
        &provider,
        ApprovalStatus::InReview,
        Some("HX_OLD"),
        Some(Utc::now()),
    );
    let deps = test_deps.server_deps();

    let mut template_input = input(provider.id);
    template_input.name = "order_update_v2".to_string();
    let updated = update_template(Actor::user(user), template.id, template_input, &deps)
        .await
        .unwrap();

    assert_eq!(updated.name, "order_update_v2");
    assert_eq!(updated.status, ApprovalStatus::Unsubmitted);
    assert!(updated.next_check.is_none());
    assert_ne!(updated.external_id.as_deref(), Some("HX_OLD"));
    assert_eq!(test_deps.messaging.deleted(), vec!["HX_OLD".to_string()]);
}

#[tokio::test]
async fn test_update_survives_failed_cleanup() {
    let test_deps =
        TestDependencies::new().mock_messaging(MockMessagingClient::new().failing_delete());
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let template = test_deps.seed_template(&provider, ApprovalStatus::Approved, Some("HX_OLD"), None);
    let deps = test_deps.server_deps();

    let updated = update_template(Actor::user(user), template.id, input(provider.id), &deps)
        .await
        .unwrap();
    assert_eq!(updated.status, ApprovalStatus::Unsubmitted);
}

#[tokio::test]
async fn test_delete_keeps_row_when_provider_refuses() {
    let test_deps =
        TestDependencies::new().mock_messaging(MockMessagingClient::new().failing_delete());
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let template = test_deps.seed_template(&provider, ApprovalStatus::Approved, Some("HX1"), None);
    let deps = test_deps.server_deps();

    assert!(delete_template(Actor::user(user), template.id, &deps)
        .await
        .is_err());
    assert!(test_deps.templates.get(template.id).is_some());
}

#[tokio::test]
async fn test_delete_removes_provider_content_and_row() {
    let test_deps = TestDependencies::new();
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let template = test_deps.seed_template(&provider, ApprovalStatus::Approved, Some("HX1"), None);
    let deps = test_deps.server_deps();

    delete_template(Actor::user(user), template.id, &deps)
        .await
        .unwrap();
    assert_eq!(test_deps.messaging.deleted(), vec!["HX1".to_string()]);
    assert!(test_deps.templates.get(template.id).is_none());
}

// =============================================================================
// Reconciliation
// =============================================================================

#[tokio::test]
async fn test_reconcile_with_nothing_due_is_a_noop() {
    let test_deps = TestDependencies::new();
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    // Not due yet, and never scheduled
    test_deps.seed_template(
        &provider,
        ApprovalStatus::InReview,
        Some("HX1"),
        Some(Utc::now() + Duration::minutes(5)),
    );
    test_deps.seed_template(&provider, ApprovalStatus::Approved, Some("HX2"), None);
    let deps = test_deps.server_deps();

    let report = reconcile_due_templates(&deps).await.unwrap();
    assert_eq!(report, SyncReport::default());
    assert!(test_deps.factory.credentials().is_empty());
}

#[tokio::test]
async fn test_reconcile_applies_terminal_and_pending_statuses() {
    let client = MockMessagingClient::new()
        .with_approval_status("HX_APPROVED", "approved")
        .with_approval_status("HX_REJECTED", "rejected")
        .with_approval_status("HX_PAUSED", "paused")
        .with_approval_status("HX_DISABLED", "disabled")
        .with_approval_status("HX_PENDING", "pending")
        .with_approval_status("HX_SUBMITTED", "submitted")
        .with_approval_status("HX_SAME", "approved");
    let test_deps = TestDependencies::new().mock_messaging(client);
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let past = Some(Utc::now() - Duration::minutes(1));
    let seed = |status, external_id| {
        test_deps
            .seed_template(&provider, status, Some(external_id), past)
            .id
    };
    let terminal = [
        (seed(ApprovalStatus::InReview, "HX_APPROVED"), ApprovalStatus::Approved),
        (seed(ApprovalStatus::InReview, "HX_REJECTED"), ApprovalStatus::Rejected),
        (seed(ApprovalStatus::Approved, "HX_PAUSED"), ApprovalStatus::Paused),
        (seed(ApprovalStatus::Approved, "HX_DISABLED"), ApprovalStatus::Disabled),
        (seed(ApprovalStatus::Approved, "HX_SAME"), ApprovalStatus::Approved),
    ];
    let pending = seed(ApprovalStatus::InReview, "HX_PENDING");
    let submitted = seed(ApprovalStatus::Unsubmitted, "HX_SUBMITTED");
    let deps = test_deps.server_deps();

    let report = reconcile_due_templates(&deps).await.unwrap();
    assert_eq!(
        report,
        SyncReport {
            due: 7,
            updated: 5,
            failed: 0
        }
    );

    // A terminal status never keeps a scheduled check
    for (id, expected) in terminal {
        let template = test_deps.templates.get(id).unwrap();
        assert_eq!(template.status, expected);
        assert!(template.next_check.is_none(), "{} kept its check", expected);
    }

    for id in [pending, submitted] {
        let template = test_deps.templates.get(id).unwrap();
        assert_eq!(template.status, ApprovalStatus::InReview);
        assert!(template.next_check.unwrap() > Utc::now() + Duration::minutes(4));
    }
}

#[tokio::test]
async fn test_reconcile_failure_is_isolated_and_retried_later() {
    let client = MockMessagingClient::new()
        .with_failing_status("HX_FLAKY")
        .with_approval_status("HX_OK", "rejected")
        .with_approval_status("HX_WEIRD", "on_fire");
    let test_deps = TestDependencies::new().mock_messaging(client);
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let past = Utc::now() - Duration::minutes(1);
    let flaky = test_deps.seed_template(&provider, ApprovalStatus::InReview, Some("HX_FLAKY"), Some(past));
    let ok = test_deps.seed_template(&provider, ApprovalStatus::InReview, Some("HX_OK"), Some(past));
    let weird = test_deps.seed_template(&provider, ApprovalStatus::InReview, Some("HX_WEIRD"), Some(past));
    let deps = test_deps.server_deps();

    let report = reconcile_due_templates(&deps).await.unwrap();
    assert_eq!(
        report,
        SyncReport {
            due: 3,
            updated: 1,
            failed: 2
        }
    );

    let ok = test_deps.templates.get(ok.id).unwrap();
    assert_eq!(ok.status, ApprovalStatus::Rejected);
    assert!(ok.next_check.is_none());

    // Failed items keep their schedule and come back on the next pass
    for id in [flaky.id, weird.id] {
        let template = test_deps.templates.get(id).unwrap();
        assert_eq!(template.status, ApprovalStatus::InReview);
        assert_eq!(template.next_check, Some(past));
    }
    let again = reconcile_due_templates(&deps).await.unwrap();
    assert_eq!(again.due, 2);
}

#[tokio::test]
async fn test_sync_requires_admin() {
    let test_deps = TestDependencies::new();
    let deps = test_deps.server_deps();

    let err = sync_templates(Actor::user(UserId::new()), &deps)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccessDenied));

    let report = sync_templates(Actor::admin(UserId::new()), &deps)
        .await
        .unwrap();
    assert_eq!(report, SyncReport::default());
}

#[tokio::test]
async fn test_approve_takes_terminal_status_as_reported() {
    let test_deps =
        TestDependencies::new().mock_messaging(MockMessagingClient::new().with_submit_status("approved"));
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let template = test_deps.seed_template(&provider, ApprovalStatus::Unsubmitted, Some("HX1"), None);
    let deps = test_deps.server_deps();

    let approved = approve_template(Actor::user(user), template.id, approve_input(), &deps)
        .await
        .unwrap();

    assert_eq!(approved.status, ApprovalStatus::Approved);
    // The first check is still scheduled; the next pass confirms and clears it
    assert!(test_deps.templates.get(template.id).unwrap().next_check.is_some());
}

fn alert(account_sid: &str) -> ProviderAlert {
    ProviderAlert {
        account_sid: account_sid.to_string(),
        error_code: Some("63016".to_string()),
        description: None,
    }
}

#[tokio::test]
async fn test_provider_alert_checks_scheduled_templates_early() {
    let client = MockMessagingClient::new().with_approval_status("HX_REVIEW", "approved");
    let test_deps = TestDependencies::new().mock_messaging(client);
    let user = UserId::new();
    let provider = test_deps.seed_provider(user);
    let other = test_deps.seed_provider(user);
    let later = Some(Utc::now() + Duration::minutes(5));
    let review = test_deps.seed_template(&provider, ApprovalStatus::InReview, Some("HX_REVIEW"), later);
    test_deps.seed_template(&provider, ApprovalStatus::Approved, Some("HX_DONE"), None);
    let elsewhere = test_deps.seed_template(&other, ApprovalStatus::InReview, Some("HX_OTHER"), later);
    let deps = test_deps.server_deps();

    let report = handle_provider_alert(provider.id, alert(&twilio_credential().account_sid), &deps)
        .await
        .unwrap();

    assert_eq!(
        report,
        SyncReport {
            due: 1,
            updated: 1,
            failed: 0
        }
    );
    let review = test_deps.templates.get(review.id).unwrap();
    assert_eq!(review.status, ApprovalStatus::Approved);
    assert!(review.next_check.is_none());
    assert_eq!(
        test_deps.templates.get(elsewhere.id).unwrap().next_check,
        later
    );
}

#[tokio::test]
async fn test_provider_alert_from_foreign_account_is_rejected() {
    let test_deps = TestDependencies::new();
    let provider = test_deps.seed_provider(UserId::new());
    let later = Some(Utc::now() + Duration::minutes(5));
    test_deps.seed_template(&provider, ApprovalStatus::InReview, Some("HX1"), later);
    let deps = test_deps.server_deps();

    let err = handle_provider_alert(provider.id, alert("AC_SOMEONE_ELSE"), &deps)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Unauthorized(_)));
    assert!(test_deps.messaging.approvals().is_empty());
}

#[tokio::test]
async fn test_provider_alert_for_unknown_provider_is_not_found() {
    let test_deps = TestDependencies::new();
    let deps = test_deps.server_deps();

    let err = handle_provider_alert(ProviderId::new(), alert("AC1"), &deps)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
