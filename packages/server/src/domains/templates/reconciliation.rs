//! Template status reconciliation.
//!
//! Loads every template whose `next_check` has passed and re-fetches its
//! approval state from the provider on the reconcile pool. Each template is
//! handled in isolation: a failure is logged, leaves that template's
//! `next_check` untouched (so the next pass retries it), and never affects
//! its siblings. A provider alert runs the same check early for the
//! scheduled templates of that one provider.

use anyhow::anyhow;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::common::{Actor, AppError, AppResult, Capability, ProviderId};
use crate::domains::providers::resolver::resolve_without_check;
use crate::domains::templates::data::{ProviderAlert, SyncReport};
use crate::domains::templates::models::{ApprovalStatus, Template};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Updated,
    Unchanged,
    Failed,
}

/// Admin-triggered reconciliation pass
pub async fn sync_templates(actor: Actor, deps: &ServerDeps) -> AppResult<SyncReport> {
    actor.can(Capability::Admin).check()?;
    reconcile_due_templates(deps).await
}

/// Run one reconciliation pass over every due template.
pub async fn reconcile_due_templates(deps: &ServerDeps) -> AppResult<SyncReport> {
    let due = deps.templates.find_due(Utc::now()).await?;
    if due.is_empty() {
        debug!("No templates due for reconciliation");
        return Ok(SyncReport::default());
    }

    info!(count = due.len(), "Reconciling due templates");
    reconcile_batch(due, deps).await
}

/// Handle a provider alert callback.
///
/// The sender has to name the provider's own account. Every template of the
/// provider that is still scheduled for a check is reconciled right away.
pub async fn handle_provider_alert(
    provider_id: ProviderId,
    alert: ProviderAlert,
    deps: &ServerDeps,
) -> AppResult<SyncReport> {
    let (_, credential) = resolve_without_check(provider_id, deps).await?;
    let credential = credential.into_twilio()?;
    if credential.account_sid != alert.account_sid {
        warn!(provider_id = %provider_id, "Provider alert from a foreign account");
        return Err(AppError::Unauthorized(
            "alert does not match the provider account".to_string(),
        ));
    }

    info!(
        provider_id = %provider_id,
        error_code = alert.error_code.as_deref().unwrap_or(""),
        description = alert.description.as_deref().unwrap_or(""),
        "Provider alert received"
    );

    let scheduled: Vec<Template> = deps
        .templates
        .find_by_provider(provider_id)
        .await?
        .into_iter()
        .filter(|t| t.next_check.is_some())
        .collect();
    if scheduled.is_empty() {
        debug!(provider_id = %provider_id, "No scheduled templates for provider");
        return Ok(SyncReport::default());
    }

    reconcile_batch(scheduled, deps).await
}

async fn reconcile_batch(templates: Vec<Template>, deps: &ServerDeps) -> AppResult<SyncReport> {
    let worker_deps = deps.clone();
    let outcomes = deps
        .reconcile_pool
        .run(templates, move |template| {
            let deps = worker_deps.clone();
            async move { reconcile_one(template, &deps).await }
        })
        .await?;

    let report = SyncReport {
        due: outcomes.len(),
        updated: outcomes.iter().filter(|o| **o == Outcome::Updated).count(),
        failed: outcomes.iter().filter(|o| **o == Outcome::Failed).count(),
    };
    info!(
        due = report.due,
        updated = report.updated,
        failed = report.failed,
        "Reconciliation pass complete"
    );
    Ok(report)
}

async fn reconcile_one(template: Template, deps: &ServerDeps) -> Outcome {
    let template_id = template.id;
    match check_template(template, deps).await {
        Ok(true) => Outcome::Updated,
        Ok(false) => Outcome::Unchanged,
        Err(e) => {
            error!(template_id = %template_id, error = %e, "Template reconciliation failed");
            Outcome::Failed
        }
    }
}

/// Returns whether the stored status changed.
async fn check_template(template: Template, deps: &ServerDeps) -> anyhow::Result<bool> {
    let external_id = template
        .external_id
        .as_deref()
        .ok_or_else(|| anyhow!("template has no external id"))?;

    let (_, credential) = resolve_without_check(template.provider_id, deps)
        .await
        .map_err(|e| anyhow!("{}", e))?;
    let credential = credential.into_twilio().map_err(|e| anyhow!("{}", e))?;
    let client = deps.messaging.twilio(&credential);

    let reported = client.fetch_approval_status(external_id).await?;
    let status = ApprovalStatus::from_provider(&reported)?;

    let next_check = status
        .is_pending()
        .then(|| Utc::now() + deps.template_recheck);
    let changed = status != template.status;

    deps.templates
        .update_review_state(template.id, changed.then_some(status), next_check)
        .await?;

    if changed {
        info!(
            template_id = %template.id,
            from = %template.status,
            to = %status,
            review_finished = status.is_terminal(),
            "Template status changed"
        );
    }
    Ok(changed)
}
