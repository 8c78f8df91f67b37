//! Template mutation actions
//!
//! Every write goes through the provider first; local state only changes
//! once the provider has accepted the request.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use twilio::models::ContentCreateRequest;

use crate::common::{Actor, AppError, AppResult, ProviderId, TemplateId};
use crate::domains::providers::models::UserProvider;
use crate::domains::providers::resolver::{resolve_with_credentials, resolve_without_check};
use crate::domains::templates::actions::queries::get_template;
use crate::domains::templates::data::{ApproveTemplateInput, TemplateInput};
use crate::domains::templates::models::{ApprovalStatus, Template};
use crate::kernel::{BaseMessagingClient, ServerDeps};

/// Validate the input and resolve the provider client it targets
async fn prepare_submission(
    actor: Actor,
    input: &TemplateInput,
    deps: &ServerDeps,
) -> AppResult<(ContentCreateRequest, UserProvider, Arc<dyn BaseMessagingClient>)> {
    if input.name.trim().is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }

    let content: ContentCreateRequest = serde_json::from_value(input.content.clone())
        .map_err(|e| AppError::bad_request(format!("content is not valid: {}", e)))?;

    let (provider, credential) = resolve_with_credentials(actor, input.provider_id, deps).await?;
    if provider.provider_type != input.provider_type {
        return Err(AppError::bad_request(format!(
            "provider {} is {}, not {}",
            provider.id, provider.provider_type, input.provider_type
        )));
    }

    let client = deps.messaging.twilio(&credential.into_twilio()?);
    Ok((content, provider, client))
}

/// Create a template and submit its content to the provider.
///
/// Nothing is stored locally unless the provider accepts the content. If
/// the local insert then fails, the new content is removed again
/// (best-effort).
pub async fn create_template(
    actor: Actor,
    input: TemplateInput,
    deps: &ServerDeps,
) -> AppResult<Template> {
    let (content, provider, client) = prepare_submission(actor, &input, deps).await?;

    info!(provider_id = %provider.id, name = %input.name, "Submitting template content");
    let external_id = client.create_content(&content).await?;

    let now = Utc::now();
    let template = Template {
        id: TemplateId::new(),
        user_id: actor.user_id,
        name: input.name,
        content: input.content,
        status: ApprovalStatus::Unsubmitted,
        platform: input.platform,
        provider_type: input.provider_type,
        provider_id: provider.id,
        external_id: Some(external_id.clone()),
        next_check: None,
        created_at: now,
        updated_at: now,
    };

    match deps.templates.insert(&template).await {
        Ok(created) => {
            info!(template_id = %created.id, "Template created");
            Ok(created)
        }
        Err(e) => {
            discard_content(client.as_ref(), &external_id).await;
            Err(e.into())
        }
    }
}

/// Remove content the provider accepted but no local row points at
async fn discard_content(client: &dyn BaseMessagingClient, external_id: &str) {
    if let Err(cleanup) = client.delete_content(external_id).await {
        warn!(
            external_id = %external_id,
            error = %cleanup,
            "Failed to remove template content after local write failed"
        );
    }
}

/// Replace a template's definition and resubmit its content.
///
/// The template goes back to `unsubmitted` and leaves the reconciliation
/// schedule. The previous provider content is removed best-effort. If the
/// local write fails, the new content is removed instead and the stored
/// template keeps pointing at the previous content.
pub async fn update_template(
    actor: Actor,
    id: TemplateId,
    input: TemplateInput,
    deps: &ServerDeps,
) -> AppResult<Template> {
    let mut template = get_template(actor, id, deps).await?;
    let (content, provider, client) = prepare_submission(actor, &input, deps).await?;

    info!(template_id = %id, "Resubmitting template content");
    let external_id = client.create_content(&content).await?;

    let previous_external_id = template.external_id.replace(external_id.clone());
    let previous_provider_id = template.provider_id;

    template.name = input.name;
    template.content = input.content;
    template.platform = input.platform;
    template.provider_type = input.provider_type;
    template.provider_id = provider.id;
    template.status = ApprovalStatus::Unsubmitted;
    template.next_check = None;

    let updated = match deps.templates.update(&template).await {
        Ok(updated) => updated,
        Err(e) => {
            discard_content(client.as_ref(), &external_id).await;
            return Err(e.into());
        }
    };

    if let Some(old) = previous_external_id {
        let old_client = if previous_provider_id == provider.id {
            Ok(client)
        } else {
            old_provider_client(previous_provider_id, deps).await
        };
        let removed = match old_client {
            Ok(old_client) => old_client.delete_content(&old).await.map_err(AppError::from),
            Err(e) => Err(e),
        };
        if let Err(e) = removed {
            warn!(template_id = %id, external_id = %old, error = %e, "Failed to delete previous template content");
        }
    }

    info!(template_id = %id, "Template updated");
    Ok(updated)
}

async fn old_provider_client(
    provider_id: ProviderId,
    deps: &ServerDeps,
) -> AppResult<Arc<dyn BaseMessagingClient>> {
    let (_, credential) = resolve_without_check(provider_id, deps).await?;
    Ok(deps.messaging.twilio(&credential.into_twilio()?))
}

/// Submit a template for WhatsApp review and schedule the first status check.
pub async fn approve_template(
    actor: Actor,
    id: TemplateId,
    input: ApproveTemplateInput,
    deps: &ServerDeps,
) -> AppResult<Template> {
    if input.name.trim().is_empty() || input.category.trim().is_empty() {
        return Err(AppError::bad_request("name and category are required"));
    }

    let template = get_template(actor, id, deps).await?;
    let external_id = template.external_id.clone().ok_or_else(|| {
        AppError::bad_request(format!("template {} has not been submitted to the provider", id))
    })?;

    let (_, credential) = resolve_with_credentials(actor, template.provider_id, deps).await?;
    let client = deps.messaging.twilio(&credential.into_twilio()?);

    let reported = client
        .submit_approval(&external_id, &input.name, &input.category)
        .await?;
    let status = ApprovalStatus::from_provider(&reported)
        .map_err(|e| AppError::Internal(e.into()))?;
    let next_check = Utc::now() + deps.template_recheck;

    let updated = deps
        .templates
        .update_review_state(id, Some(status), Some(next_check))
        .await?;

    info!(template_id = %id, status = %status, "Template submitted for approval");
    Ok(updated)
}

/// Delete a template, provider side first.
///
/// If the provider refuses, the local record stays so the two never drift.
pub async fn delete_template(actor: Actor, id: TemplateId, deps: &ServerDeps) -> AppResult<()> {
    let template = get_template(actor, id, deps).await?;

    if let Some(external_id) = template.external_id.as_deref() {
        let (_, credential) = resolve_with_credentials(actor, template.provider_id, deps).await?;
        let client = deps.messaging.twilio(&credential.into_twilio()?);
        client.delete_content(external_id).await?;
    }

    deps.templates.delete(id).await?;
    info!(template_id = %id, "Template deleted");
    Ok(())
}
