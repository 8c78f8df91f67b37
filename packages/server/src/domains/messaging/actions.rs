//! Message send actions
//!
//! Both entry points resolve the provider and template with access checks,
//! turn recipients into phone numbers, and hand the batch to the dispatcher.

use std::collections::HashMap;

use tracing::info;

use crate::common::{Actor, AppError, AppResult, Capability, ContactId, ProviderId, TemplateId};
use crate::domains::contacts::Contact;
use crate::domains::messaging::data::{DispatchReport, SendMessagesInput, SendToListInput};
use crate::domains::messaging::dispatch::{dispatch, DispatchJob, DispatchPlan};
use crate::domains::providers::models::UserProvider;
use crate::domains::providers::resolver::resolve_with_credentials;
use crate::domains::providers::ProviderCredential;
use crate::domains::templates::actions::get_sendable_template;
use crate::domains::templates::models::Platform;
use crate::kernel::ServerDeps;

/// Resolve provider and template and build the shared dispatch plan
async fn prepare_plan(
    actor: Actor,
    provider_id: ProviderId,
    template_id: TemplateId,
    deps: &ServerDeps,
) -> AppResult<DispatchPlan> {
    let (provider, credential) = resolve_with_credentials(actor, provider_id, deps).await?;
    let (template, content_sid) = get_sendable_template(actor, template_id, deps).await?;

    // Content ids only exist inside the account they were submitted to.
    if template.provider_id != provider.id {
        return Err(AppError::bad_request(format!(
            "template {} was submitted through provider {}, not {}",
            template.id, template.provider_id, provider.id
        )));
    }

    if template.platform == Platform::Email {
        return Err(AppError::bad_request(
            "email templates cannot be sent through a messaging provider",
        ));
    }

    build_plan(provider, credential, template.platform, content_sid, deps)
}

fn build_plan(
    provider: UserProvider,
    credential: ProviderCredential,
    platform: Platform,
    content_sid: String,
    deps: &ServerDeps,
) -> AppResult<DispatchPlan> {
    let credential = credential.into_twilio()?;
    Ok(DispatchPlan {
        client: deps.messaging.twilio(&credential),
        platform,
        from: provider.from_phone_number,
        messaging_service_sid: credential.messaging_service_sid,
        content_sid,
    })
}

/// Send a template to explicit recipients, each with its own variables.
pub async fn send_to_recipients(
    actor: Actor,
    input: SendMessagesInput,
    deps: &ServerDeps,
) -> AppResult<DispatchReport> {
    if input.recipients.is_empty() {
        return Err(AppError::bad_request("recipients must not be empty"));
    }

    let plan = prepare_plan(actor, input.provider_id, input.template_id, deps).await?;

    let ids: Vec<ContactId> = input.recipients.iter().map(|r| r.recipient_id).collect();
    let contacts: HashMap<ContactId, Contact> = deps
        .contacts
        .find_by_ids(&ids)
        .await?
        .into_iter()
        .map(|contact| (contact.id, contact))
        .collect();

    let requested = input.recipients.len();
    let mut jobs = Vec::with_capacity(requested);
    let mut skipped = Vec::new();

    for recipient in input.recipients {
        // Another user's contact resolves no better than a missing one.
        let phone = contacts
            .get(&recipient.recipient_id)
            .filter(|c| actor.can(Capability::ManageOwned(c.user_id)).check().is_ok())
            .map(|c| c.phone_number.clone())
            .filter(|phone| !phone.trim().is_empty());

        match phone {
            Some(phone_number) => jobs.push(DispatchJob {
                phone_number,
                variables: recipient.template_variables,
            }),
            None => skipped.push(recipient.recipient_id),
        }
    }

    run_batch(plan, jobs, requested, skipped, deps).await
}

/// Send a template to every contact in a list, sharing one variable payload.
pub async fn send_to_group(
    actor: Actor,
    input: SendToListInput,
    deps: &ServerDeps,
) -> AppResult<DispatchReport> {
    let plan = prepare_plan(actor, input.provider_id, input.template_id, deps).await?;

    let group = deps
        .contacts
        .find_list_with_contacts(input.contact_list_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("contact list {}", input.contact_list_id)))?;
    actor.can(Capability::ManageOwned(group.list.user_id)).check()?;

    let requested = group.contacts.len();
    let mut jobs = Vec::with_capacity(requested);
    let mut skipped = Vec::new();

    for contact in group.contacts {
        if contact.phone_number.trim().is_empty() {
            skipped.push(contact.id);
            continue;
        }
        jobs.push(DispatchJob {
            phone_number: contact.phone_number,
            variables: input.template_variables.clone(),
        });
    }

    run_batch(plan, jobs, requested, skipped, deps).await
}

async fn run_batch(
    plan: DispatchPlan,
    jobs: Vec<DispatchJob>,
    requested: usize,
    skipped: Vec<ContactId>,
    deps: &ServerDeps,
) -> AppResult<DispatchReport> {
    let results = dispatch(&deps.dispatch_pool, plan, jobs).await?;

    let sent = results.iter().filter(|r| r.is_success()).count();
    info!(
        requested,
        attempted = results.len(),
        sent,
        failed = results.len() - sent,
        skipped = skipped.len(),
        "Batch processed"
    );

    Ok(DispatchReport {
        results,
        requested,
        skipped,
    })
}
