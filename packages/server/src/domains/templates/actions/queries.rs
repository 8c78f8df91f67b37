//! Template query actions

use crate::common::{Actor, AppError, AppResult, Capability, TemplateId};
use crate::domains::templates::models::Template;
use crate::kernel::ServerDeps;

/// Load a template the actor owns (admins may load any)
pub async fn get_template(actor: Actor, id: TemplateId, deps: &ServerDeps) -> AppResult<Template> {
    let template = deps
        .templates
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("template {}", id)))?;

    actor.can(Capability::ManageOwned(template.user_id)).check()?;
    Ok(template)
}

/// Load a template that has been submitted to the provider and can be sent
pub async fn get_sendable_template(
    actor: Actor,
    id: TemplateId,
    deps: &ServerDeps,
) -> AppResult<(Template, String)> {
    let template = get_template(actor, id, deps).await?;
    match template.external_id.clone() {
        Some(external_id) if !external_id.is_empty() => Ok((template, external_id)),
        _ => Err(AppError::bad_request(format!(
            "template {} has not been submitted to the provider",
            id
        ))),
    }
}

pub async fn list_my_templates(actor: Actor, deps: &ServerDeps) -> AppResult<Vec<Template>> {
    Ok(deps.templates.find_by_owner(actor.user_id).await?)
}

/// Every template in the system (admin only)
pub async fn list_all_templates(actor: Actor, deps: &ServerDeps) -> AppResult<Vec<Template>> {
    actor.can(Capability::Admin).check()?;
    Ok(deps.templates.find_all().await?)
}
