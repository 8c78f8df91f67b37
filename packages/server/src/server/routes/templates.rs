use axum::{extract::Extension, http::StatusCode};
use serde_json::json;

use crate::common::{AppResult, ProviderId, TemplateId};
use crate::domains::templates::data::{
    ApproveTemplateInput, ProviderAlert, SyncReport, TemplateData, TemplateInput,
};
use crate::domains::templates::{actions, handle_provider_alert, sync_templates, Template};
use crate::server::app::AppState;
use crate::server::extract::{AppForm, AppJson, AppPath};
use crate::server::middleware::AuthUser;
use crate::server::response::Data;

pub async fn create_template_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    AppJson(input): AppJson<TemplateInput>,
) -> AppResult<(StatusCode, Data<TemplateData>)> {
    let template = actions::create_template(user.actor(), input, &state.deps).await?;
    Ok((StatusCode::CREATED, Data::new(template.into())))
}

pub async fn list_my_templates_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
) -> AppResult<Data<Vec<TemplateData>>> {
    let templates = actions::list_my_templates(user.actor(), &state.deps).await?;
    Ok(Data::new(to_data(templates)))
}

pub async fn list_all_templates_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
) -> AppResult<Data<Vec<TemplateData>>> {
    let templates = actions::list_all_templates(user.actor(), &state.deps).await?;
    Ok(Data::new(to_data(templates)))
}

pub async fn get_template_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<TemplateId>,
) -> AppResult<Data<TemplateData>> {
    let template = actions::get_template(user.actor(), id, &state.deps).await?;
    Ok(Data::new(template.into()))
}

pub async fn update_template_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<TemplateId>,
    AppJson(input): AppJson<TemplateInput>,
) -> AppResult<Data<TemplateData>> {
    let template = actions::update_template(user.actor(), id, input, &state.deps).await?;
    Ok(Data::new(template.into()))
}

pub async fn delete_template_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<TemplateId>,
) -> AppResult<Data<serde_json::Value>> {
    actions::delete_template(user.actor(), id, &state.deps).await?;
    Ok(Data::new(json!({ "message": "Template deleted" })))
}

pub async fn approve_template_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<TemplateId>,
    AppJson(input): AppJson<ApproveTemplateInput>,
) -> AppResult<Data<TemplateData>> {
    let template = actions::approve_template(user.actor(), id, input, &state.deps).await?;
    Ok(Data::new(template.into()))
}

/// On-demand reconciliation pass (admin only)
pub async fn sync_templates_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
) -> AppResult<Data<SyncReport>> {
    let report = sync_templates(user.actor(), &state.deps).await?;
    Ok(Data::new(report))
}

/// Provider alert callback. Authenticated by the provider account sid, not
/// a user token.
pub async fn provider_webhook_handler(
    Extension(state): Extension<AppState>,
    AppPath(provider_id): AppPath<ProviderId>,
    AppForm(alert): AppForm<ProviderAlert>,
) -> AppResult<Data<SyncReport>> {
    let report = handle_provider_alert(provider_id, alert, &state.deps).await?;
    Ok(Data::new(report))
}

fn to_data(templates: Vec<Template>) -> Vec<TemplateData> {
    templates.into_iter().map(TemplateData::from).collect()
}
