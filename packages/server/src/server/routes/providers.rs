use axum::{extract::Extension, http::StatusCode};
use serde_json::json;

use crate::common::{AppResult, ProviderId};
use crate::domains::providers::actions;
use crate::domains::providers::data::{ProviderData, RegisterProviderInput};
use crate::domains::providers::UserProvider;
use crate::server::app::AppState;
use crate::server::extract::{AppJson, AppPath};
use crate::server::middleware::AuthUser;
use crate::server::response::Data;

pub async fn register_provider_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    AppJson(input): AppJson<RegisterProviderInput>,
) -> AppResult<(StatusCode, Data<ProviderData>)> {
    let provider = actions::register_provider(user.actor(), input, &state.deps).await?;
    Ok((
        StatusCode::CREATED,
        Data::new(ProviderData::from_model(provider, &state.deps.app_url)),
    ))
}

pub async fn list_my_providers_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
) -> AppResult<Data<Vec<ProviderData>>> {
    let providers = actions::list_my_providers(user.actor(), &state.deps).await?;
    Ok(Data::new(to_data(providers, &state)))
}

pub async fn list_all_providers_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
) -> AppResult<Data<Vec<ProviderData>>> {
    let providers = actions::list_all_providers(user.actor(), &state.deps).await?;
    Ok(Data::new(to_data(providers, &state)))
}

pub async fn get_provider_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<ProviderId>,
) -> AppResult<Data<ProviderData>> {
    let provider = actions::get_provider(user.actor(), id, &state.deps).await?;
    Ok(Data::new(ProviderData::from_model(
        provider,
        &state.deps.app_url,
    )))
}

pub async fn delete_provider_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<ProviderId>,
) -> AppResult<Data<serde_json::Value>> {
    actions::delete_provider(user.actor(), id, &state.deps).await?;
    Ok(Data::new(json!({ "message": "Provider deleted" })))
}

fn to_data(providers: Vec<UserProvider>, state: &AppState) -> Vec<ProviderData> {
    providers
        .into_iter()
        .map(|provider| ProviderData::from_model(provider, &state.deps.app_url))
        .collect()
}
