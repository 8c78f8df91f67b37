//! Provider lookup with ownership checks and credential retrieval.

use tracing::debug;

use crate::common::{Actor, AppError, AppResult, Capability, ProviderId};
use crate::domains::providers::credentials::ProviderCredential;
use crate::domains::providers::models::UserProvider;
use crate::kernel::{SecretError, ServerDeps};

/// Load a provider by id (no access check)
async fn find_provider(id: ProviderId, deps: &ServerDeps) -> AppResult<UserProvider> {
    deps.providers
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("provider {}", id)))
}

/// Load a provider the actor owns (admins may load any)
pub async fn resolve_provider(
    actor: Actor,
    id: ProviderId,
    deps: &ServerDeps,
) -> AppResult<UserProvider> {
    let provider = find_provider(id, deps).await?;
    actor.can(Capability::ManageOwned(provider.user_id)).check()?;
    Ok(provider)
}

/// Load a provider and its decoded credentials on behalf of an actor.
pub async fn resolve_with_credentials(
    actor: Actor,
    id: ProviderId,
    deps: &ServerDeps,
) -> AppResult<(UserProvider, ProviderCredential)> {
    let provider = resolve_provider(actor, id, deps).await?;
    let credential = load_credentials(&provider, deps).await?;
    Ok((provider, credential))
}

/// Same as [`resolve_with_credentials`] without the ownership check.
/// Background jobs act for the system, not for a user.
pub async fn resolve_without_check(
    id: ProviderId,
    deps: &ServerDeps,
) -> AppResult<(UserProvider, ProviderCredential)> {
    let provider = find_provider(id, deps).await?;
    let credential = load_credentials(&provider, deps).await?;
    Ok((provider, credential))
}

async fn load_credentials(
    provider: &UserProvider,
    deps: &ServerDeps,
) -> AppResult<ProviderCredential> {
    debug!(provider_id = %provider.id, "Fetching provider credentials");

    let bytes = deps
        .secrets
        .fetch(&provider.provider_credentials)
        .await
        .map_err(|e| match e {
            SecretError::NotFound(_) => {
                AppError::not_found(format!("credentials for provider {}", provider.id))
            }
            SecretError::Transport(e) => AppError::Internal(e),
        })?;

    ProviderCredential::decode(provider.provider_type, &bytes).map_err(AppError::Internal)
}
