//! Provider query actions

use crate::common::{Actor, AppResult, Capability, ProviderId};
use crate::domains::providers::models::UserProvider;
use crate::domains::providers::resolver::resolve_provider;
use crate::kernel::ServerDeps;

pub async fn get_provider(
    actor: Actor,
    id: ProviderId,
    deps: &ServerDeps,
) -> AppResult<UserProvider> {
    resolve_provider(actor, id, deps).await
}

pub async fn list_my_providers(actor: Actor, deps: &ServerDeps) -> AppResult<Vec<UserProvider>> {
    Ok(deps.providers.find_by_owner(actor.user_id).await?)
}

/// Every provider in the system (admin only)
pub async fn list_all_providers(actor: Actor, deps: &ServerDeps) -> AppResult<Vec<UserProvider>> {
    actor.can(Capability::Admin).check()?;
    Ok(deps.providers.find_all().await?)
}
