//! Provider mutation actions
//!
//! Actions are self-contained: they handle auth checks, talk to the secret
//! store, and return final models.

use chrono::Utc;
use tracing::{info, warn};

use crate::common::{Actor, AppError, AppResult, ProviderId};
use crate::domains::providers::credentials::parse_registration;
use crate::domains::providers::data::RegisterProviderInput;
use crate::domains::providers::models::UserProvider;
use crate::domains::providers::resolver::resolve_provider;
use crate::domains::templates::models::ApprovalStatus;
use crate::kernel::{SecretError, ServerDeps};

/// Register a provider account for the actor.
///
/// The secret is stored first; if the row insert then fails the secret is
/// removed again (best-effort).
pub async fn register_provider(
    actor: Actor,
    input: RegisterProviderInput,
    deps: &ServerDeps,
) -> AppResult<UserProvider> {
    if input.name.trim().is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }

    let (credential, from_phone_number) =
        parse_registration(input.provider_type, input.credentials)?;

    info!(user_id = %actor.user_id, provider_type = %input.provider_type, "Registering provider");

    let payload = credential.encode()?;
    let reference = deps
        .secrets
        .store(&payload)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let now = Utc::now();
    let provider = UserProvider {
        id: ProviderId::new(),
        user_id: actor.user_id,
        name: input.name,
        provider_credentials: reference,
        from_phone_number,
        status: ApprovalStatus::Approved,
        provider_type: input.provider_type,
        created_at: now,
        updated_at: now,
    };

    match deps.providers.insert(&provider).await {
        Ok(created) => {
            info!(provider_id = %created.id, "Provider registered");
            Ok(created)
        }
        Err(e) => {
            if let Err(cleanup) = deps.secrets.delete(&provider.provider_credentials).await {
                warn!(
                    error = %cleanup,
                    "Failed to remove secret after provider insert failed"
                );
            }
            Err(e.into())
        }
    }
}

/// Delete a provider and its stored credentials.
///
/// Refused while templates still point at the provider: their content lives
/// in the provider account and has to be removed through the template
/// delete first. The row is kept unless the remote secret is gone, so a
/// failed secret delete never leaves credentials without an owner record.
pub async fn delete_provider(actor: Actor, id: ProviderId, deps: &ServerDeps) -> AppResult<()> {
    let provider = resolve_provider(actor, id, deps).await?;

    let templates = deps.templates.find_by_provider(id).await?;
    if !templates.is_empty() {
        return Err(AppError::bad_request(format!(
            "provider {} still has {} template(s); delete them first",
            id,
            templates.len()
        )));
    }

    match deps.secrets.delete(&provider.provider_credentials).await {
        Ok(()) => {}
        Err(SecretError::NotFound(_)) => {
            warn!(provider_id = %id, "Provider secret already removed");
        }
        Err(SecretError::Transport(e)) => {
            warn!(provider_id = %id, error = %e, "Failed to delete provider secret");
            return Err(AppError::Internal(e));
        }
    }

    deps.providers.delete(id).await?;
    info!(provider_id = %id, "Provider deleted");
    Ok(())
}
