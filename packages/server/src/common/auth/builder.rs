use super::{AuthError, Capability, Role};
use crate::common::entity_ids::UserId;

/// Entry point for authorization checks
///
/// Usage:
/// ```ignore
/// actor.can(Capability::ManageOwned(template.user_id)).check()?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn user(user_id: UserId) -> Self {
        Self::new(user_id, Role::User)
    }

    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Specify what capability the actor needs
    pub fn can(self, capability: Capability) -> CapabilityBuilder {
        CapabilityBuilder {
            actor: self,
            capability,
        }
    }
}

/// Builder after specifying capability
pub struct CapabilityBuilder {
    actor: Actor,
    capability: Capability,
}

impl CapabilityBuilder {
    pub fn check(self) -> Result<(), AuthError> {
        if self.actor.is_admin() {
            return Ok(());
        }

        match self.capability {
            Capability::ManageOwned(owner) if owner == self.actor.user_id => Ok(()),
            Capability::ManageOwned(_) => Err(AuthError::AccessDenied),
            Capability::Admin => Err(AuthError::AdminRequired),
        }
    }
}
