/// Authorization module
///
/// Every manual operation checks ownership through the same fluent API:
///
/// ```ignore
/// use crate::common::auth::{Actor, Capability};
///
/// actor
///     .can(Capability::ManageOwned(provider.user_id))
///     .check()?;
/// ```
///
/// Admins pass every check. Background jobs act on behalf of the system
/// and skip these checks entirely.

mod errors;
mod capability;
mod builder;

pub use errors::AuthError;
pub use capability::{Capability, Role};
pub use builder::{Actor, CapabilityBuilder};
