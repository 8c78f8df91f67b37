//! Typed ids for every entity the messenger core touches.

pub use super::id::{Id, V4, V7};

/// Account owner (comes from the auth token, never stored here).
pub struct User;

/// Registered messaging-provider account.
pub struct UserProvider;

/// Reusable message definition.
pub struct Template;

/// Address-book entry.
pub struct UserContact;

/// Named group of contacts.
pub struct ContactList;

pub type UserId = Id<User>;
pub type ProviderId = Id<UserProvider>;
pub type TemplateId = Id<Template>;
pub type ContactId = Id<UserContact>;
pub type ContactListId = Id<ContactList>;
