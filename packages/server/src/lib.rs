// Messenger API Core
//
// Multi-tenant messaging backend: users register messaging-provider accounts,
// manage templates that go through provider approval, and send those
// templates to contacts in bulk.
//
// Architecture follows domain-driven design: domains/* hold models, data and
// actions; kernel/ holds infrastructure traits and adapters.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
