//! Providers domain - messaging-provider accounts and their credentials

pub mod actions;
pub mod credentials;
pub mod data;
pub mod models;
pub mod resolver;

// Re-export commonly used types
pub use credentials::{Credential, PlivoCredential, ProviderCredential, TwilioCredential};
pub use data::{ProviderData, RegisterProviderInput};
pub use models::{PgProviderStore, ProviderType, UserProvider};
pub use resolver::{resolve_with_credentials, resolve_without_check};
