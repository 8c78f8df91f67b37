pub mod provider;

pub use provider::{PgProviderStore, ProviderType, UserProvider};
