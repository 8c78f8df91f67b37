pub mod provider;

pub use provider::{ProviderData, RegisterProviderInput};
