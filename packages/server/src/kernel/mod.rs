//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod scheduled_tasks;
pub mod secret_manager;
pub mod test_dependencies;
pub mod traits;

pub use deps::{ServerDeps, TwilioAdapter, TwilioClientFactory};
pub use scheduled_tasks::start_scheduler;
pub use secret_manager::{GoogleSecretManager, ServiceAccountKey};
pub use test_dependencies::TestDependencies;
pub use traits::*;
