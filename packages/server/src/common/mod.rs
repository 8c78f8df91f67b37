// Common types and utilities shared across the application

pub mod auth;
pub mod entity_ids;
pub mod error;
pub mod id;
pub mod worker_pool;

pub use auth::{Actor, AuthError, Capability, Role};
pub use entity_ids::*;
pub use error::{AppError, AppResult};
pub use id::{Id, V4, V7};
pub use worker_pool::WorkerPool;
