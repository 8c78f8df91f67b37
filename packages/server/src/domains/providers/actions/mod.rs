//! Provider domain actions - business logic functions
//!
//! Actions are async functions called directly from the HTTP handlers.

mod mutations;
mod queries;

pub use mutations::*;
pub use queries::*;
