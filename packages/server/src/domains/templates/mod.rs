//! Templates domain - message definitions and their provider approval state

pub mod actions;
pub mod data;
pub mod models;
pub mod reconciliation;

// Re-export commonly used types
pub use data::{ApproveTemplateInput, ProviderAlert, SyncReport, TemplateData, TemplateInput};
pub use models::{ApprovalStatus, PgTemplateStore, Platform, Template};
pub use reconciliation::{handle_provider_alert, reconcile_due_templates, sync_templates};
