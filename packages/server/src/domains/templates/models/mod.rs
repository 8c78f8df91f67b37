pub mod template;

pub use template::{ApprovalStatus, InvalidStatus, PgTemplateStore, Platform, Template};
