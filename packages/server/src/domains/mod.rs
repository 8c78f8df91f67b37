// Business domains
pub mod auth;
pub mod contacts;
pub mod messaging;
pub mod providers;
pub mod templates;
