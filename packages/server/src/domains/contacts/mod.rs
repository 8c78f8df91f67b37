//! Contacts domain - address book lookups and phone number validation

pub mod data;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use data::{NumberValidation, ValidateNumbersInput};
pub use models::{Contact, ContactList, ContactListWithContacts, PgContactStore};
pub use validation::{normalize_e164, validate_many};
