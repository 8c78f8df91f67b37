pub mod contact;

pub use contact::{Contact, ContactList, ContactListWithContacts, PgContactStore};
