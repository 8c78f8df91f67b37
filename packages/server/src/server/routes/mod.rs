// HTTP routes
pub mod contacts;
pub mod health;
pub mod messages;
pub mod providers;
pub mod templates;

pub use contacts::*;
pub use health::*;
pub use messages::*;
pub use providers::*;
pub use templates::*;
