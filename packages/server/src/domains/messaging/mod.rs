//! Messaging domain - template dispatch to one or many recipients

pub mod actions;
pub mod data;
pub mod dispatch;

pub use actions::{send_to_group, send_to_recipients};
pub use data::{
    DispatchReport, DispatchResult, MessageSendStatus, Recipient, SendMessagesInput,
    SendToListInput,
};
