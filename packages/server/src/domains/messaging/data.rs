use serde::{Deserialize, Serialize};

use crate::common::{ContactId, ContactListId, ProviderId, TemplateId};

/// One explicit recipient with its own template variables
#[derive(Debug, Clone, Deserialize)]
pub struct Recipient {
    pub recipient_id: ContactId,
    #[serde(default)]
    pub template_variables: serde_json::Value,
}

/// Body of `POST /v1/messages`
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessagesInput {
    pub recipients: Vec<Recipient>,
    pub provider_id: ProviderId,
    pub template_id: TemplateId,
}

/// Body of `POST /v1/messages/to-list`
#[derive(Debug, Clone, Deserialize)]
pub struct SendToListInput {
    pub provider_id: ProviderId,
    pub template_id: TemplateId,
    /// Shared by every member of the list
    #[serde(default)]
    pub template_variables: serde_json::Value,
    pub contact_list_id: ContactListId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSendStatus {
    Success,
    Fail,
}

/// Outcome of one send attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub phone_number: String,
    pub status: MessageSendStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DispatchResult {
    pub fn success(phone_number: String) -> Self {
        Self {
            phone_number,
            status: MessageSendStatus::Success,
            error_message: None,
        }
    }

    pub fn fail(phone_number: String, error: impl ToString) -> Self {
        Self {
            phone_number,
            status: MessageSendStatus::Fail,
            error_message: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == MessageSendStatus::Success
    }
}

/// Result of a batch send.
///
/// `results` has one entry per attempted recipient, in request order.
/// Recipients whose contact did not resolve to a phone number are listed in
/// `skipped` instead, so `results.len() + skipped.len() == requested`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub results: Vec<DispatchResult>,
    pub requested: usize,
    pub skipped: Vec<ContactId>,
}
