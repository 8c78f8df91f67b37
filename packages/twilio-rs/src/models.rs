use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /v1/Content`.
///
/// `types` holds one entry per channel rendering (`twilio/text`,
/// `twilio/quick-reply`, ...), passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentCreateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    pub language: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub variables: HashMap<String, String>,
    pub types: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentResource {
    pub sid: String,
    pub account_sid: Option<String>,
    pub friendly_name: Option<String>,
    pub language: Option<String>,
}

/// Body of `POST /v1/Content/{sid}/ApprovalRequests/whatsapp`.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalRequest {
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalCreateResponse {
    pub name: Option<String>,
    pub category: Option<String>,
    pub content_type: Option<String>,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub allow_category_change: Option<bool>,
}

/// WhatsApp section of an approval fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhatsAppApproval {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub allow_category_change: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalFetchResponse {
    pub sid: Option<String>,
    pub account_sid: Option<String>,
    #[serde(default)]
    pub whatsapp: Option<WhatsAppApproval>,
    pub url: Option<String>,
}

/// Form fields of `POST /2010-04-01/Accounts/{sid}/Messages.json`.
#[derive(Debug, Clone)]
pub struct CreateMessage {
    pub to: String,
    pub from: String,
    pub messaging_service_sid: String,
    pub content_sid: String,
    /// JSON object encoded as a string
    pub content_variables: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResource {
    pub sid: String,
    pub status: Option<String>,
    pub to: Option<String>,
    pub error_code: Option<i64>,
    pub error_message: Option<String>,
}
