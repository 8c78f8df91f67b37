use serde::{Deserialize, Serialize};

/// Body of `POST /v1/contacts/validate`
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateNumbersInput {
    pub numbers: Vec<String>,
}

/// Outcome of validating one phone number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberValidation {
    pub number: String,
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
