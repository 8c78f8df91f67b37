//! Typed provider credentials.
//!
//! Every provider type has one decoded shape implementing [`Credential`].
//! Stored secrets are decoded into a [`ProviderCredential`] chosen by the
//! provider's type tag, and callers pattern-match on it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::common::{AppError, AppResult};
use crate::domains::contacts::normalize_e164;
use crate::domains::providers::models::ProviderType;

/// Capability shared by every decoded credential shape.
pub trait Credential: Serialize + DeserializeOwned + Send + Sync + 'static {
    const PROVIDER_TYPE: ProviderType;

    /// Names of required fields that are empty
    fn missing_fields(&self) -> Vec<&'static str>;
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwilioCredential {
    #[serde(rename = "twilio_account_sid")]
    pub account_sid: String,
    #[serde(rename = "twilio_auth_token")]
    pub auth_token: String,
    #[serde(rename = "twilio_messaging_service_sid")]
    pub messaging_service_sid: String,
}

impl Credential for TwilioCredential {
    const PROVIDER_TYPE: ProviderType = ProviderType::Twilio;

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.account_sid.trim().is_empty() {
            missing.push("twilio_account_sid");
        }
        if self.auth_token.trim().is_empty() {
            missing.push("twilio_auth_token");
        }
        if self.messaging_service_sid.trim().is_empty() {
            missing.push("twilio_messaging_service_sid");
        }
        missing
    }
}

impl std::fmt::Debug for TwilioCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioCredential")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("messaging_service_sid", &self.messaging_service_sid)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlivoCredential {
    #[serde(rename = "plivo_auth_id")]
    pub auth_id: String,
    #[serde(rename = "plivo_auth_token")]
    pub auth_token: String,
}

impl Credential for PlivoCredential {
    const PROVIDER_TYPE: ProviderType = ProviderType::Plivo;

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.auth_id.trim().is_empty() {
            missing.push("plivo_auth_id");
        }
        if self.auth_token.trim().is_empty() {
            missing.push("plivo_auth_token");
        }
        missing
    }
}

impl std::fmt::Debug for PlivoCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlivoCredential")
            .field("auth_id", &self.auth_id)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

/// A decoded credential of whichever shape the provider type calls for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCredential {
    Twilio(TwilioCredential),
    Plivo(PlivoCredential),
}

impl ProviderCredential {
    /// Decode stored secret bytes by provider type. Failure is fatal to the
    /// calling operation.
    pub fn decode(provider_type: ProviderType, bytes: &[u8]) -> anyhow::Result<Self> {
        match provider_type {
            ProviderType::Twilio => decode_as::<TwilioCredential>(bytes).map(Self::Twilio),
            ProviderType::Plivo => decode_as::<PlivoCredential>(bytes).map(Self::Plivo),
        }
    }

    pub fn encode(&self) -> anyhow::Result<Vec<u8>> {
        let bytes = match self {
            Self::Twilio(credential) => serde_json::to_vec(credential)?,
            Self::Plivo(credential) => serde_json::to_vec(credential)?,
        };
        Ok(bytes)
    }

    pub fn provider_type(&self) -> ProviderType {
        match self {
            Self::Twilio(_) => TwilioCredential::PROVIDER_TYPE,
            Self::Plivo(_) => PlivoCredential::PROVIDER_TYPE,
        }
    }

    /// The Twilio shape, or BadRequest for providers we cannot drive yet
    pub fn into_twilio(self) -> AppResult<TwilioCredential> {
        match self {
            Self::Twilio(credential) => Ok(credential),
            other => Err(AppError::bad_request(format!(
                "unsupported provider: {}",
                other.provider_type()
            ))),
        }
    }
}

fn decode_as<C: Credential>(bytes: &[u8]) -> anyhow::Result<C> {
    serde_json::from_slice(bytes)
        .map_err(|e| anyhow::anyhow!("error on provider credentials: {}", e))
}

// =============================================================================
// Registration payloads
// =============================================================================

#[derive(Deserialize)]
struct TwilioRegistration {
    #[serde(flatten)]
    credential: TwilioCredential,
    twilio_from_phone_number: String,
}

#[derive(Deserialize)]
struct PlivoRegistration {
    #[serde(flatten)]
    credential: PlivoCredential,
    plivo_from_phone_number: String,
}

/// Split a registration payload into the secret part and the sending number.
///
/// The from-number is normalized to E.164 and kept on the provider row; the
/// secret never contains it.
pub fn parse_registration(
    provider_type: ProviderType,
    payload: serde_json::Value,
) -> AppResult<(ProviderCredential, String)> {
    let (credential, from_number, missing) = match provider_type {
        ProviderType::Twilio => {
            let reg: TwilioRegistration = serde_json::from_value(payload).map_err(|e| {
                AppError::bad_request(format!("error on provider credentials: {}", e))
            })?;
            let missing = reg.credential.missing_fields();
            (
                ProviderCredential::Twilio(reg.credential),
                reg.twilio_from_phone_number,
                missing,
            )
        }
        ProviderType::Plivo => {
            let reg: PlivoRegistration = serde_json::from_value(payload).map_err(|e| {
                AppError::bad_request(format!("error on provider credentials: {}", e))
            })?;
            let missing = reg.credential.missing_fields();
            (
                ProviderCredential::Plivo(reg.credential),
                reg.plivo_from_phone_number,
                missing,
            )
        }
    };

    if !missing.is_empty() {
        return Err(AppError::bad_request(format!(
            "missing credential fields: {}",
            missing.join(", ")
        )));
    }

    let from_number = normalize_e164(&from_number)
        .map_err(|e| AppError::bad_request(format!("invalid from phone number: {}", e)))?;

    Ok((credential, from_number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn twilio_payload() -> serde_json::Value {
        json!({
            "twilio_account_sid": "AC1",
            "twilio_auth_token": "tok",
            "twilio_messaging_service_sid": "MG1",
            "twilio_from_phone_number": "+1 415 555 0199"
        })
    }

    #[test]
    fn test_registration_splits_from_number() {
        let (credential, from) =
            parse_registration(ProviderType::Twilio, twilio_payload()).unwrap();
        assert_eq!(from, "+14155550199");

        let stored: serde_json::Value =
            serde_json::from_slice(&credential.encode().unwrap()).unwrap();
        assert_eq!(
            stored,
            json!({
                "twilio_account_sid": "AC1",
                "twilio_auth_token": "tok",
                "twilio_messaging_service_sid": "MG1"
            })
        );
    }

    #[test]
    fn test_registration_rejects_empty_fields() {
        let mut payload = twilio_payload();
        payload["twilio_auth_token"] = json!("");
        let err = parse_registration(ProviderType::Twilio, payload).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m.contains("twilio_auth_token")));
    }

    #[test]
    fn test_registration_rejects_bad_from_number() {
        let mut payload = twilio_payload();
        payload["twilio_from_phone_number"] = json!("555");
        let err = parse_registration(ProviderType::Twilio, payload).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_decode_by_provider_type() {
        let bytes = br#"{"plivo_auth_id":"MA1","plivo_auth_token":"t"}"#;
        let credential = ProviderCredential::decode(ProviderType::Plivo, bytes).unwrap();
        assert_eq!(credential.provider_type(), ProviderType::Plivo);
        assert!(matches!(
            credential.into_twilio(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_decode_wrong_shape_fails() {
        let bytes = br#"{"plivo_auth_id":"MA1","plivo_auth_token":"t"}"#;
        assert!(ProviderCredential::decode(ProviderType::Twilio, bytes).is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let credential = TwilioCredential {
            account_sid: "AC1".into(),
            auth_token: "super-secret".into(),
            messaging_service_sid: "MG1".into(),
        };
        assert!(!format!("{:?}", credential).contains("super-secret"));
    }
}
