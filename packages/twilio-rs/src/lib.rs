// Twilio REST client covering the Content API (templates), WhatsApp
// approval requests and the Messages API.

use std::collections::HashMap;

pub mod models;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::{
    ApprovalCreateResponse, ApprovalFetchResponse, ApprovalRequest, ContentCreateRequest,
    ContentResource, CreateMessage, MessageResource,
};

pub const DEFAULT_API_BASE_URL: &str = "https://api.twilio.com";
pub const DEFAULT_CONTENT_BASE_URL: &str = "https://content.twilio.com";

#[derive(Debug, Error)]
pub enum TwilioError {
    #[error("twilio returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("request to twilio failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to parse twilio response: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, TwilioError>;

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    pub api_base_url: String,
    pub content_base_url: String,
}

impl TwilioOptions {
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            content_base_url: DEFAULT_CONTENT_BASE_URL.to_string(),
        }
    }

    /// Point both APIs at one host (mock servers in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.api_base_url = base_url.clone();
        self.content_base_url = base_url;
        self
    }
}

#[derive(Debug, Clone)]
pub struct TwilioService {
    options: TwilioOptions,
    client: Client,
}

impl TwilioService {
    pub fn new(options: TwilioOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    pub fn account_sid(&self) -> &str {
        &self.options.account_sid
    }

    /// Submit template content; the returned `sid` is the external id.
    pub async fn create_content(&self, request: &ContentCreateRequest) -> Result<ContentResource> {
        let url = format!("{}/v1/Content", self.options.content_base_url);

        let response = self
            .client
            .post(url)
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .json(request)
            .send()
            .await?;

        read_json(response).await
    }

    pub async fn delete_content(&self, content_sid: &str) -> Result<()> {
        let url = format!(
            "{}/v1/Content/{sid}",
            self.options.content_base_url,
            sid = content_sid
        );

        let response = self
            .client
            .delete(url)
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, content_sid, "Twilio content delete failed");
            return Err(TwilioError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Ask WhatsApp to review the content. The response status is usually
    /// `received`.
    pub async fn create_whatsapp_approval(
        &self,
        content_sid: &str,
        request: &ApprovalRequest,
    ) -> Result<ApprovalCreateResponse> {
        let url = format!(
            "{}/v1/Content/{sid}/ApprovalRequests/whatsapp",
            self.options.content_base_url,
            sid = content_sid
        );

        let response = self
            .client
            .post(url)
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .json(request)
            .send()
            .await?;

        read_json(response).await
    }

    pub async fn fetch_approval(&self, content_sid: &str) -> Result<ApprovalFetchResponse> {
        let url = format!(
            "{}/v1/Content/{sid}/ApprovalRequests",
            self.options.content_base_url,
            sid = content_sid
        );

        let response = self
            .client
            .get(url)
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .send()
            .await?;

        read_json(response).await
    }

    pub async fn send_message(&self, message: &CreateMessage) -> Result<MessageResource> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.options.api_base_url, self.options.account_sid
        );

        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", &message.to);
        form_body.insert("From", &message.from);
        form_body.insert("MessagingServiceSid", &message.messaging_service_sid);
        form_body.insert("ContentSid", &message.content_sid);
        form_body.insert("ContentVariables", &message.content_variables);

        let response = self
            .client
            .post(url)
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .form(&form_body)
            .send()
            .await?;

        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::warn!(status = %status, "Twilio returned an error");
        return Err(TwilioError::Api {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| TwilioError::Decode(e.to_string()))
}
