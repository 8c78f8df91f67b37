use axum::extract::Extension;
use serde::Serialize;

use crate::common::{AppResult, ContactId};
use crate::domains::messaging::{
    send_to_group, send_to_recipients, DispatchReport, DispatchResult, SendMessagesInput,
    SendToListInput,
};
use crate::server::app::AppState;
use crate::server::extract::AppJson;
use crate::server::middleware::AuthUser;
use crate::server::response::Data;

/// Body of a processed batch. Per-recipient failures live in `list`.
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub message: &'static str,
    pub list: Vec<DispatchResult>,
    pub requested: usize,
    pub skipped: Vec<ContactId>,
}

impl From<DispatchReport> for BatchResponse {
    fn from(report: DispatchReport) -> Self {
        Self {
            message: "Messages processed",
            list: report.results,
            requested: report.requested,
            skipped: report.skipped,
        }
    }
}

pub async fn send_messages_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    AppJson(input): AppJson<SendMessagesInput>,
) -> AppResult<Data<BatchResponse>> {
    let report = send_to_recipients(user.actor(), input, &state.deps).await?;
    Ok(Data::new(report.into()))
}

pub async fn send_to_list_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    AppJson(input): AppJson<SendToListInput>,
) -> AppResult<Data<BatchResponse>> {
    let report = send_to_group(user.actor(), input, &state.deps).await?;
    Ok(Data::new(report.into()))
}
