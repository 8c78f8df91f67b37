//! Bulk message dispatch.
//!
//! One outbound provider call per job, spread over the dispatch pool. Every
//! job yields exactly one [`DispatchResult`]; a failure for one recipient
//! (bad number, bad variables, provider error) never aborts the others and
//! nothing is retried.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::common::WorkerPool;
use crate::domains::contacts::normalize_e164;
use crate::domains::messaging::data::DispatchResult;
use crate::domains::templates::models::Platform;
use crate::kernel::{BaseMessagingClient, OutboundMessage};

/// Everything shared by the jobs of one batch
pub struct DispatchPlan {
    pub client: Arc<dyn BaseMessagingClient>,
    pub platform: Platform,
    /// Sending number in E.164
    pub from: String,
    pub messaging_service_sid: String,
    /// Provider content id of the template
    pub content_sid: String,
}

#[derive(Debug, Clone)]
pub struct DispatchJob {
    pub phone_number: String,
    pub variables: serde_json::Value,
}

/// Send every job and return one result per job, in job order.
pub async fn dispatch(
    pool: &WorkerPool,
    plan: DispatchPlan,
    jobs: Vec<DispatchJob>,
) -> Result<Vec<DispatchResult>> {
    debug!(jobs = jobs.len(), platform = %plan.platform, "Dispatching batch");
    let plan = Arc::new(plan);
    pool.run(jobs, move |job| {
        let plan = plan.clone();
        async move { send_one(&plan, job).await }
    })
    .await
}

async fn send_one(plan: &DispatchPlan, job: DispatchJob) -> DispatchResult {
    let to = match normalize_e164(&job.phone_number) {
        Ok(number) => number,
        Err(e) => return DispatchResult::fail(job.phone_number, e),
    };

    let content_variables = match encode_variables(&job.variables) {
        Ok(encoded) => encoded,
        Err(e) => return DispatchResult::fail(job.phone_number, e),
    };

    let message = OutboundMessage {
        to: address(plan.platform, &to),
        from: address(plan.platform, &plan.from),
        messaging_service_sid: plan.messaging_service_sid.clone(),
        content_sid: plan.content_sid.clone(),
        content_variables,
    };

    match plan.client.send_message(&message).await {
        Ok(sid) => {
            debug!(message_sid = %sid, "Message accepted");
            DispatchResult::success(job.phone_number)
        }
        Err(e) => {
            warn!(error = %e, "Message send failed");
            DispatchResult::fail(job.phone_number, e)
        }
    }
}

/// Provider address for a number on the given channel
pub fn address(platform: Platform, e164: &str) -> String {
    match platform {
        Platform::WhatsApp => format!("whatsapp:{}", e164),
        Platform::Sms | Platform::Email => e164.to_string(),
    }
}

/// Variables travel as a JSON object encoded in a string. Absent variables
/// become `{}`.
fn encode_variables(variables: &serde_json::Value) -> Result<String, String> {
    match variables {
        serde_json::Value::Null => Ok("{}".to_string()),
        serde_json::Value::Object(_) => Ok(variables.to_string()),
        other => Err(format!(
            "template variables must be a JSON object, got {}",
            json_kind(other)
        )),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
