//! push and notification_click tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ToolError;
use crate::worker::{EventOutcome, Worker, WorkerEvent};

/// Input parameters for the push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PushParams {
    /// Raw push payload: a JSON object with title/body/url/icon/tag, or plain text.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Input parameters for the notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// Target URL carried by the notification.
    pub url: String,

    /// Chosen action ("open" or "dismiss"); absent for a body click.
    #[serde(default)]
    pub action: Option<String>,
}

pub async fn push_impl(worker: &Worker, params: PushParams) -> Result<CallToolResult, McpError> {
    match worker.dispatch(WorkerEvent::Push(params.payload)).await? {
        EventOutcome::Notify(notification) => json_result(&notification),
        other => Err(ToolError::UnexpectedOutcome(format!("push event produced {other:?}")).into()),
    }
}

pub async fn click_impl(worker: &Worker, params: NotificationClickParams) -> Result<CallToolResult, McpError> {
    let event = WorkerEvent::NotificationClick { url: params.url, action: params.action };
    match worker.dispatch(event).await? {
        EventOutcome::Routed(route) => json_result(&route),
        other => Err(ToolError::UnexpectedOutcome(format!("click event produced {other:?}")).into()),
    }
}
