//! control_message tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ToolError;
use crate::worker::{EventOutcome, Worker, WorkerEvent};

/// Input parameters for the control_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ControlMessageParams {
    /// Message object, e.g. `{"type": "FLUSH_API_ONLY"}`.
    pub message: serde_json::Value,
}

/// Always answers with a reply object; protocol errors are reported in it.
pub async fn control_impl(worker: &Worker, params: ControlMessageParams) -> Result<CallToolResult, McpError> {
    match worker.dispatch(WorkerEvent::Message(params.message)).await? {
        EventOutcome::Replied(reply) => json_result(&reply),
        other => Err(ToolError::UnexpectedOutcome(format!("message event produced {other:?}")).into()),
    }
}
