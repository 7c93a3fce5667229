//! client_connect and client_messages tool implementations.
//!
//! A connected client's inbox is held by the server until drained.

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::error::TryRecvError;

use super::json_result;
use crate::error::ToolError;
use crate::worker::{ClientId, ClientInfo, Worker, WorkerMessage};

/// Undelivered worker messages, per client.
pub type Inboxes = Arc<Mutex<HashMap<ClientId, UnboundedReceiver<WorkerMessage>>>>;

/// Input parameters for the client_connect tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientConnectParams {
    /// URL of the page, absolute or relative to the origin.
    pub url: String,
}

/// Input parameters for the client_messages tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientMessagesParams {
    pub client_id: ClientId,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientConnectOutput {
    pub client_id: ClientId,
    pub clients: Vec<ClientInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientMessagesOutput {
    pub client_id: ClientId,
    pub messages: Vec<WorkerMessage>,
}

pub async fn connect_impl(
    worker: &Worker, inboxes: &Inboxes, params: ClientConnectParams,
) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url must not be empty".into()).into());
    }

    let (client_id, receiver) = worker.connect_client(&params.url).await?;
    inboxes.lock().await.insert(client_id, receiver);

    let output = ClientConnectOutput { client_id, clients: worker.clients().list().await };
    json_result(&output)
}

/// Drain every message posted to a client since the last call.
pub async fn messages_impl(inboxes: &Inboxes, params: ClientMessagesParams) -> Result<CallToolResult, McpError> {
    let mut inboxes = inboxes.lock().await;
    let receiver = inboxes.get_mut(&params.client_id).ok_or(ToolError::UnknownClient(params.client_id))?;

    let mut messages = Vec::new();
    let mut closed = false;
    loop {
        match receiver.try_recv() {
            Ok(message) => messages.push(message),
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                closed = true;
                break;
            }
        }
    }

    if closed {
        inboxes.remove(&params.client_id);
    }

    json_result(&ClientMessagesOutput { client_id: params.client_id, messages })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use rmcp::model::ErrorCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_connect_and_drain_activation_message() {
        let (worker, _network) = worker().await;
        let inboxes = Inboxes::default();

        let connected = json(
            &connect_impl(&worker, &inboxes, ClientConnectParams { url: "/courses".into() }).await.unwrap(),
        );
        let client_id = connected["client_id"].as_u64().unwrap();
        assert_eq!(connected["clients"][0]["url"], "http://localhost:3000/courses");

        worker.start().await.unwrap();

        let drained = json(&messages_impl(&inboxes, ClientMessagesParams { client_id }).await.unwrap());
        assert_eq!(drained["messages"], json!([{"type": "UPDATE_ACTIVATED", "version": "1"}]));

        let again = json(&messages_impl(&inboxes, ClientMessagesParams { client_id }).await.unwrap());
        assert_eq!(again["messages"], json!([]));
    }

    #[tokio::test]
    async fn test_unknown_client() {
        let inboxes = Inboxes::default();
        let err = messages_impl(&inboxes, ClientMessagesParams { client_id: 42 }).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32030));
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_url() {
        let (worker, _network) = worker().await;
        let inboxes = Inboxes::default();
        let result = connect_impl(&worker, &inboxes, ClientConnectParams { url: " ".into() }).await;
        assert!(result.is_err());
    }
}
