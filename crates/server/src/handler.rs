//! MCP server handler implementation.
//!
//! Each tool delivers one host event to the shared [`Worker`].

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::tools::{
    ActivateParams, ClientConnectParams, ClientMessagesParams, ControlMessageParams, FetchParams, InstallParams,
    Inboxes, NotificationClickParams, PushParams, clients, control, fetch, lifecycle, notify,
};
use crate::worker::Worker;

#[derive(Clone)]
pub struct StashServer {
    tool_router: ToolRouter<Self>,
    worker: Arc<Worker>,
    inboxes: Inboxes,
}

#[tool_router]
impl StashServer {
    pub fn new(worker: Arc<Worker>) -> Self {
        Self { tool_router: Self::tool_router(), worker, inboxes: Inboxes::default() }
    }

    #[tool(
        description = "Intercept a request. Classifies it, applies the caching strategy for its class once the worker is active, and returns the response with its source."
    )]
    async fn fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        fetch::fetch_impl(&self.worker, params.0).await
    }

    #[tool(
        description = "Send a control message to the worker: FORCE_ACTIVATE, FLUSH_ALL, FLUSH_API_ONLY, QUERY_VERSION, or QUERY_STATS. Always returns a reply object."
    )]
    async fn control_message(&self, params: Parameters<ControlMessageParams>) -> Result<CallToolResult, McpError> {
        control::control_impl(&self.worker, params.0).await
    }

    #[tool(description = "Install the worker version: pre-warm critical resources and start background warming.")]
    async fn install(&self, params: Parameters<InstallParams>) -> Result<CallToolResult, McpError> {
        lifecycle::install_impl(&self.worker, params.0).await
    }

    #[tool(description = "Activate an installed worker: delete other versions' stores and claim connected clients.")]
    async fn activate(&self, params: Parameters<ActivateParams>) -> Result<CallToolResult, McpError> {
        lifecycle::activate_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push payload and return the notification to display.")]
    async fn push(&self, params: Parameters<PushParams>) -> Result<CallToolResult, McpError> {
        notify::push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Route a notification click: dismiss, focus an open page, or open a new one.")]
    async fn notification_click(
        &self, params: Parameters<NotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notify::click_impl(&self.worker, params.0).await
    }

    #[tool(description = "Connect a page client so it receives UPDATE_AVAILABLE and UPDATE_ACTIVATED messages.")]
    async fn client_connect(&self, params: Parameters<ClientConnectParams>) -> Result<CallToolResult, McpError> {
        clients::connect_impl(&self.worker, &self.inboxes, params.0).await
    }

    #[tool(description = "Drain the messages the worker has posted to a connected client.")]
    async fn client_messages(&self, params: Parameters<ClientMessagesParams>) -> Result<CallToolResult, McpError> {
        clients::messages_impl(&self.inboxes, params.0).await
    }
}

impl ServerHandler for StashServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "stash-worker".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
