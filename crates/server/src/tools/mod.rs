//! MCP tool implementations.
//!
//! Each tool is a thin adapter from JSON parameters to one worker event,
//! returning pretty-printed JSON text.

pub mod clients;
pub mod control;
pub mod fetch;
pub mod lifecycle;
pub mod notify;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

pub use clients::{ClientConnectParams, ClientMessagesParams, Inboxes};
pub use control::ControlMessageParams;
pub use fetch::FetchParams;
pub use lifecycle::{ActivateParams, InstallParams};
pub use notify::{NotificationClickParams, PushParams};

pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::Encode(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use rmcp::model::CallToolResult;
    use stash_client::testing::FakeNetwork;
    use stash_core::{AppConfig, CacheDb};

    use crate::worker::Worker;

    pub async fn worker() -> (Arc<Worker>, Arc<FakeNetwork>) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = Arc::new(FakeNetwork::new("http://localhost:3000"));
        for path in ["/", "/index.html"] {
            network.route_text(path, "text/html", "<html>home</html>");
        }
        let config = AppConfig {
            version: "1".into(),
            critical_resources: vec!["/".into(), "/index.html".into()],
            background_resources: Vec::new(),
            ..Default::default()
        };
        let worker = Worker::new(config, db, network.clone()).unwrap();
        (Arc::new(worker), network)
    }

    /// Parse the JSON text of a successful tool result.
    pub fn json(result: &CallToolResult) -> serde_json::Value {
        let content = serde_json::to_value(&result.content[0]).unwrap();
        let text = content.get("text").and_then(|v| v.as_str()).expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
