//! fetch tool implementation.
//!
//! Delivers one intercepted request to the worker and reports how it was
//! answered.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stash_client::Source;
use stash_core::ResourceClass;

use super::json_result;
use crate::error::ToolError;
use crate::worker::{EventOutcome, Worker, WorkerEvent};

/// Input parameters for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchOutput {
    pub url: String,
    pub method: String,
    /// Resource class the request was sorted into.
    pub class: ResourceClass,
    /// Whether the request went through the caching strategy.
    pub controlled: bool,
    /// Where the response came from.
    pub source: Source,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub body_bytes: usize,
    /// A background refresh of the stored entry was started.
    pub revalidating: bool,
}

pub async fn fetch_impl(worker: &Worker, params: FetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url must not be empty".into()).into());
    }

    let event = WorkerEvent::Fetch { method: params.method, url: params.url };
    let EventOutcome::Fetched(outcome) = worker.dispatch(event).await? else {
        return Err(ToolError::UnexpectedOutcome("fetch event produced no response".into()).into());
    };

    let response = &outcome.served.response;
    let output = FetchOutput {
        url: outcome.request.url().to_string(),
        method: outcome.request.method().to_string(),
        class: outcome.class,
        controlled: outcome.controlled,
        source: outcome.served.source,
        status: response.status,
        headers: response.headers.clone(),
        body: String::from_utf8_lossy(&response.body).into_owned(),
        body_bytes: response.body.len(),
        revalidating: outcome.served.revalidation.is_some(),
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn get(url: &str) -> FetchParams {
        FetchParams { url: url.into(), method: default_method() }
    }

    #[tokio::test]
    async fn test_fetch_uncontrolled_before_start() {
        let (worker, _network) = worker().await;
        let result = fetch_impl(&worker, get("/")).await.unwrap();

        let json = json(&result);
        assert_eq!(json["controlled"], false);
        assert_eq!(json["class"], "navigation-document");
        assert_eq!(json["status"], 200);
    }

    #[tokio::test]
    async fn test_fetch_offline_api_placeholder() {
        let (worker, network) = worker().await;
        worker.start().await.unwrap();
        network.set_online(false);

        let result = fetch_impl(&worker, get("/api/market-status")).await.unwrap();
        let json = json(&result);
        assert_eq!(json["class"], "status-api");
        assert_eq!(json["source"], "placeholder");
        assert_eq!(json["status"], 503);

        let body: serde_json::Value = serde_json::from_str(json["body"].as_str().unwrap()).unwrap();
        assert_eq!(body["offline"], true);
    }

    #[tokio::test]
    async fn test_fetch_empty_url_rejected() {
        let (worker, _network) = worker().await;
        assert!(fetch_impl(&worker, get("  ")).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_bad_scheme_rejected() {
        let (worker, _network) = worker().await;
        assert!(fetch_impl(&worker, get("ftp://example.com/x")).await.is_err());
    }
}
