//! install and activate tool implementations.
//!
//! Let a host drive the lifecycle by hand instead of relying on startup.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ToolError;
use crate::worker::{ActivateReport, EventOutcome, Phase, Worker, WorkerEvent};

/// Input parameters for the install tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct InstallParams {
    /// Wait for background warming to finish before answering.
    #[serde(default)]
    pub wait_for_background: bool,
}

/// Input parameters for the activate tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ActivateParams {}

/// Output structure for the install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallOutput {
    pub version: String,
    pub phase: Phase,
    pub precached: Vec<String>,
    /// An older version still owns stores; activation waits for FORCE_ACTIVATE.
    pub update_available: bool,
    pub activated: Option<ActivateReport>,
    /// Background resources stored, when waited for.
    pub background_stored: Option<usize>,
}

pub async fn install_impl(worker: &Worker, params: InstallParams) -> Result<CallToolResult, McpError> {
    let EventOutcome::Installed(report) = worker.dispatch(WorkerEvent::Install).await? else {
        return Err(ToolError::UnexpectedOutcome("install event produced another outcome".into()).into());
    };

    let background_stored = if params.wait_for_background { report.background.await.ok() } else { None };

    let output = InstallOutput {
        version: report.version,
        phase: worker.phase().await,
        precached: report.precached,
        update_available: report.update_available,
        activated: report.activated,
        background_stored,
    };

    json_result(&output)
}

pub async fn activate_impl(worker: &Worker, _params: ActivateParams) -> Result<CallToolResult, McpError> {
    let EventOutcome::Activated(report) = worker.dispatch(WorkerEvent::Activate).await? else {
        return Err(ToolError::UnexpectedOutcome("activate event produced another outcome".into()).into());
    };
    json_result(&report)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use rmcp::model::ErrorCode;

    #[tokio::test]
    async fn test_install_then_activate() {
        let (worker, _network) = worker().await;

        let installed = json(&install_impl(&worker, InstallParams { wait_for_background: true }).await.unwrap());
        assert_eq!(installed["phase"], "installed");
        assert_eq!(installed["precached"], serde_json::json!(["/", "/index.html"]));
        assert_eq!(installed["background_stored"], 0);

        let activated = json(&activate_impl(&worker, ActivateParams {}).await.unwrap());
        assert_eq!(activated["version"], "1");
        assert_eq!(worker.phase().await, Phase::Activated);
    }

    #[tokio::test]
    async fn test_install_failure_code() {
        let (worker, network) = worker().await;
        network.set_online(false);

        let err = install_impl(&worker, InstallParams::default()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32020));
    }

    #[tokio::test]
    async fn test_activate_before_install_is_invalid_state() {
        let (worker, _network) = worker().await;
        let err = activate_impl(&worker, ActivateParams {}).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32021));
    }
}
