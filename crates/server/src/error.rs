//! Errors raised by the MCP tool layer itself.
//!
//! Worker errors carry their own codes through `stash_core::Error`.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid tool parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No connected client has this id.
    #[error("UNKNOWN_CLIENT: {0}")]
    UnknownClient(u64),

    /// The worker answered an event with the wrong kind of outcome.
    #[error("UNEXPECTED_OUTCOME: {0}")]
    UnexpectedOutcome(String),

    /// A tool output could not be encoded.
    #[error("ENCODE_FAILED: {0}")]
    Encode(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::InvalidInput(_) => -32602,
            ToolError::UnknownClient(_) => -32030,
            ToolError::UnexpectedOutcome(_) | ToolError::Encode(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_client_code() {
        let err: McpError = ToolError::UnknownClient(9).into();
        assert_eq!(err.code, ErrorCode(-32030));
        assert!(err.message.contains("UNKNOWN_CLIENT"));
    }

    #[test]
    fn test_invalid_input_code() {
        let err: McpError = ToolError::InvalidInput("empty url".into()).into();
        assert_eq!(err.code, ErrorCode(-32602));
    }
}
