//! Control channel between pages and the worker.
//!
//! Inbound messages are JSON objects tagged by `type`. Every inbound message
//! gets exactly one [`ControlReply`]; malformed or unknown messages get a
//! reply of type `ERROR` rather than a transport error.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stash_core::{Error, StoreStats};

use super::Worker;

/// A message a page sends to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    ForceActivate,
    FlushAll,
    FlushApiOnly,
    QueryVersion,
    QueryStats,
}

impl ControlMessage {
    pub fn reply_type(&self) -> &'static str {
        match self {
            ControlMessage::ForceActivate => "FORCE_ACTIVATE",
            ControlMessage::FlushAll => "FLUSH_ALL",
            ControlMessage::FlushApiOnly => "FLUSH_API_ONLY",
            ControlMessage::QueryVersion => "VERSION",
            ControlMessage::QueryStats => "STATS",
        }
    }
}

/// A message the worker pushes to pages unprompted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    UpdateAvailable { version: String },
    UpdateActivated { version: String },
}

/// The worker's answer to one control message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ControlReply {
    #[serde(rename = "type")]
    pub kind: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stores: Option<Vec<StoreStats>>,
}

impl ControlReply {
    fn ok(kind: &str, message: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            success: true,
            message: Some(message.into()),
            version: None,
            error: None,
            deleted: None,
            stores: None,
        }
    }

    fn failed(kind: &str, error: &Error) -> Self {
        Self {
            kind: kind.to_string(),
            success: false,
            message: None,
            version: None,
            error: Some(error.to_string()),
            deleted: None,
            stores: None,
        }
    }
}

/// Decode an inbound payload.
pub fn parse_message(payload: &Value) -> Result<ControlMessage, Error> {
    serde_json::from_value(payload.clone()).map_err(|e| Error::Protocol(format!("unrecognized control message: {e}")))
}

impl Worker {
    pub async fn handle_message(&self, payload: &Value) -> ControlReply {
        let message = match parse_message(payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "rejected control message");
                return ControlReply::failed("ERROR", &e);
            }
        };

        tracing::debug!(message = message.reply_type(), "control message");
        let kind = message.reply_type();

        match message {
            ControlMessage::ForceActivate => match self.force_activate().await {
                Ok(Some(report)) => ControlReply::ok(kind, format!("Activated version {}", report.version)),
                Ok(None) => ControlReply::ok(kind, format!("Version {} is active or activating", self.version())),
                Err(e) => ControlReply::failed(kind, &e),
            },
            ControlMessage::FlushAll => self.flush_reply(kind, self.db.delete_all_stores().await),
            ControlMessage::FlushApiOnly => {
                let marker = self.config.api_store_marker().to_string();
                let result = self.db.delete_stores_where(move |name| name.contains(marker.as_str())).await;
                self.flush_reply(kind, result)
            }
            ControlMessage::QueryVersion => {
                ControlReply { version: Some(self.version().to_string()), message: None, ..ControlReply::ok(kind, "") }
            }
            ControlMessage::QueryStats => match self.db.store_stats().await {
                Ok(stats) => ControlReply { stores: Some(stats), message: None, ..ControlReply::ok(kind, "") },
                Err(e) => ControlReply::failed(kind, &e),
            },
        }
    }

    fn flush_reply(&self, kind: &str, result: Result<Vec<String>, Error>) -> ControlReply {
        match result {
            Ok(deleted) => {
                tracing::info!(flush = kind, deleted = deleted.len(), "stores flushed");
                let message = format!("Deleted {} caches", deleted.len());
                ControlReply { deleted: Some(deleted), ..ControlReply::ok(kind, message) }
            }
            Err(e) => {
                tracing::warn!(flush = kind, error = %e, "flush failed");
                ControlReply::failed(kind, &e)
            }
        }
    }
}
