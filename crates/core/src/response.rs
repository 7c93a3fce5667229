//! Response snapshots and the fixed offline placeholders.

use std::collections::BTreeMap;

use bytes::Bytes;

const OFFLINE_DOCUMENT: &str = "<!DOCTYPE html>\
<html lang=\"en\"><head><meta charset=\"utf-8\"><title>Offline</title></head>\
<body><h1>You are offline</h1><p>This page is not available offline. Check your connection and try again.</p></body></html>";

/// A response snapshot: status, headers, body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, headers: BTreeMap<String, String>, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// A response with a single Content-Type header.
    pub fn with_content_type(status: u16, content_type: &str, body: impl Into<Bytes>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), content_type.to_string());
        Self::new(status, headers, body)
    }

    /// 2xx responses are the only ones ever written to a store.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    /// Fixed 503 used when a static asset is neither cached nor reachable.
    pub fn unavailable() -> Self {
        Self::with_content_type(503, "text/plain; charset=utf-8", "Service Unavailable")
    }

    /// Fixed offline page for navigations that fail end to end.
    pub fn offline_document() -> Self {
        Self::with_content_type(503, "text/html; charset=utf-8", OFFLINE_DOCUMENT)
    }

    /// Structured offline indicator for API requests.
    pub fn offline_json(message: &str) -> Self {
        let body = serde_json::json!({
            "success": false,
            "offline": true,
            "error": message,
        });
        Self::with_content_type(503, "application/json", body.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_success() {
        assert!(Response::with_content_type(200, "text/plain", "ok").is_success());
        assert!(Response::with_content_type(204, "text/plain", "").is_success());
        assert!(!Response::with_content_type(304, "text/plain", "").is_success());
        assert!(!Response::unavailable().is_success());
    }

    #[test]
    fn test_offline_json_shape() {
        let resp = Response::offline_json("network unreachable");
        assert_eq!(resp.status, 503);
        assert_eq!(resp.content_type(), Some("application/json"));

        let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["offline"], true);
        assert_eq!(body["error"], "network unreachable");
    }

    #[test]
    fn test_offline_document_is_html() {
        let resp = Response::offline_document();
        assert_eq!(resp.status, 503);
        assert!(resp.content_type().unwrap().starts_with("text/html"));
        assert!(!resp.body.is_empty());
    }
}
