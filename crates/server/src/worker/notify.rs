//! Push notifications and click routing.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stash_core::Error;

use super::Worker;
use super::clients::ClientId;

const DEFAULT_TITLE: &str = "New update";
const DEFAULT_BODY: &str = "You have a new notification";
const DEFAULT_ICON: &str = "/logo192.png";
const DEFAULT_URL: &str = "/";

#[derive(Debug, Default, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    icon: Option<String>,
    url: Option<String>,
    tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// A notification ready for the host to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Page to open when the notification is clicked.
    pub url: String,
    pub actions: Vec<NotificationAction>,
}

/// Where a notification click leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "route", rename_all = "kebab-case")]
pub enum ClickRoute {
    /// The dismiss action was chosen; nothing opens.
    Dismissed,
    /// An open page already shows the target.
    Focus { client_id: ClientId, url: String },
    /// No page shows the target; open a new one.
    Open { url: String },
}

/// Shape a push payload into a notification.
///
/// The payload is JSON when possible. Plain text becomes the body, and
/// missing fields take defaults.
pub fn build_notification(payload: Option<&str>) -> Notification {
    let payload = match payload.map(str::trim).filter(|p| !p.is_empty()) {
        None => PushPayload::default(),
        Some(raw) => serde_json::from_str::<PushPayload>(raw).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "push payload is not JSON, using it as the body");
            PushPayload { body: Some(raw.to_string()), ..Default::default() }
        }),
    };

    let icon = payload.icon.unwrap_or_else(|| DEFAULT_ICON.to_string());
    Notification {
        title: payload.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        body: payload.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
        badge: icon.clone(),
        icon,
        tag: payload.tag,
        url: payload.url.unwrap_or_else(|| DEFAULT_URL.to_string()),
        actions: vec![
            NotificationAction { action: "open".into(), title: "Open".into() },
            NotificationAction { action: "dismiss".into(), title: "Dismiss".into() },
        ],
    }
}

impl Worker {
    /// Route a click on a notification targeting `url`.
    pub async fn notification_click(&self, url: &str, action: Option<&str>) -> Result<ClickRoute, Error> {
        if action == Some("dismiss") {
            return Ok(ClickRoute::Dismissed);
        }

        let target = self
            .origin
            .join(url.trim())
            .map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?
            .to_string();

        let route = match self.clients.find_by_url(&target).await {
            Some(client_id) => ClickRoute::Focus { client_id, url: target },
            None => ClickRoute::Open { url: target },
        };

        tracing::debug!(route = ?route, "notification click");
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_defaults_without_payload() {
        let n = build_notification(None);
        assert_eq!(n.title, DEFAULT_TITLE);
        assert_eq!(n.body, DEFAULT_BODY);
        assert_eq!(n.icon, "/logo192.png");
        assert_eq!(n.url, "/");
        assert_eq!(n.actions.len(), 2);
        assert_eq!(n.actions[0].action, "open");
        assert_eq!(n.actions[1].action, "dismiss");
    }

    #[test]
    fn test_json_payload_fields() {
        let n = build_notification(Some(r#"{"title":"EURUSD","body":"New signal","url":"/signals"}"#));
        assert_eq!(n.title, "EURUSD");
        assert_eq!(n.body, "New signal");
        assert_eq!(n.url, "/signals");
        assert_eq!(n.icon, DEFAULT_ICON);
    }

    #[test]
    fn test_text_payload_becomes_body() {
        let n = build_notification(Some("Market opens in 5 minutes"));
        assert_eq!(n.title, DEFAULT_TITLE);
        assert_eq!(n.body, "Market opens in 5 minutes");
    }

    #[tokio::test]
    async fn test_click_dismiss() {
        let (worker, _network, _db) = worker("1").await;
        let route = worker.notification_click("/signals", Some("dismiss")).await.unwrap();
        assert_eq!(route, ClickRoute::Dismissed);
    }

    #[tokio::test]
    async fn test_click_focuses_open_page() {
        let (worker, _network, _db) = worker("1").await;
        let (id, _rx) = worker.clients().connect("http://localhost:3000/signals".into()).await;

        let route = worker.notification_click("/signals", Some("open")).await.unwrap();
        assert_eq!(route, ClickRoute::Focus { client_id: id, url: "http://localhost:3000/signals".into() });
    }

    #[tokio::test]
    async fn test_click_opens_new_page() {
        let (worker, _network, _db) = worker("1").await;
        let route = worker.notification_click("/courses", None).await.unwrap();
        assert_eq!(route, ClickRoute::Open { url: "http://localhost:3000/courses".into() });
    }
}
