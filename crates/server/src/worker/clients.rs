//! Connected page clients.
//!
//! Each client gets an unbounded channel of [`WorkerMessage`]s. A client
//! whose receiver was dropped is pruned on the next post.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::control::WorkerMessage;

pub type ClientId = u64;

/// Snapshot of one connected client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClientInfo {
    pub id: ClientId,
    pub url: String,
    /// Version of the worker controlling this client, once claimed.
    pub controller: Option<String>,
}

struct Entry {
    url: String,
    controller: Option<String>,
    sender: UnboundedSender<WorkerMessage>,
}

#[derive(Default)]
pub struct Clients {
    next_id: AtomicU64,
    inner: RwLock<HashMap<ClientId, Entry>>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page at `url`; the receiver yields every message posted to it.
    pub async fn connect(&self, url: String) -> (ClientId, UnboundedReceiver<WorkerMessage>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner.write().await.insert(id, Entry { url, controller: None, sender });
        tracing::debug!(client_id = id, "client connected");
        (id, receiver)
    }

    /// Take control of every connected client. Returns how many were claimed.
    pub async fn claim(&self, version: &str) -> usize {
        let mut inner = self.inner.write().await;
        for entry in inner.values_mut() {
            entry.controller = Some(version.to_string());
        }
        inner.len()
    }

    /// Post `message` to every client. Returns the number reached.
    pub async fn broadcast(&self, message: WorkerMessage) -> usize {
        let mut inner = self.inner.write().await;
        inner.retain(|id, entry| {
            let delivered = entry.sender.send(message.clone()).is_ok();
            if !delivered {
                tracing::debug!(client_id = *id, "pruning disconnected client");
            }
            delivered
        });
        inner.len()
    }

    /// Post `message` to one client. Returns whether it was delivered.
    pub async fn post(&self, id: ClientId, message: WorkerMessage) -> bool {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.get(&id) else { return false };
        if entry.sender.send(message).is_ok() {
            return true;
        }
        tracing::debug!(client_id = id, "pruning disconnected client");
        inner.remove(&id);
        false
    }

    /// First client whose URL equals `url`.
    pub async fn find_by_url(&self, url: &str) -> Option<ClientId> {
        let inner = self.inner.read().await;
        let mut matches: Vec<ClientId> =
            inner.iter().filter(|(_, entry)| entry.url == url).map(|(id, _)| *id).collect();
        matches.sort_unstable();
        matches.first().copied()
    }

    pub async fn list(&self) -> Vec<ClientInfo> {
        let inner = self.inner.read().await;
        let mut clients: Vec<ClientInfo> = inner
            .iter()
            .map(|(id, entry)| ClientInfo { id: *id, url: entry.url.clone(), controller: entry.controller.clone() })
            .collect();
        clients.sort_by_key(|c| c.id);
        clients
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activated(version: &str) -> WorkerMessage {
        WorkerMessage::UpdateActivated { version: version.into() }
    }

    #[tokio::test]
    async fn test_connect_assigns_distinct_ids() {
        let clients = Clients::new();
        let (a, _ra) = clients.connect("http://localhost:3000/".into()).await;
        let (b, _rb) = clients.connect("http://localhost:3000/courses".into()).await;
        assert_ne!(a, b);
        assert_eq!(clients.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_and_prunes_dropped() {
        let clients = Clients::new();
        let (_a, mut ra) = clients.connect("http://localhost:3000/".into()).await;
        let (_b, rb) = clients.connect("http://localhost:3000/about".into()).await;
        drop(rb);

        assert_eq!(clients.broadcast(activated("2")).await, 1);
        assert_eq!(ra.recv().await, Some(activated("2")));
        assert_eq!(clients.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_claim_sets_controller() {
        let clients = Clients::new();
        let (id, _rx) = clients.connect("http://localhost:3000/".into()).await;
        assert_eq!(clients.claim("3").await, 1);

        let info = clients.list().await;
        assert_eq!(info[0].id, id);
        assert_eq!(info[0].controller.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_find_by_url() {
        let clients = Clients::new();
        let (first, _r1) = clients.connect("http://localhost:3000/signals".into()).await;
        let (_second, _r2) = clients.connect("http://localhost:3000/signals".into()).await;

        assert_eq!(clients.find_by_url("http://localhost:3000/signals").await, Some(first));
        assert_eq!(clients.find_by_url("http://localhost:3000/other").await, None);
    }

    #[tokio::test]
    async fn test_post_to_one_client() {
        let clients = Clients::new();
        let (a, mut ra) = clients.connect("http://localhost:3000/".into()).await;
        let (b, rb) = clients.connect("http://localhost:3000/about".into()).await;

        assert!(clients.post(a, activated("4")).await);
        assert_eq!(ra.recv().await, Some(activated("4")));

        drop(rb);
        assert!(!clients.post(b, activated("4")).await);
        assert!(!clients.post(99, activated("4")).await);
        assert_eq!(clients.list().await.len(), 1);
    }
}
