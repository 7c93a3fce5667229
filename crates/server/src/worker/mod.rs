//! The worker runtime.
//!
//! Owns the lifecycle state machine, routes intercepted requests through the
//! strategy engine, answers control messages, and shapes notifications.
//! Every host event enters through [`Worker::dispatch`].

pub mod clients;
pub mod control;
pub mod lifecycle;
pub mod notify;

use std::sync::Arc;

use serde_json::Value;
use stash_client::{Network, Served, StrategyEngine};
use stash_core::{AppConfig, CacheDb, Classifier, Error, Request, ResourceClass};
use tokio::sync::Mutex;
use url::Url;

pub use clients::{ClientId, ClientInfo, Clients};
pub use control::{ControlReply, WorkerMessage};
pub use lifecycle::{ActivateReport, InstallReport, Phase};
pub use notify::{ClickRoute, Notification};

/// An event delivered by the host.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch { method: String, url: String },
    Message(Value),
    Push(Option<String>),
    NotificationClick { url: String, action: Option<String> },
}

/// What the worker did with an event.
#[derive(Debug)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetched(FetchOutcome),
    Replied(ControlReply),
    Notify(Notification),
    Routed(ClickRoute),
}

/// Result of an intercepted request.
#[derive(Debug)]
pub struct FetchOutcome {
    pub request: Request,
    pub class: ResourceClass,
    /// Whether the strategy engine handled it (only once activated).
    pub controlled: bool,
    pub served: Served,
}

pub(crate) struct LifecycleState {
    pub(crate) phase: Phase,
    pub(crate) activate_after_install: bool,
    /// Installed while an older version's stores exist.
    pub(crate) update_available: bool,
}

pub struct Worker {
    config: AppConfig,
    origin: Url,
    db: CacheDb,
    classifier: Classifier,
    engine: StrategyEngine,
    clients: Clients,
    state: Mutex<LifecycleState>,
}

impl Worker {
    pub fn new(config: AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let classifier = Classifier::new(&config, origin.clone());
        let engine = StrategyEngine::new(db.clone(), network, &config);

        Ok(Self {
            config,
            origin,
            db,
            classifier,
            engine,
            clients: Clients::new(),
            state: Mutex::new(LifecycleState {
                phase: Phase::Idle,
                activate_after_install: false,
                update_available: false,
            }),
        })
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    /// Register a page; `url` is resolved against the origin.
    ///
    /// A page that connects while an installed update waits for activation
    /// is sent `UPDATE_AVAILABLE` straight away.
    pub async fn connect_client(
        &self, url: &str,
    ) -> Result<(ClientId, tokio::sync::mpsc::UnboundedReceiver<WorkerMessage>), Error> {
        let resolved = self.origin.join(url.trim()).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;

        let state = self.state.lock().await;
        let (id, receiver) = self.clients.connect(resolved.to_string()).await;
        if state.phase == Phase::Installed && state.update_available {
            let message = WorkerMessage::UpdateAvailable { version: self.config.version.clone() };
            self.clients.post(id, message).await;
        }

        Ok((id, receiver))
    }

    /// Handle one host event.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome, Error> {
        match event {
            WorkerEvent::Install => self.install().await.map(EventOutcome::Installed),
            WorkerEvent::Activate => self.activate().await.map(EventOutcome::Activated),
            WorkerEvent::Fetch { method, url } => self.handle_fetch(&method, &url).await.map(EventOutcome::Fetched),
            WorkerEvent::Message(payload) => Ok(EventOutcome::Replied(self.handle_message(&payload).await)),
            WorkerEvent::Push(payload) => Ok(EventOutcome::Notify(notify::build_notification(payload.as_deref()))),
            WorkerEvent::NotificationClick { url, action } => {
                self.notification_click(&url, action.as_deref()).await.map(EventOutcome::Routed)
            }
        }
    }

    /// Intercept one request.
    ///
    /// Before activation the worker does not control pages, so requests go
    /// straight to the network with no store access.
    pub async fn handle_fetch(&self, method: &str, url: &str) -> Result<FetchOutcome, Error> {
        let request = Request::new(method, url, &self.origin)?;
        let class = self.classifier.classify(request.url(), request.method());

        if self.phase().await != Phase::Activated {
            let served = self.engine.pass_through(&request).await;
            return Ok(FetchOutcome { request, class, controlled: false, served });
        }

        let served = self.engine.respond(class, &request).await;
        Ok(FetchOutcome { request, class, controlled: true, served })
    }

    /// Install, then activate unless an older version still serves clients.
    pub async fn start(&self) -> Result<InstallReport, Error> {
        let report = self.install().await?;
        if report.activated.is_none() && !report.update_available {
            self.activate().await?;
        }
        Ok(report)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde_json::json;
    use stash_client::Source;

    #[tokio::test]
    async fn test_invalid_origin_rejected() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        let result = Worker::new(config, db, network());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_fetch_before_activation_bypasses_stores() {
        let (worker, network, db) = worker("1").await;
        network.route_text("/static/app.js", "application/javascript", "ok");

        let outcome = worker.handle_fetch("GET", "/static/app.js").await.unwrap();
        assert!(!outcome.controlled);
        assert_eq!(outcome.class, ResourceClass::StaticAsset);
        assert_eq!(outcome.served.response.status, 200);
        assert!(db.list_stores().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_after_start_uses_strategy() {
        let (worker, network, _db) = worker("1").await;
        worker.start().await.unwrap();
        assert_eq!(worker.phase().await, Phase::Activated);

        let first = worker.handle_fetch("GET", "/index.html").await.unwrap();
        assert!(first.controlled);
        assert_eq!(first.class, ResourceClass::NavigationDocument);
        assert_eq!(first.served.source, Source::Network);

        network.set_online(false);
        let offline = worker.handle_fetch("GET", "/manifest.json").await.unwrap();
        assert_eq!(offline.served.source, Source::Cache);
        assert_eq!(offline.served.response.status, 200);
    }

    #[tokio::test]
    async fn test_fetch_rejects_bad_url() {
        let (worker, _network, _db) = worker("1").await;
        let result = worker.handle_fetch("GET", "ftp://example.com/file").await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_dispatch_routes_events() {
        let (worker, _network, _db) = worker("1").await;

        let installed = worker.dispatch(WorkerEvent::Install).await.unwrap();
        assert!(matches!(installed, EventOutcome::Installed(_)));

        let activated = worker.dispatch(WorkerEvent::Activate).await.unwrap();
        assert!(matches!(activated, EventOutcome::Activated(_)));

        let replied = worker.dispatch(WorkerEvent::Message(json!({"type": "QUERY_VERSION"}))).await.unwrap();
        let EventOutcome::Replied(reply) = replied else { panic!("expected reply") };
        assert_eq!(reply.version.as_deref(), Some("1"));

        let notify = worker.dispatch(WorkerEvent::Push(None)).await.unwrap();
        let EventOutcome::Notify(notification) = notify else { panic!("expected notification") };
        assert_eq!(notification.url, "/");

        let routed = worker
            .dispatch(WorkerEvent::NotificationClick { url: "/".into(), action: Some("dismiss".into()) })
            .await
            .unwrap();
        assert!(matches!(routed, EventOutcome::Routed(ClickRoute::Dismissed)));
    }
}
