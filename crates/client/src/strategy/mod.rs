//! Per-class response strategies.
//!
//! | Class                 | Strategy                                   |
//! |-----------------------|--------------------------------------------|
//! | `static-asset`        | cache-first into `static`                  |
//! | `navigation-document` | network-first, `dynamic` then root fallback|
//! | `cacheable-api`       | freshness-windowed cache in `api`          |
//! | `status-api`          | network-only, JSON offline fallback        |
//! | `auth-api`            | pass-through, no store access              |
//! | `volatile-api`        | stale-while-revalidate in `api`            |
//! | `other`               | network-first into `dynamic`               |
//!
//! Every strategy resolves to a response. Network failures become cached
//! or placeholder responses; store failures are logged and treated as a
//! miss (reads) or ignored (writes).

mod cache_first;
mod fresh_window;
mod network_first;
mod network_only;
mod stale_revalidate;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stash_core::{AppConfig, CacheDb, Envelope, Error, LogicalStore, Request, ResourceClass, Response};
use tokio::task::JoinHandle;

use crate::Network;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    /// Store hit, no network call.
    Cache,
    /// Network response (written back when cacheable).
    Network,
    /// Expired store entry served because the network failed.
    StaleCache,
    /// Store entry served because the network failed.
    Fallback,
    /// Synthesized offline response.
    Placeholder,
}

/// A strategy's answer to one request.
#[derive(Debug)]
pub struct Served {
    pub response: Response,
    pub source: Source,
    /// Detached background refresh, if one was started.
    pub revalidation: Option<JoinHandle<()>>,
}

impl Served {
    fn new(response: Response, source: Source) -> Self {
        Self { response, source, revalidation: None }
    }
}

/// Store names owned by one worker version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNames {
    pub static_store: String,
    pub dynamic: String,
    pub api: String,
}

impl StoreNames {
    pub fn for_version(version: &str) -> Self {
        Self {
            static_store: LogicalStore::Static.store_name(version),
            dynamic: LogicalStore::Dynamic.store_name(version),
            api: LogicalStore::Api.store_name(version),
        }
    }
}

/// Runs the strategy for a resource class against the registry and network.
#[derive(Clone)]
pub struct StrategyEngine {
    db: CacheDb,
    network: Arc<dyn Network>,
    stores: StoreNames,
    freshness: Duration,
    dynamic_max_entries: usize,
}

impl StrategyEngine {
    pub fn new(db: CacheDb, network: Arc<dyn Network>, config: &AppConfig) -> Self {
        Self {
            db,
            network,
            stores: StoreNames::for_version(&config.version),
            freshness: config.freshness_window(),
            dynamic_max_entries: config.dynamic_max_entries,
        }
    }

    pub fn stores(&self) -> &StoreNames {
        &self.stores
    }

    /// Produce a response for `request` using the strategy of `class`.
    pub async fn respond(&self, class: ResourceClass, request: &Request) -> Served {
        let served = match class {
            ResourceClass::StaticAsset => self.cache_first(request).await,
            ResourceClass::NavigationDocument => self.network_first_document(request).await,
            ResourceClass::CacheableApi => self.fresh_window(request).await,
            ResourceClass::StatusApi => self.network_only(request).await,
            ResourceClass::AuthApi => self.pass_through(request).await,
            ResourceClass::VolatileApi => self.stale_while_revalidate(request).await,
            ResourceClass::Other => self.network_first(request).await,
        };

        tracing::debug!(
            class = %class,
            url = %request.url(),
            status = served.response.status,
            source = ?served.source,
            "served"
        );

        served
    }

    /// Fetch `request` and write it into `store`, failing on any error.
    ///
    /// Used for pre-warming, where a miss must be reported rather than
    /// papered over.
    pub async fn precache(&self, store: &str, request: &Request) -> Result<(), Error> {
        let response = self.fetch_success(request).await?;
        self.db.put_entry(store, request, &Envelope::now(response)).await?;
        Ok(())
    }

    /// Fetch `request`, treating any non-2xx status as an error.
    pub async fn fetch_success(&self, request: &Request) -> Result<Response, Error> {
        let response = self.network.fetch(request).await?;
        if !response.is_success() {
            return Err(Error::HttpError(format!("{} answered status {}", request.url(), response.status)));
        }
        Ok(response)
    }

    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.network.fetch(request).await
    }

    /// Store read; a failing read is a miss.
    async fn lookup(&self, store: &str, request: &Request) -> Option<Envelope> {
        match self.db.match_entry(store, request).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(store, url = %request.url(), error = %e, "store read failed, treating as miss");
                None
            }
        }
    }

    /// Store write of a successful response; failures never reach the caller.
    async fn write_back(&self, store: &str, request: &Request, response: &Response) {
        if !response.is_success() {
            return;
        }

        if let Err(e) = self.db.put_entry(store, request, &Envelope::now(response.clone())).await {
            tracing::warn!(store, url = %request.url(), error = %e, "store write failed");
            return;
        }

        if store == self.stores.dynamic
            && let Err(e) = self.db.trim_store(store, self.dynamic_max_entries).await
        {
            tracing::warn!(store, error = %e, "store trim failed");
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::testing::FakeNetwork;

    pub const ORIGIN: &str = "http://localhost:3000";

    pub async fn engine() -> (StrategyEngine, Arc<FakeNetwork>, CacheDb) {
        engine_with(AppConfig { version: "1".into(), ..Default::default() }).await
    }

    pub async fn engine_with(config: AppConfig) -> (StrategyEngine, Arc<FakeNetwork>, CacheDb) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = Arc::new(FakeNetwork::new(ORIGIN));
        let engine = StrategyEngine::new(db.clone(), network.clone(), &config);
        (engine, network, db)
    }

    pub fn get(path: &str) -> Request {
        Request::get(path, &url::Url::parse(ORIGIN).unwrap()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_store_names_for_version() {
        let names = StoreNames::for_version("3");
        assert_eq!(names.static_store, "static-v3");
        assert_eq!(names.dynamic, "dynamic-v3");
        assert_eq!(names.api, "api-v3");
    }

    #[tokio::test]
    async fn test_precache_requires_success() {
        let (engine, network, db) = engine().await;
        network.route_text("/index.html", "text/html", "<html></html>");

        engine.precache("static-v1", &get("/index.html")).await.unwrap();
        assert!(db.match_entry("static-v1", &get("/index.html")).await.unwrap().is_some());

        let missing = engine.precache("static-v1", &get("/missing.png")).await;
        assert!(matches!(missing, Err(Error::HttpError(_))));

        network.set_online(false);
        assert!(engine.precache("static-v1", &get("/index.html")).await.is_err());
    }

    #[tokio::test]
    async fn test_non_success_not_written() {
        let (engine, network, db) = engine().await;
        network.route("/api/users/me", Response::with_content_type(401, "application/json", "{}"));

        let served = engine.respond(ResourceClass::VolatileApi, &get("/api/users/me")).await;
        assert_eq!(served.response.status, 401);
        assert_eq!(served.source, Source::Network);
        assert!(db.match_entry("api-v1", &get("/api/users/me")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dynamic_store_is_trimmed() {
        let config = AppConfig { version: "1".into(), dynamic_max_entries: 2, ..Default::default() };
        let (engine, network, db) = engine_with(config).await;
        for path in ["/a", "/b", "/c"] {
            network.route_text(path, "text/html", path);
            engine.respond(ResourceClass::NavigationDocument, &get(path)).await;
        }

        let stats = db.store_stats().await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].name, "dynamic-v1");
        assert_eq!(stats[0].entries, 2);
    }

    #[tokio::test]
    async fn test_store_failure_does_not_fail_request() {
        let (engine, network, db) = engine().await;
        network.route_text("/static/app.js", "application/javascript", "ok");

        db.clone().close().await.unwrap();

        let served = engine.respond(ResourceClass::StaticAsset, &get("/static/app.js")).await;
        assert_eq!(served.response.status, 200);
        assert_eq!(served.source, Source::Network);
    }
}
