//! Stale-while-revalidate for the default API class.

use stash_core::{Request, Response};

use super::{Served, Source, StrategyEngine};

impl StrategyEngine {
    /// Answer from `api` immediately and refresh the entry in a detached
    /// task. Concurrent refreshes of one key may race; the last write wins.
    pub(super) async fn stale_while_revalidate(&self, request: &Request) -> Served {
        if let Some(envelope) = self.lookup(&self.stores.api, request).await {
            let engine = self.clone();
            let request = request.clone();
            let handle = tokio::spawn(async move {
                engine.revalidate(&request).await;
            });
            return Served { response: envelope.response, source: Source::Cache, revalidation: Some(handle) };
        }

        match self.fetch(request).await {
            Ok(response) => {
                self.write_back(&self.stores.api, request, &response).await;
                Served::new(response, Source::Network)
            }
            Err(e) => Served::new(Response::offline_json(&e.to_string()), Source::Placeholder),
        }
    }

    async fn revalidate(&self, request: &Request) {
        match self.fetch(request).await {
            Ok(response) => self.write_back(&self.stores.api, request, &response).await,
            Err(e) => tracing::debug!(url = %request.url(), error = %e, "background refresh failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use stash_core::ResourceClass;

    fn json(body: &str) -> Response {
        Response::with_content_type(200, "application/json", body.to_string())
    }

    #[tokio::test]
    async fn test_hit_returns_cached_and_refreshes() {
        let (engine, network, db) = engine().await;
        network.route("/api/signals", json(r#"{"n":1}"#));
        let first = engine.respond(ResourceClass::VolatileApi, &get("/api/signals")).await;
        assert_eq!(first.source, Source::Network);
        assert!(first.revalidation.is_none());

        network.route("/api/signals", json(r#"{"n":2}"#));
        let second = engine.respond(ResourceClass::VolatileApi, &get("/api/signals")).await;
        assert_eq!(second.source, Source::Cache);
        assert_eq!(second.response.body, r#"{"n":1}"#);

        second.revalidation.unwrap().await.unwrap();
        assert_eq!(network.calls_to("/api/signals"), 2);

        let stored = db.match_entry("api-v1", &get("/api/signals")).await.unwrap().unwrap();
        assert_eq!(stored.response.body, r#"{"n":2}"#);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_entry() {
        let (engine, network, db) = engine().await;
        network.route("/api/signals", json(r#"{"n":1}"#));
        engine.respond(ResourceClass::VolatileApi, &get("/api/signals")).await;

        network.set_online(false);
        let served = engine.respond(ResourceClass::VolatileApi, &get("/api/signals")).await;
        assert_eq!(served.source, Source::Cache);
        served.revalidation.unwrap().await.unwrap();

        let stored = db.match_entry("api-v1", &get("/api/signals")).await.unwrap().unwrap();
        assert_eq!(stored.response.body, r#"{"n":1}"#);
    }

    #[tokio::test]
    async fn test_miss_offline_is_json_503() {
        let (engine, network, _db) = engine().await;
        network.set_online(false);

        let served = engine.respond(ResourceClass::VolatileApi, &get("/api/users/me")).await;
        assert_eq!(served.source, Source::Placeholder);
        assert_eq!(served.response.status, 503);
        assert_eq!(served.response.content_type(), Some("application/json"));
    }
}
