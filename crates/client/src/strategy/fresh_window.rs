//! Freshness-windowed cache for allow-listed API responses.

use chrono::Utc;
use stash_core::{Request, Response};

use super::{Served, Source, StrategyEngine};

impl StrategyEngine {
    /// Serve an `api` entry younger than the freshness window without
    /// touching the network. Older or missing entries are refetched; if the
    /// network is down an expired entry still beats a 503.
    pub(super) async fn fresh_window(&self, request: &Request) -> Served {
        let cached = self.lookup(&self.stores.api, request).await;

        if let Some(envelope) = &cached
            && envelope.is_fresh(Utc::now(), self.freshness)
        {
            return Served::new(envelope.response.clone(), Source::Cache);
        }

        match self.fetch(request).await {
            Ok(response) => {
                self.write_back(&self.stores.api, request, &response).await;
                Served::new(response, Source::Network)
            }
            Err(e) => match cached {
                Some(envelope) => {
                    tracing::debug!(url = %request.url(), age_secs = envelope.age(Utc::now()).as_secs(), "serving expired entry offline");
                    Served::new(envelope.response, Source::StaleCache)
                }
                None => Served::new(Response::offline_json(&e.to_string()), Source::Placeholder),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use stash_core::{Envelope, ResourceClass};

    fn json(body: &str) -> Response {
        Response::with_content_type(200, "application/json", body.to_string())
    }

    #[tokio::test]
    async fn test_within_window_no_network() {
        let (engine, network, _db) = engine().await;
        network.route("/api/courses", json(r#"{"courses":[1]}"#));

        let first = engine.respond(ResourceClass::CacheableApi, &get("/api/courses")).await;
        network.route("/api/courses", json(r#"{"courses":[1,2]}"#));
        let second = engine.respond(ResourceClass::CacheableApi, &get("/api/courses")).await;

        assert_eq!(first.source, Source::Network);
        assert_eq!(second.source, Source::Cache);
        assert_eq!(first.response.body, second.response.body);
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_refetched_once() {
        let (engine, network, db) = engine().await;
        let old = Envelope::stamped(json(r#"{"v":1}"#), Utc::now() - chrono::Duration::minutes(6));
        db.put_entry("api-v1", &get("/api/courses"), &old).await.unwrap();
        network.route("/api/courses", json(r#"{"v":2}"#));

        let served = engine.respond(ResourceClass::CacheableApi, &get("/api/courses")).await;
        assert_eq!(served.source, Source::Network);
        assert_eq!(served.response.body, r#"{"v":2}"#);
        assert_eq!(network.calls(), 1);

        let stored = db.match_entry("api-v1", &get("/api/courses")).await.unwrap().unwrap();
        assert!(stored.is_fresh(Utc::now(), engine.freshness));
        assert_eq!(stored.response.body, r#"{"v":2}"#);
    }

    #[tokio::test]
    async fn test_expired_entry_served_when_offline() {
        let (engine, network, db) = engine().await;
        let old = Envelope::stamped(json(r#"{"running":false}"#), Utc::now() - chrono::Duration::minutes(10));
        db.put_entry("api-v1", &get("/api/cleanup-status"), &old).await.unwrap();
        network.set_online(false);

        let served = engine.respond(ResourceClass::CacheableApi, &get("/api/cleanup-status")).await;
        assert_eq!(served.source, Source::StaleCache);
        assert_eq!(served.response.status, 200);
        assert_eq!(served.response.body, r#"{"running":false}"#);
    }

    #[tokio::test]
    async fn test_miss_offline_is_json_503() {
        let (engine, network, _db) = engine().await;
        network.set_online(false);

        let served = engine.respond(ResourceClass::CacheableApi, &get("/api/plans")).await;
        assert_eq!(served.source, Source::Placeholder);
        assert_eq!(served.response.status, 503);
        let body: serde_json::Value = serde_json::from_slice(&served.response.body).unwrap();
        assert_eq!(body["offline"], true);
        assert_eq!(body["success"], false);
    }
}
