//! Network-first with store fallback, for documents and foreign requests.

use stash_core::{Request, Response};

use super::{Served, Source, StrategyEngine};

impl StrategyEngine {
    /// Navigation documents: network, then `dynamic`, then the root document
    /// pre-warmed into `static`, then the offline page.
    pub(super) async fn network_first_document(&self, request: &Request) -> Served {
        let error = match self.fetch(request).await {
            Ok(response) => {
                self.write_back(&self.stores.dynamic, request, &response).await;
                return Served::new(response, Source::Network);
            }
            Err(e) => e,
        };

        tracing::debug!(url = %request.url(), error = %error, "navigation offline, trying stores");

        if let Some(envelope) = self.lookup(&self.stores.dynamic, request).await {
            return Served::new(envelope.response, Source::Fallback);
        }

        if let Ok(root) = Request::get("/", request.url())
            && let Some(envelope) = self.lookup(&self.stores.static_store, &root).await
        {
            return Served::new(envelope.response, Source::Fallback);
        }

        Served::new(Response::offline_document(), Source::Placeholder)
    }

    /// Everything else: network, then `dynamic`, then a plain 503.
    pub(super) async fn network_first(&self, request: &Request) -> Served {
        match self.fetch(request).await {
            Ok(response) => {
                self.write_back(&self.stores.dynamic, request, &response).await;
                Served::new(response, Source::Network)
            }
            Err(_) => match self.lookup(&self.stores.dynamic, request).await {
                Some(envelope) => Served::new(envelope.response, Source::Fallback),
                None => Served::new(Response::unavailable(), Source::Placeholder),
            },
        }
    }
}
