//! Cache-first for static assets.

use stash_core::{Request, Response};

use super::{Served, Source, StrategyEngine};

impl StrategyEngine {
    /// Serve from `static` when present; otherwise fetch and keep a copy.
    pub(super) async fn cache_first(&self, request: &Request) -> Served {
        if let Some(envelope) = self.lookup(&self.stores.static_store, request).await {
            return Served::new(envelope.response, Source::Cache);
        }

        match self.fetch(request).await {
            Ok(response) => {
                self.write_back(&self.stores.static_store, request, &response).await;
                Served::new(response, Source::Network)
            }
            Err(e) => {
                tracing::debug!(url = %request.url(), error = %e, "static asset unavailable");
                Served::new(Response::unavailable(), Source::Placeholder)
            }
        }
    }
}
