//! Network-only paths: status polling and pass-through.

use stash_core::{Request, Response};

use super::{Served, Source, StrategyEngine};

impl StrategyEngine {
    /// Status endpoints: never read or written from any store.
    pub(super) async fn network_only(&self, request: &Request) -> Served {
        match self.fetch(request).await {
            Ok(response) => Served::new(response, Source::Network),
            Err(e) => Served::new(Response::offline_json(&e.to_string()), Source::Placeholder),
        }
    }

    /// Forward unmodified with no store access. Used for auth and non-GET
    /// requests, and by the worker for every request before activation.
    pub async fn pass_through(&self, request: &Request) -> Served {
        match self.fetch(request).await {
            Ok(response) => Served::new(response, Source::Network),
            Err(e) => {
                tracing::debug!(method = request.method(), url = %request.url(), error = %e, "pass-through failed");
                Served::new(Response::offline_json(&e.to_string()), Source::Placeholder)
            }
        }
    }
}
