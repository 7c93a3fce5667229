//! Request classification.
//!
//! Maps a request to the resource class that decides its caching strategy.
//! Classification is pure and never fails; unmatched requests fall through
//! to a default class.
//!
//! ### Precedence
//!
//! 1. Non-GET requests and authentication paths pass through untouched.
//! 2. Cross-origin requests are `other`.
//! 3. Network-first (status/polling) fragments.
//! 4. Cacheable API allow-list fragments.
//! 5. Any other path under the API marker.
//! 6. Static prefixes and extensions.
//! 7. Everything else is a navigation document.
//!
//! Step 3 precedes step 4 so that a path listed in both is never served
//! from cache.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::AppConfig;

/// The category a request is sorted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceClass {
    StaticAsset,
    NavigationDocument,
    CacheableApi,
    StatusApi,
    VolatileApi,
    AuthApi,
    Other,
}

impl ResourceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceClass::StaticAsset => "static-asset",
            ResourceClass::NavigationDocument => "navigation-document",
            ResourceClass::CacheableApi => "cacheable-api",
            ResourceClass::StatusApi => "status-api",
            ResourceClass::VolatileApi => "volatile-api",
            ResourceClass::AuthApi => "auth-api",
            ResourceClass::Other => "other",
        }
    }

    /// Whether failures for this class answer with the JSON offline body.
    pub fn is_api(&self) -> bool {
        matches!(
            self,
            ResourceClass::CacheableApi | ResourceClass::StatusApi | ResourceClass::VolatileApi | ResourceClass::AuthApi
        )
    }
}

impl std::fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pattern lists the classifier matches against.
#[derive(Debug, Clone)]
pub struct Classifier {
    origin: Url,
    auth_api: Vec<String>,
    network_first_api: Vec<String>,
    cacheable_api: Vec<String>,
    api_marker: String,
    static_prefixes: Vec<String>,
    static_extensions: Vec<String>,
}

impl Classifier {
    pub fn new(config: &AppConfig, origin: Url) -> Self {
        Self {
            origin,
            auth_api: config.auth_api.clone(),
            network_first_api: config.network_first_api.clone(),
            cacheable_api: config.cacheable_api.clone(),
            api_marker: config.api_marker.clone(),
            static_prefixes: config.static_prefixes.clone(),
            static_extensions: config.static_extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    /// Classify a request by URL and method.
    pub fn classify(&self, url: &Url, method: &str) -> ResourceClass {
        let path = url.path();

        if !method.eq_ignore_ascii_case("GET") || contains_any(path, &self.auth_api) {
            return ResourceClass::AuthApi;
        }

        if url.origin() != self.origin.origin() {
            return ResourceClass::Other;
        }

        if contains_any(path, &self.network_first_api) {
            return ResourceClass::StatusApi;
        }

        if contains_any(path, &self.cacheable_api) {
            return ResourceClass::CacheableApi;
        }

        if path.contains(self.api_marker.as_str()) {
            return ResourceClass::VolatileApi;
        }

        if self.is_static(path) {
            return ResourceClass::StaticAsset;
        }

        ResourceClass::NavigationDocument
    }

    fn is_static(&self, path: &str) -> bool {
        if self.static_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return true;
        }
        let lowered = path.to_ascii_lowercase();
        self.static_extensions.iter().any(|ext| lowered.ends_with(ext.as_str()))
    }
}

fn contains_any(path: &str, fragments: &[String]) -> bool {
    fragments.iter().any(|f| !f.is_empty() && path.contains(f.as_str()))
}
