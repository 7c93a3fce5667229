//! In-process network fake for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use stash_core::{Error, Request, Response};
use url::Url;

/// A scripted [`Network`](crate::Network) that records every call.
///
/// Unrouted URLs answer 404. While offline every call fails with
/// `HTTP_ERROR` but is still counted.
pub struct FakeNetwork {
    base: Url,
    routes: Mutex<HashMap<String, Response>>,
    online: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl FakeNetwork {
    pub fn new(base: &str) -> Self {
        Self {
            base: Url::parse(base).expect("valid base URL"),
            routes: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer `path` (resolved against the base) with `response`.
    pub fn route(&self, path: &str, response: Response) {
        let url = self.base.join(path).expect("valid path");
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    /// Shorthand for a 200 text response.
    pub fn route_text(&self, path: &str, content_type: &str, body: &str) {
        self.route(path, Response::with_content_type(200, content_type, body.to_string()));
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Total number of fetches attempted.
    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of fetches attempted for `path`.
    pub fn calls_to(&self, path: &str) -> usize {
        let url = self.base.join(path).expect("valid path").to_string();
        self.calls.lock().unwrap().iter().filter(|u| **u == url).count()
    }
}

#[async_trait]
impl crate::Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url().to_string();
        self.calls.lock().unwrap().push(url.clone());

        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::HttpError("network error: unreachable".into()));
        }

        let routed = self.routes.lock().unwrap().get(&url).cloned();
        Ok(routed.unwrap_or_else(|| Response::with_content_type(404, "text/plain", "Not Found")))
    }
}
