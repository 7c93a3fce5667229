//! Intercepted request descriptors and URL canonicalization.
//!
//! Every request entering the worker is reduced to a method and a canonical
//! absolute URL. The pair is what stores are keyed on.

use url::Url;

use crate::Error;
use crate::cache::hash::compute_request_key;

/// A normalized request descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    url: Url,
}

impl Request {
    /// Build a request from raw parts, resolving relative URLs against `origin`.
    ///
    /// Normalization steps:
    /// 1. Trim leading/trailing whitespace
    /// 2. Resolve relative references against the origin
    /// 3. Lowercase the host
    /// 4. Remove fragment (#...)
    /// 5. Keep query string intact (do not reorder)
    pub fn new(method: &str, raw_url: &str, origin: &Url) -> Result<Self, Error> {
        let url = canonicalize(raw_url, origin)?;
        let method = method.trim();
        let method = if method.is_empty() { "GET".to_string() } else { method.to_ascii_uppercase() };
        Ok(Self { method, url })
    }

    /// Shorthand for a GET request.
    pub fn get(raw_url: &str, origin: &Url) -> Result<Self, Error> {
        Self::new("GET", raw_url, origin)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Store key for this request: method plus full URL, query included.
    pub fn key(&self) -> String {
        compute_request_key(&self.method, self.url.as_str())
    }
}

/// Canonicalize a raw URL against the worker origin.
fn canonicalize(input: &str, origin: &Url) -> Result<Url, Error> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("empty URL".into()));
    }

    let mut parsed = origin.join(trimmed).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(Error::InvalidUrl(format!("unsupported scheme: {scheme}"))),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(&lowered))
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}
