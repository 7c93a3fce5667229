//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (STASH_*)
//! 2. TOML config file (if STASH_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The resource lists and the freshness window are load-bearing for request
//! classification; the defaults below are the values the worker ships with.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (STASH_*)
/// 2. TOML config file (if STASH_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Worker version identifier; store names are derived from it.
    ///
    /// Set via STASH_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Origin that relative request URLs resolve against.
    ///
    /// Set via STASH_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to the SQLite store registry.
    ///
    /// Set via STASH_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Outbound request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size accepted from the network.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Freshness window for allow-listed API responses, in seconds.
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,

    /// Upper bound on entries kept in the `dynamic` store.
    #[serde(default = "default_dynamic_max_entries")]
    pub dynamic_max_entries: usize,

    /// Resources that must be pre-warmed into `static` for install to succeed.
    #[serde(default = "default_critical_resources")]
    pub critical_resources: Vec<String>,

    /// Routes warmed into `dynamic` on a best-effort basis during install.
    #[serde(default = "default_background_resources")]
    pub background_resources: Vec<String>,

    /// API path fragments served from a freshness-windowed cache.
    #[serde(default = "default_cacheable_api")]
    pub cacheable_api: Vec<String>,

    /// API path fragments that are always fetched from the network.
    #[serde(default = "default_network_first_api")]
    pub network_first_api: Vec<String>,

    /// Authentication path fragments that bypass every store.
    #[serde(default = "default_auth_api")]
    pub auth_api: Vec<String>,

    /// Path fragment marking API requests and API store names.
    #[serde(default = "default_api_marker")]
    pub api_marker: String,

    /// Path prefixes served as static assets.
    #[serde(default = "default_static_prefixes")]
    pub static_prefixes: Vec<String>,

    /// File extensions served as static assets.
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").into()
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./stash-cache.sqlite")
}

fn default_user_agent() -> String {
    "stash-worker/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_freshness_secs() -> u64 {
    300
}

fn default_dynamic_max_entries() -> usize {
    100
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_critical_resources() -> Vec<String> {
    strings(&["/", "/index.html", "/manifest.json", "/favicon.ico", "/logo192.png", "/logo512.png"])
}

fn default_background_resources() -> Vec<String> {
    strings(&["/courses", "/signals", "/about", "/contact", "/login", "/register"])
}

fn default_cacheable_api() -> Vec<String> {
    strings(&["/api/courses", "/api/cleanup-status", "/api/plans", "/api/testimonials"])
}

fn default_network_first_api() -> Vec<String> {
    strings(&["/api/market-status", "/api/signals/live", "/api/payments/status", "/api/health"])
}

fn default_auth_api() -> Vec<String> {
    strings(&["/api/auth/", "/api/login", "/api/logout", "/api/register"])
}

fn default_api_marker() -> String {
    "/api/".into()
}

fn default_static_prefixes() -> Vec<String> {
    strings(&["/static/", "/assets/", "/icons/", "/images/", "/manifest.json"])
}

fn default_static_extensions() -> Vec<String> {
    strings(&[
        ".js", ".css", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".woff", ".woff2", ".ttf",
        ".webmanifest",
    ])
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            freshness_secs: default_freshness_secs(),
            dynamic_max_entries: default_dynamic_max_entries(),
            critical_resources: default_critical_resources(),
            background_resources: default_background_resources(),
            cacheable_api: default_cacheable_api(),
            network_first_api: default_network_first_api(),
            auth_api: default_auth_api(),
            api_marker: default_api_marker(),
            static_prefixes: default_static_prefixes(),
            static_extensions: default_static_extensions(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Freshness window for allow-listed API responses.
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    /// Parsed origin URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme {scheme}") }),
        }
    }

    /// Name of the API store marker as it appears in store names.
    ///
    /// `/api/` in request paths corresponds to `api` in `api-v{version}`.
    pub fn api_store_marker(&self) -> &str {
        self.api_marker.trim_matches('/')
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `STASH_`
    /// 2. TOML file from `STASH_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment()
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("STASH_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("STASH_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.db_path, PathBuf::from("./stash-cache.sqlite"));
        assert_eq!(config.freshness_secs, 300);
        assert_eq!(config.dynamic_max_entries, 100);
        assert_eq!(config.api_marker, "/api/");
        assert!(config.critical_resources.contains(&"/".to_string()));
        assert!(config.cacheable_api.contains(&"/api/cleanup-status".to_string()));
        assert!(config.network_first_api.contains(&"/api/market-status".to_string()));
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.freshness_window(), Duration::from_secs(300));
    }

    #[test]
    fn test_origin_url() {
        let config = AppConfig::default();
        assert_eq!(config.origin_url().unwrap().as_str(), "http://localhost:3000/");

        let config = AppConfig { origin: "ftp://example.com".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_api_store_marker() {
        let config = AppConfig::default();
        assert_eq!(config.api_store_marker(), "api");
    }

    #[test]
    fn test_load_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("STASH_VERSION", "42.1.0");
            jail.set_env("STASH_FRESHNESS_SECS", "60");
            let config = AppConfig::load().expect("config loads");
            assert_eq!(config.version, "42.1.0");
            assert_eq!(config.freshness_secs, 60);
            assert_eq!(config.api_marker, "/api/");
            Ok(())
        });
    }

    #[test]
    fn test_load_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "stash.toml",
                r#"
                version = "7"
                cacheable_api = ["/api/only-this"]
                "#,
            )?;
            jail.set_env("STASH_CONFIG_FILE", "stash.toml");
            let config = AppConfig::load().expect("config loads");
            assert_eq!(config.version, "7");
            assert_eq!(config.cacheable_api, vec!["/api/only-this".to_string()]);
            Ok(())
        });
    }
}
