//! Offline asset cache policy for the web shell.
//!
//! `OfflineWorker` decides, per request, whether to answer from the network
//! or from a version-named asset cache:
//!
//! - navigations go to the network first and fall back to the offline page
//! - static assets are served stale-while-revalidate
//! - everything else goes to the network first and falls back to any cache
//!
//! The network sits behind the `Network` trait. `HttpNetwork` is the
//! reqwest-backed implementation.

pub mod worker;

use std::future::Future;

use reqwest::{Client, Method, Url};
use thiserror::Error;

pub use worker::{CacheStorage, OfflineWorker};

pub const CACHE_VERSION: &str = "v1";

/// Name of the cache the current version installs into
pub const CACHE_NAME: &str = "moneyudi-v1";

pub const OFFLINE_URL: &str = "/offline.html";

/// Shell assets cached at install time
pub const PRECACHE_ASSETS: &[&str] = &[
    "/",
    OFFLINE_URL,
    "/manifest.webmanifest",
    "/apple-touch-icon.png",
    "/icons/icon-192.png",
    "/icons/icon-512.png",
];

const STATIC_EXTENSIONS: &[&str] = &[".png", ".jpg", ".svg", ".css", ".js", ".woff2"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OfflineError {
    #[error("Network request failed for {path}: {reason}")]
    Network { path: String, reason: String },

    #[error("Install failed: could not cache {path} ({reason})")]
    Install { path: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub method: Method,
    /// Path plus optional query, e.g. `/icons/icon-192.png`
    pub path: String,
    /// Top-level page navigation
    pub navigate: bool,
}

impl AssetRequest {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::GET,
            path: path.to_string(),
            navigate: false,
        }
    }

    pub fn navigate(path: &str) -> Self {
        Self {
            navigate: true,
            ..Self::get(path)
        }
    }

    pub fn with_method(path: &str, method: Method) -> Self {
        Self {
            method,
            ..Self::get(path)
        }
    }

    /// Path without the query string
    pub fn pathname(&self) -> &str {
        self.path.split(['?', '#']).next().unwrap_or(&self.path)
    }

    pub fn class(&self) -> RequestClass {
        if self.navigate {
            return RequestClass::Navigation;
        }
        let path = self.pathname();
        let is_static = path.starts_with("/icons")
            || STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext));
        if self.method == Method::GET && is_static {
            RequestClass::StaticAsset
        } else {
            RequestClass::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    Navigation,
    StaticAsset,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
}

impl AssetResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            body: body.into(),
        }
    }

    /// Synthetic answer when neither network nor cache can serve a page
    pub fn offline() -> Self {
        Self {
            status: 503,
            status_text: "Offline".to_string(),
            body: b"Offline".to_vec(),
        }
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Network: Send + Sync + 'static {
    fn fetch(
        &self,
        request: &AssetRequest,
    ) -> impl Future<Output = Result<AssetResponse, OfflineError>> + Send;
}

/// Fetches assets from the web app's origin
#[derive(Clone)]
pub struct HttpNetwork {
    client: Client,
    origin: Url,
}

impl HttpNetwork {
    pub fn new(client: Client, origin: Url) -> Self {
        Self { client, origin }
    }

    fn url_for(&self, request: &AssetRequest) -> Result<Url, OfflineError> {
        self.origin
            .join(&request.path)
            .map_err(|e| OfflineError::Network {
                path: request.path.clone(),
                reason: e.to_string(),
            })
    }
}

impl Network for HttpNetwork {
    fn fetch(
        &self,
        request: &AssetRequest,
    ) -> impl Future<Output = Result<AssetResponse, OfflineError>> + Send {
        let client = self.client.clone();
        let url = self.url_for(request);
        let method = request.method.clone();
        let path = request.path.clone();
        async move {
            let network_err = |e: reqwest::Error| OfflineError::Network {
                path: path.clone(),
                reason: e.to_string(),
            };
            let response = client
                .request(method, url?)
                .send()
                .await
                .map_err(network_err)?;
            let status = response.status();
            let body = response.bytes().await.map_err(network_err)?;
            Ok(AssetResponse {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body: body.to_vec(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_requests() {
        assert_eq!(AssetRequest::navigate("/").class(), RequestClass::Navigation);
        assert_eq!(
            AssetRequest::get("/icons/icon-192.png").class(),
            RequestClass::StaticAsset
        );
        assert_eq!(AssetRequest::get("/icons").class(), RequestClass::StaticAsset);
        assert_eq!(
            AssetRequest::get("/_next/app.js?v=3").class(),
            RequestClass::StaticAsset
        );
        assert_eq!(AssetRequest::get("/fonts/x.woff2").class(), RequestClass::StaticAsset);
        assert_eq!(AssetRequest::get("/api/translate").class(), RequestClass::Other);
        assert_eq!(AssetRequest::get("/manifest.webmanifest").class(), RequestClass::Other);
        assert_eq!(
            AssetRequest::with_method("/style.css", Method::POST).class(),
            RequestClass::Other
        );
    }

    #[test]
    fn test_pathname_strips_query() {
        assert_eq!(AssetRequest::get("/a.css?x=1").pathname(), "/a.css");
        assert_eq!(AssetRequest::get("/a.css").pathname(), "/a.css");
    }

    #[test]
    fn test_precache_list() {
        assert_eq!(CACHE_NAME, format!("moneyudi-{}", CACHE_VERSION));
        assert!(PRECACHE_ASSETS.contains(&OFFLINE_URL));
        assert_eq!(PRECACHE_ASSETS.len(), 6);
    }

    #[test]
    fn test_http_network_joins_origin() {
        let origin = Url::parse("https://moneyudi.app").unwrap();
        let network = HttpNetwork::new(Client::new(), origin);
        let url = network
            .url_for(&AssetRequest::get("/icons/icon-192.png"))
            .unwrap();
        assert_eq!(url.as_str(), "https://moneyudi.app/icons/icon-192.png");
    }
}
