use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{
    AssetRequest, AssetResponse, Network, OfflineError, RequestClass, CACHE_NAME, OFFLINE_URL,
    PRECACHE_ASSETS,
};

/// Named caches of responses keyed by request path
#[derive(Debug, Default, Clone)]
pub struct CacheStorage {
    caches: HashMap<String, HashMap<String, AssetResponse>>,
}

impl CacheStorage {
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get(&self, cache: &str, path: &str) -> Option<&AssetResponse> {
        self.caches.get(cache).and_then(|c| c.get(path))
    }

    /// First match across every cache, in name order
    pub fn match_any(&self, path: &str) -> Option<&AssetResponse> {
        let mut names: Vec<&String> = self.caches.keys().collect();
        names.sort();
        names.into_iter().find_map(|name| self.get(name, path))
    }

    pub fn put(&mut self, cache: &str, path: &str, response: AssetResponse) {
        self.caches
            .entry(cache.to_string())
            .or_default()
            .insert(path.to_string(), response);
    }

    pub fn delete_cache(&mut self, cache: &str) -> bool {
        self.caches.remove(cache).is_some()
    }

    pub fn len(&self, cache: &str) -> usize {
        self.caches.get(cache).map(|c| c.len()).unwrap_or(0)
    }
}

pub struct OfflineWorker<N: Network> {
    network: Arc<N>,
    storage: Arc<Mutex<CacheStorage>>,
    pending: Mutex<JoinSet<()>>,
}

impl<N: Network> OfflineWorker<N> {
    pub fn new(network: N) -> Self {
        Self::with_storage(network, CacheStorage::default())
    }

    /// Start from caches left by an earlier version
    pub fn with_storage(network: N, storage: CacheStorage) -> Self {
        Self {
            network: Arc::new(network),
            storage: Arc::new(Mutex::new(storage)),
            pending: Mutex::new(JoinSet::new()),
        }
    }

    pub async fn storage(&self) -> CacheStorage {
        self.storage.lock().await.clone()
    }

    /// Fetch every precache asset and store them together. Any failed or
    /// non-2xx fetch aborts the install and leaves the cache untouched.
    pub async fn install(&self) -> Result<(), OfflineError> {
        let fetches = PRECACHE_ASSETS.iter().map(|path| {
            let request = AssetRequest::get(path);
            let network = Arc::clone(&self.network);
            async move {
                let response = network.fetch(&request).await.map_err(|e| OfflineError::Install {
                    path: request.path.clone(),
                    reason: e.to_string(),
                })?;
                if !response.is_ok() {
                    return Err(OfflineError::Install {
                        path: request.path.clone(),
                        reason: format!("status {}", response.status),
                    });
                }
                Ok((request.path, response))
            }
        });
        let fetched = futures::future::try_join_all(fetches).await?;

        let mut storage = self.storage.lock().await;
        for (path, response) in fetched {
            storage.put(CACHE_NAME, &path, response);
        }
        info!(cache = CACHE_NAME, assets = PRECACHE_ASSETS.len(), "Offline cache installed");
        Ok(())
    }

    /// Delete every cache not named for this version; returns the deleted names
    pub async fn activate(&self) -> Vec<String> {
        let mut storage = self.storage.lock().await;
        let stale: Vec<String> = storage
            .names()
            .into_iter()
            .filter(|name| name != CACHE_NAME)
            .collect();
        for name in &stale {
            storage.delete_cache(name);
            debug!(cache = %name, "Deleted stale cache");
        }
        stale
    }

    pub async fn handle(&self, request: &AssetRequest) -> Result<AssetResponse, OfflineError> {
        match request.class() {
            RequestClass::Navigation => self.handle_navigation(request).await,
            RequestClass::StaticAsset => self.handle_static(request).await,
            RequestClass::Other => self.handle_other(request).await,
        }
    }

    async fn handle_navigation(&self, request: &AssetRequest) -> Result<AssetResponse, OfflineError> {
        match self.network.fetch(request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                debug!(path = %request.path, error = %e, "Navigation offline");
                let storage = self.storage.lock().await;
                Ok(storage
                    .get(CACHE_NAME, OFFLINE_URL)
                    .cloned()
                    .unwrap_or_else(AssetResponse::offline))
            }
        }
    }

    /// Stale-while-revalidate: a cached copy is returned at once while a
    /// background fetch refreshes it. Responses are stored whatever their
    /// status.
    async fn handle_static(&self, request: &AssetRequest) -> Result<AssetResponse, OfflineError> {
        let cached = self
            .storage
            .lock()
            .await
            .get(CACHE_NAME, &request.path)
            .cloned();

        match cached {
            Some(cached) => {
                let network = Arc::clone(&self.network);
                let storage = Arc::clone(&self.storage);
                let request = request.clone();
                let mut pending = self.pending.lock().await;
                while let Some(result) = pending.try_join_next() {
                    if let Err(e) = result {
                        warn!(error = %e, "Revalidation task failed");
                    }
                }
                pending.spawn(async move {
                    match network.fetch(&request).await {
                        Ok(fresh) => storage.lock().await.put(CACHE_NAME, &request.path, fresh),
                        Err(e) => debug!(path = %request.path, error = %e, "Revalidation failed"),
                    }
                });
                Ok(cached)
            }
            None => {
                let fresh = self.network.fetch(request).await?;
                self.storage
                    .lock()
                    .await
                    .put(CACHE_NAME, &request.path, fresh.clone());
                Ok(fresh)
            }
        }
    }

    async fn handle_other(&self, request: &AssetRequest) -> Result<AssetResponse, OfflineError> {
        match self.network.fetch(request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                // Only GET responses are ever cached
                if request.method == reqwest::Method::GET {
                    if let Some(hit) = self.storage.lock().await.match_any(&request.path) {
                        return Ok(hit.clone());
                    }
                }
                Err(e)
            }
        }
    }

    #[cfg(test)]
    async fn pending_revalidations(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Wait for every background revalidation started so far
    pub async fn settle(&self) {
        let mut pending = self.pending.lock().await;
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Revalidation task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Serves `body-of:{path}`, or fails everything while offline
    #[derive(Default)]
    struct FakeNetwork {
        offline: AtomicBool,
        calls: AtomicUsize,
        failing_path: Option<String>,
        version: AtomicUsize,
    }

    impl FakeNetwork {
        fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }
    }

    impl Network for FakeNetwork {
        fn fetch(
            &self,
            request: &AssetRequest,
        ) -> impl Future<Output = Result<AssetResponse, OfflineError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fails = self.offline.load(Ordering::SeqCst)
                || self.failing_path.as_deref() == Some(request.path.as_str());
            let result = if fails {
                Err(OfflineError::Network {
                    path: request.path.clone(),
                    reason: "offline".to_string(),
                })
            } else {
                let version = self.version.load(Ordering::SeqCst);
                Ok(AssetResponse::ok(format!("{}@{}", request.path, version)))
            };
            async move { result }
        }
    }

    fn body(response: &AssetResponse) -> String {
        String::from_utf8_lossy(&response.body).into_owned()
    }

    #[tokio::test]
    async fn test_install_caches_all_assets() {
        let worker = OfflineWorker::new(FakeNetwork::default());
        worker.install().await.unwrap();
        let storage = worker.storage().await;
        assert_eq!(storage.len(CACHE_NAME), PRECACHE_ASSETS.len());
        assert!(storage.get(CACHE_NAME, OFFLINE_URL).is_some());
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let network = FakeNetwork {
            failing_path: Some("/icons/icon-512.png".to_string()),
            ..FakeNetwork::default()
        };
        let worker = OfflineWorker::new(network);
        let err = worker.install().await.unwrap_err();
        assert!(matches!(err, OfflineError::Install { ref path, .. } if path == "/icons/icon-512.png"));
        assert_eq!(worker.storage().await.len(CACHE_NAME), 0);
    }

    #[tokio::test]
    async fn test_activate_deletes_other_versions() {
        let mut old = CacheStorage::default();
        old.put("moneyudi-v0", "/", AssetResponse::ok("old"));
        old.put(CACHE_NAME, "/", AssetResponse::ok("current"));
        let worker = OfflineWorker::with_storage(FakeNetwork::default(), old);

        assert_eq!(worker.activate().await, vec!["moneyudi-v0".to_string()]);
        assert_eq!(worker.storage().await.names(), vec![CACHE_NAME.to_string()]);
    }

    #[tokio::test]
    async fn test_navigation_falls_back_to_offline_page() {
        let worker = OfflineWorker::new(FakeNetwork::default());
        let online = worker.handle(&AssetRequest::navigate("/reports")).await.unwrap();
        assert_eq!(body(&online), "/reports@0");

        worker.install().await.unwrap();
        worker.network.set_offline(true);
        let offline = worker.handle(&AssetRequest::navigate("/reports")).await.unwrap();
        assert_eq!(body(&offline), "/offline.html@0");
    }

    #[tokio::test]
    async fn test_navigation_without_offline_page_is_503() {
        let worker = OfflineWorker::new(FakeNetwork::default());
        worker.network.set_offline(true);
        let response = worker.handle(&AssetRequest::navigate("/")).await.unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(response.status_text, "Offline");
    }

    #[tokio::test]
    async fn test_static_asset_stale_while_revalidate() {
        let worker = OfflineWorker::new(FakeNetwork::default());
        let request = AssetRequest::get("/app.css");

        // Miss: waits on the network and stores the result
        let first = worker.handle(&request).await.unwrap();
        assert_eq!(body(&first), "/app.css@0");

        // Hit: served stale, refreshed in the background
        worker.network.version.store(1, Ordering::SeqCst);
        let second = worker.handle(&request).await.unwrap();
        assert_eq!(body(&second), "/app.css@0");

        worker.settle().await;
        let third = worker.handle(&request).await.unwrap();
        assert_eq!(body(&third), "/app.css@1");
        worker.settle().await;
    }

    #[tokio::test]
    async fn test_finished_revalidations_are_reaped() {
        let worker = OfflineWorker::new(FakeNetwork::default());
        let request = AssetRequest::get("/app.js");
        worker.handle(&request).await.unwrap();

        for version in 1..=5 {
            worker.network.version.store(version, Ordering::SeqCst);
            worker.handle(&request).await.unwrap();
            let expected = format!("/app.js@{}", version);
            loop {
                tokio::task::yield_now().await;
                let storage = worker.storage().await;
                if storage.get(CACHE_NAME, "/app.js").map(body) == Some(expected.clone()) {
                    break;
                }
            }
        }

        assert_eq!(worker.pending_revalidations().await, 1);
        worker.settle().await;
        assert_eq!(worker.pending_revalidations().await, 0);
    }

    #[tokio::test]
    async fn test_static_asset_served_from_cache_when_offline() {
        let worker = OfflineWorker::new(FakeNetwork::default());
        worker.install().await.unwrap();
        worker.network.set_offline(true);

        let icon = worker.handle(&AssetRequest::get("/icons/icon-192.png")).await.unwrap();
        assert_eq!(body(&icon), "/icons/icon-192.png@0");
        worker.settle().await;

        // Failed revalidation keeps the cached copy
        let again = worker.handle(&AssetRequest::get("/icons/icon-192.png")).await.unwrap();
        assert_eq!(body(&again), "/icons/icon-192.png@0");
        worker.settle().await;
    }

    #[tokio::test]
    async fn test_static_asset_miss_while_offline_fails() {
        let worker = OfflineWorker::new(FakeNetwork::default());
        worker.network.set_offline(true);
        assert!(worker.handle(&AssetRequest::get("/logo.svg")).await.is_err());
    }

    #[tokio::test]
    async fn test_other_requests_network_first_with_cache_fallback() {
        let mut storage = CacheStorage::default();
        storage.put("moneyudi-v0", "/manifest.webmanifest", AssetResponse::ok("cached"));
        let worker = OfflineWorker::with_storage(FakeNetwork::default(), storage);

        let online = worker
            .handle(&AssetRequest::get("/manifest.webmanifest"))
            .await
            .unwrap();
        assert_eq!(body(&online), "/manifest.webmanifest@0");

        worker.network.set_offline(true);
        let fallback = worker
            .handle(&AssetRequest::get("/manifest.webmanifest"))
            .await
            .unwrap();
        assert_eq!(body(&fallback), "cached");

        assert!(worker.handle(&AssetRequest::get("/api/translate")).await.is_err());
        assert!(worker
            .handle(&AssetRequest::with_method(
                "/manifest.webmanifest",
                reqwest::Method::POST
            ))
            .await
            .is_err());
    }
}
