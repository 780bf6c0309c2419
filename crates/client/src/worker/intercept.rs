//! Fetch interception: bypass policy and stale-while-revalidate.
//!
//! Per request:
//! 1. Non-GET requests and non-http(s) targets go straight to the network,
//!    untouched and uncached.
//! 2. Otherwise the cache lookup and a live fetch start together. A fresh
//!    response is written back to the cache in the background. The caller
//!    gets the cached response if there is one, the fresh one if not, and a
//!    `FETCH_FAILED` error if there is neither.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use encore_core::{Database, Error, Network, Request, Response};

use crate::fetch::url::uses_network_scheme;

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    Bypass,
}

/// Result of one interception.
#[derive(Debug)]
pub struct Intercepted {
    pub response: Response,
    pub source: ResponseSource,
    revalidation: Option<JoinHandle<Result<bool, Error>>>,
}

impl Intercepted {
    pub(crate) fn bypass(response: Response) -> Self {
        Self { response, source: ResponseSource::Bypass, revalidation: None }
    }

    /// Whether a background cache refresh was started.
    pub fn is_revalidating(&self) -> bool {
        self.revalidation.is_some()
    }

    /// Wait for the background refresh. Returns true if the cache entry was
    /// rewritten, false if no fresh response was obtained or none was started.
    pub async fn revalidated(&mut self) -> Result<bool, Error> {
        match self.revalidation.take() {
            Some(task) => task
                .await
                .map_err(|e| Error::InvalidState(format!("revalidation task failed: {e}")))?,
            None => Ok(false),
        }
    }
}

/// Requests the cache must never see.
pub fn should_bypass(request: &Request) -> bool {
    !request.method.is_retrieval() || !uses_network_scheme(&request.url)
}

/// Applies the caching policy for one worker generation.
pub struct FetchInterceptor {
    db: Database,
    generation: String,
    network: Arc<dyn Network>,
}

impl FetchInterceptor {
    pub fn new(db: Database, generation: String, network: Arc<dyn Network>) -> Self {
        Self { db, generation, network }
    }

    pub async fn handle(&self, request: Request) -> Result<Intercepted, Error> {
        if should_bypass(&request) {
            tracing::debug!("bypassing cache for {} {}", request.method, request.url);
            let response = self.network.fetch(&request).await?;
            return Ok(Intercepted::bypass(response));
        }

        // Install created the generation. A retired worker must not bring it back.
        let cache = self.db.generation(&self.generation);

        let (fresh_tx, fresh_rx) = oneshot::channel();
        let revalidation = {
            let network = Arc::clone(&self.network);
            let cache = cache.clone();
            let request = request.clone();
            tokio::spawn(async move {
                let fetched = match network.fetch(&request).await {
                    Ok(response) => Some(response),
                    Err(e) if e.is_network() => {
                        tracing::debug!("no fresh response for {}: {}", request.url, e);
                        None
                    }
                    Err(e) => {
                        tracing::warn!("fetch for {} failed: {}", request.url, e);
                        None
                    }
                };
                let _ = fresh_tx.send(fetched.clone());

                match fetched {
                    Some(response) => match cache.put(&request, &response).await {
                        Ok(()) => Ok(true),
                        Err(e) => {
                            tracing::warn!("failed to refresh cache for {}: {}", request.url, e);
                            Err(e)
                        }
                    },
                    None => Ok(false),
                }
            })
        };

        let cached = match cache.match_request(&request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!("cache lookup failed for {}, treating as miss: {}", request.url, e);
                None
            }
        };

        if let Some(response) = cached {
            tracing::debug!("cache hit for {}", request.url);
            return Ok(Intercepted { response, source: ResponseSource::Cache, revalidation: Some(revalidation) });
        }

        tracing::debug!("cache miss for {}", request.url);
        match fresh_rx.await {
            Ok(Some(response)) => {
                Ok(Intercepted { response, source: ResponseSource::Network, revalidation: Some(revalidation) })
            }
            _ => Err(Error::FetchFailed(format!("{} is not cached and the network is unavailable", request.url))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryNetwork;
    use encore_core::Method;
    use url::Url;

    const GENERATION: &str = "cacheAssets-v1";

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    async fn setup() -> (Database, Arc<MemoryNetwork>, FetchInterceptor) {
        let db = Database::open_in_memory().await.unwrap();
        db.open_generation(GENERATION).await.unwrap();
        let network = Arc::new(MemoryNetwork::new());
        let interceptor = FetchInterceptor::new(db.clone(), GENERATION.to_string(), network.clone());
        (db, network, interceptor)
    }

    #[test]
    fn test_should_bypass() {
        assert!(!should_bypass(&get("http://localhost:8080/app.js")));
        assert!(!should_bypass(&get("https://example.com/")));
        assert!(should_bypass(&Request::new(Method::Post, Url::parse("https://example.com/songs").unwrap())));
        assert!(should_bypass(&Request::new(Method::Head, Url::parse("https://example.com/").unwrap())));
        assert!(should_bypass(&get("chrome-extension://abcdef/devtools.js")));
    }

    #[tokio::test]
    async fn test_miss_online_serves_network_then_caches() {
        let (db, network, interceptor) = setup().await;
        network.route("http://localhost:8080/app.js", Response::ok("v1")).await;

        let mut first = interceptor.handle(get("http://localhost:8080/app.js")).await.unwrap();
        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(first.response.body, "v1");
        assert!(first.revalidated().await.unwrap());

        network.set_online(false);
        let mut second = interceptor.handle(get("http://localhost:8080/app.js")).await.unwrap();
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.response.body, "v1");
        assert!(!second.revalidated().await.unwrap());

        let cache = db.open_generation(GENERATION).await.unwrap();
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_prefers_stale_then_refreshes() {
        let (db, network, interceptor) = setup().await;
        let request = get("http://localhost:8080/index.html");
        let cache = db.open_generation(GENERATION).await.unwrap();
        cache.put(&request, &Response::ok("stale")).await.unwrap();
        network.route("http://localhost:8080/index.html", Response::ok("fresh")).await;

        let mut outcome = interceptor.handle(request.clone()).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Cache);
        assert_eq!(outcome.response.body, "stale");

        assert!(outcome.revalidated().await.unwrap());
        let stored = cache.match_request(&request).await.unwrap().unwrap();
        assert_eq!(stored.body, "fresh");
    }

    #[tokio::test]
    async fn test_offline_miss_fails() {
        let (db, network, interceptor) = setup().await;
        network.set_online(false);

        let result = interceptor.handle(get("http://localhost:8080/never-seen.css")).await;
        assert!(matches!(result, Err(Error::FetchFailed(_))));

        let cache = db.open_generation(GENERATION).await.unwrap();
        assert!(cache.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_error_statuses_are_served_and_cached() {
        let (db, _network, interceptor) = setup().await;

        let mut outcome = interceptor.handle(get("http://localhost:8080/missing")).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
        assert_eq!(outcome.response.status, 404);
        outcome.revalidated().await.unwrap();

        let cache = db.open_generation(GENERATION).await.unwrap();
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bypass_never_touches_cache() {
        let (db, network, interceptor) = setup().await;
        network.route("http://localhost:8080/songs", Response::new(201, "{}")).await;

        for method in [Method::Post, Method::Put, Method::Patch, Method::Delete, Method::Head] {
            let request = Request::new(method, Url::parse("http://localhost:8080/songs").unwrap());
            let mut outcome = interceptor.handle(request).await.unwrap();
            assert_eq!(outcome.source, ResponseSource::Bypass);
            assert!(!outcome.is_revalidating());
            assert!(!outcome.revalidated().await.unwrap());
        }

        assert!(db.generation(GENERATION).is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_bypass_propagates_network_failure() {
        let (_db, network, interceptor) = setup().await;
        network.set_online(false);

        let request = Request::new(Method::Post, Url::parse("http://localhost:8080/songs").unwrap());
        let result = interceptor.handle(request).await;
        assert!(matches!(result, Err(Error::FetchFailed(_))));
    }

    #[tokio::test]
    async fn test_retired_generation_is_not_recreated() {
        let db = Database::open_in_memory().await.unwrap();
        db.open_generation("cacheAssets-v2").await.unwrap();
        let network = Arc::new(MemoryNetwork::new());
        network.route("http://localhost:8080/app.js", Response::ok("v1")).await;
        let retired = FetchInterceptor::new(db.clone(), GENERATION.to_string(), network.clone());

        let mut outcome = retired.handle(get("http://localhost:8080/app.js")).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
        assert_eq!(outcome.response.body, "v1");
        assert!(outcome.revalidated().await.is_err());

        let names: Vec<String> = db.generations().await.unwrap().into_iter().collect();
        assert_eq!(names, vec!["cacheAssets-v2".to_string()]);
    }

    struct StalledNetwork;

    #[async_trait::async_trait]
    impl Network for StalledNetwork {
        async fn fetch(&self, _request: &Request) -> Result<Response, Error> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cache_hit_does_not_wait_for_network() {
        let db = Database::open_in_memory().await.unwrap();
        let request = get("http://localhost:8080/index.html");
        let cache = db.open_generation(GENERATION).await.unwrap();
        cache.put(&request, &Response::ok("shell")).await.unwrap();
        let interceptor = FetchInterceptor::new(db, GENERATION.to_string(), Arc::new(StalledNetwork));

        let outcome = tokio::time::timeout(std::time::Duration::from_secs(2), interceptor.handle(request))
            .await
            .expect("cache hit waited on the network")
            .unwrap();
        assert_eq!(outcome.source, ResponseSource::Cache);
        assert_eq!(outcome.response.body, "shell");
        assert!(outcome.is_revalidating());
    }
}
