//! In-memory network.
//!
//! Serves a table of responses keyed by URL, answers 404 for anything else,
//! and fails every request while switched offline. Used by tests and for
//! running the worker without a live origin.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use encore_core::{Error, Network, Request, Response};

#[derive(Debug)]
pub struct MemoryNetwork {
    routes: RwLock<HashMap<String, Response>>,
    online: AtomicBool,
    requests: AtomicUsize,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self { routes: RwLock::new(HashMap::new()), online: AtomicBool::new(true), requests: AtomicUsize::new(0) }
    }

    /// Serve `response` for `url` (absolute, fragment-free).
    pub async fn route(&self, url: &str, response: Response) {
        self.routes.write().await.insert(url.to_string(), response);
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Number of fetches attempted, including failed ones.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Network for MemoryNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        if !self.is_online() {
            return Err(Error::FetchFailed(format!("network unreachable: {}", request.url)));
        }

        let routes = self.routes.read().await;
        Ok(routes
            .get(&request.cache_url())
            .cloned()
            .unwrap_or_else(|| Response::new(404, "not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[tokio::test]
    async fn test_routes_and_404() {
        let network = MemoryNetwork::new();
        network.route("https://example.com/", Response::ok("home")).await;

        let home = network.fetch(&Request::get(Url::parse("https://example.com/").unwrap())).await.unwrap();
        assert_eq!(home.status, 200);

        let missing = network.fetch(&Request::get(Url::parse("https://example.com/x").unwrap())).await.unwrap();
        assert_eq!(missing.status, 404);
        assert_eq!(network.requests(), 2);
    }

    #[tokio::test]
    async fn test_offline_fails() {
        let network = MemoryNetwork::new();
        network.route("https://example.com/", Response::ok("home")).await;
        network.set_online(false);

        let result = network.fetch(&Request::get(Url::parse("https://example.com/").unwrap())).await;
        assert!(matches!(result, Err(Error::FetchFailed(_))));
        assert_eq!(network.requests(), 1);
    }
}
