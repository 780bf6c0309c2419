//! cache_get tool implementation.
//!
//! Retrieves a cached response by URL without touching the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use encore_client::ServiceHost;
use encore_client::fetch::resolve;
use encore_core::{CachedEntry, Error, Request};

use super::target_generation;
use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL of the cached request; relative paths resolve against the origin.
    pub url: String,

    /// Generation to read (default: the active worker's).
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub generation: String,
    pub entry: CachedEntry,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(host: &ServiceHost, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = resolve(host.scope(), &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = Request::get(url);
    let generation = target_generation(host, params.generation).await;

    let db = host.database();
    if !db.has_generation(&generation).await? {
        return Err(Error::CacheMiss(format!("no generation named {generation}")).into());
    }
    let cache = db.generation(&generation);

    let miss = || Error::CacheMiss(request.cache_url());
    let entry = cache.entry(&request).await?.ok_or_else(miss)?;
    let response = cache.match_request(&request).await?.ok_or_else(miss)?;

    let body = String::from_utf8_lossy(&response.body).to_string();
    let output = CacheGetOutput { generation, entry, headers: response.headers, body };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{registered_host, text};

    #[tokio::test]
    async fn test_get_missing() {
        let (host, _db, _network) = registered_host().await;
        let params = CacheGetParams { url: "/nonexistent.css".into(), generation: None };

        let err = get_impl(&host, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_found() {
        let (host, _db, _network) = registered_host().await;
        let params = CacheGetParams { url: "/manifest.json".into(), generation: None };

        let output = text(&get_impl(&host, params).await.unwrap());
        assert_eq!(output["generation"], "cacheAssets-v1");
        assert_eq!(output["entry"]["status"], 200);
        assert_eq!(output["body"], "{}");
    }

    #[tokio::test]
    async fn test_get_from_deleted_generation() {
        let (host, _db, _network) = registered_host().await;
        let params = CacheGetParams { url: "/".into(), generation: Some("cacheAssets-v0".into()) };

        assert!(get_impl(&host, params).await.is_err());
    }
}
