//! cache_list tool implementation.
//!
//! Lists the cache generations in storage and the entries of one of them.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use encore_client::ServiceHost;
use encore_core::CachedEntry;

use super::target_generation;
use crate::tools::json_result;

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// Generation to list (default: the active worker's).
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    /// All generations in storage.
    pub generations: Vec<String>,
    /// The generation whose entries are listed.
    pub generation: String,
    pub entries: Vec<CachedEntry>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(host: &ServiceHost, params: CacheListParams) -> Result<CallToolResult, McpError> {
    let db = host.database();
    let generations = db.generations().await?;
    let generation = target_generation(host, params.generation).await;

    let entries = db.generation(&generation).keys().await?;

    let output = CacheListOutput { generations: generations.into_iter().collect(), generation, entries };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{host, registered_host, text};

    #[tokio::test]
    async fn test_list_active_generation() {
        let (host, _db, _network) = registered_host().await;

        let output = text(&list_impl(&host, CacheListParams::default()).await.unwrap());
        assert_eq!(output["generation"], "cacheAssets-v1");
        let urls: Vec<&str> = output["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["url"].as_str().unwrap())
            .collect();
        assert_eq!(
            urls,
            vec!["http://localhost:8080/", "http://localhost:8080/index.html", "http://localhost:8080/manifest.json"]
        );
    }

    #[tokio::test]
    async fn test_list_unknown_generation_is_empty() {
        let (host, db, _network) = host().await;

        let params = CacheListParams { generation: Some("cacheAssets-v9".into()) };
        let output = text(&list_impl(&host, params).await.unwrap());
        assert_eq!(output["entries"].as_array().unwrap().len(), 0);
        assert!(!db.has_generation("cacheAssets-v9").await.unwrap());
    }
}
