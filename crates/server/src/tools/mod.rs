//! MCP tool implementations.
//!
//! This module contains all tools exposed by the encore server.

pub mod cache;
pub mod notify;
pub mod songs;
pub mod worker;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use encore_core::Error;

/// Serialize a tool output as the pretty-printed text content of a result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use encore_client::{MemoryNetwork, ServiceHost, WorkerConfig};
    use encore_core::{AppConfig, CACHE_VERSION, Database, Response};
    use rmcp::model::CallToolResult;
    use url::Url;

    /// Host over an in-memory database and network serving the default
    /// static asset set.
    pub async fn host() -> (Arc<ServiceHost>, Database, Arc<MemoryNetwork>) {
        let db = Database::open_in_memory().await.unwrap();
        let network = Arc::new(MemoryNetwork::new());
        network.route("http://localhost:8080/", Response::ok("<html>shell</html>")).await;
        network.route("http://localhost:8080/index.html", Response::ok("<html>shell</html>")).await;
        network.route("http://localhost:8080/manifest.json", Response::ok("{}")).await;

        let (host, _events) =
            ServiceHost::new(Url::parse("http://localhost:8080/").unwrap(), db.clone(), network.clone(), true);
        (Arc::new(host), db, network)
    }

    pub async fn registered_host() -> (Arc<ServiceHost>, Database, Arc<MemoryNetwork>) {
        let (host, db, network) = host().await;
        let config = WorkerConfig::from_app(&AppConfig::default(), CACHE_VERSION).unwrap();
        host.register(host.worker(config)).await;
        (host, db, network)
    }

    pub fn text(result: &CallToolResult) -> serde_json::Value {
        let content = serde_json::to_value(&result.content[0]).unwrap();
        serde_json::from_str(content["text"].as_str().unwrap()).unwrap()
    }
}
