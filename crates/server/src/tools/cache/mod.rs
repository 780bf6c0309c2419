//! Cache-related MCP tools.
//!
//! This module provides read access to the worker's cache generations.

pub mod get;
pub mod list;

pub use get::{CacheGetParams, get_impl};
pub use list::{CacheListParams, list_impl};

use encore_client::ServiceHost;
use encore_core::{CACHE_VERSION, generation_name};

/// Generation a cache tool reads: the requested one, else the active
/// worker's, else the compiled-in version's.
async fn target_generation(host: &ServiceHost, requested: Option<String>) -> String {
    if let Some(name) = requested.filter(|n| !n.trim().is_empty()) {
        return name;
    }
    match host.active().await {
        Some(worker) => worker.generation().to_string(),
        None => generation_name(CACHE_VERSION),
    }
}
