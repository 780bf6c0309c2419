//! Worker tools: route a page fetch, report registration state, and deploy a
//! new cache version.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use encore_client::fetch::{content_type, resolve};
use encore_client::worker::{HostStatus, Permission};
use encore_client::{ResponseSource, ServiceHost, WorkerConfig, WorkerState};
use encore_core::{AppConfig, Error, Method, Request};

use super::json_result;

/// Input parameters for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// URL to fetch; relative paths resolve against the origin.
    pub url: String,

    /// HTTP method (default: GET). Anything but GET bypasses the cache.
    #[serde(default = "default_method")]
    pub method: String,

    /// Optional request body for bypassed requests.
    #[serde(default)]
    pub body: Option<String>,

    /// Wait for the background cache refresh before returning.
    #[serde(default)]
    pub wait_revalidation: bool,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the worker_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerFetchOutput {
    pub url: String,
    pub method: String,
    pub status: u16,
    pub content_type: Option<String>,
    /// Where the response came from: cache, network or bypass.
    pub source: ResponseSource,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Whether a background refresh was started.
    pub revalidating: bool,
    /// Whether the refresh rewrote the cache entry; only set when waited on.
    pub revalidated: Option<bool>,
}

pub async fn fetch_impl(host: &ServiceHost, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let method: Method = params.method.parse()?;
    let url = resolve(host.scope(), &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let mut request = Request::new(method.clone(), url);
    if let Some(body) = params.body {
        request = request.with_body(body);
    }
    let cache_url = request.cache_url();

    let mut intercepted = host.fetch(request).await?;
    let revalidating = intercepted.is_revalidating();
    let revalidated = if params.wait_revalidation { Some(intercepted.revalidated().await?) } else { None };

    let response = intercepted.response;
    let body = String::from_utf8_lossy(&response.body).to_string();
    let output = WorkerFetchOutput {
        url: cache_url,
        method: method.to_string(),
        status: response.status,
        content_type: content_type(&response).map(str::to_string),
        source: intercepted.source,
        headers: response.headers,
        body,
        revalidating,
        revalidated,
    };

    json_result(&output)
}

/// Output structure for the worker_status tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatusOutput {
    #[serde(flatten)]
    pub status: HostStatus,
    /// Cache generations currently in storage.
    pub generations: Vec<String>,
    pub notifications: Permission,
}

pub async fn status_impl(host: &ServiceHost) -> Result<CallToolResult, McpError> {
    let status = host.status().await;
    let generations = host.database().generations().await?.into_iter().collect();
    let notifications = host.notification_permission().await;
    json_result(&WorkerStatusOutput { status, generations, notifications })
}

/// Input parameters for the worker_update tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerUpdateParams {
    /// Cache version of the new worker, e.g. "2".
    pub version: String,
}

/// Output structure for the worker_update tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerUpdateOutput {
    pub version: String,
    pub generation: String,
    /// State the new worker reached.
    pub state: WorkerState,
    pub status: HostStatus,
}

pub async fn update_impl(
    host: &ServiceHost, config: &AppConfig, params: WorkerUpdateParams,
) -> Result<CallToolResult, McpError> {
    let version = params.version.trim();
    if version.is_empty() || !version.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-') {
        return Err(Error::InvalidInput(format!("invalid cache version: {:?}", params.version)).into());
    }

    let worker_config = WorkerConfig::from_app(config, version)?;
    let generation = worker_config.generation();
    let state = host.register(host.worker(worker_config)).await;

    let output = WorkerUpdateOutput { version: version.to_string(), generation, state, status: host.status().await };
    json_result(&output)
}
