//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheGetParams, CacheListParams};
use crate::tools::notify::{NotifyRespondParams, NotifyShowParams};
use crate::tools::songs::{SongIdParams, SongsCreateParams, SongsUpdateParams};
use crate::tools::worker::{WorkerFetchParams, WorkerUpdateParams};
use crate::tools::{cache, notify, songs, worker};

use encore_client::ServiceHost;
use encore_core::{AppConfig, Database};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for encore.
#[derive(Clone)]
pub struct EncoreServer {
    config: Arc<AppConfig>,
    db: Database,
    host: Arc<ServiceHost>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl EncoreServer {
    /// Create a new server handler around a registered host.
    pub fn new(config: AppConfig, db: Database, host: Arc<ServiceHost>) -> Self {
        Self { config: Arc::new(config), db, host, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Fetch a URL as a page under the worker's scope. GET requests are served stale-while-revalidate from the cache; other methods go straight to the network."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        worker::fetch_impl(&self.host, params.0).await
    }

    #[tool(description = "Report the installing, waiting and active workers and the cache generations in storage.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        worker::status_impl(&self.host).await
    }

    /// Deploy a worker with a new cache version.
    ///
    /// Install and activation failures leave the current worker in charge and
    /// are reported through the returned state.
    #[tool(
        description = "Register a new worker for the given cache version. On success the previous generation is deleted."
    )]
    async fn worker_update(&self, params: Parameters<WorkerUpdateParams>) -> Result<CallToolResult, McpError> {
        worker::update_impl(&self.host, &self.config, params.0).await
    }

    #[tool(description = "List cache generations and the entries of one generation (default: the active one).")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        cache::list_impl(&self.host, params.0).await
    }

    #[tool(description = "Get a cached response by URL without touching the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        cache::get_impl(&self.host, params.0).await
    }

    #[tool(description = "Add a song with a title and an artist.")]
    async fn songs_create(&self, params: Parameters<SongsCreateParams>) -> Result<CallToolResult, McpError> {
        songs::create_impl(&self.db, params.0).await
    }

    #[tool(description = "List songs in the order they were added.")]
    async fn songs_list(&self) -> Result<CallToolResult, McpError> {
        songs::list_impl(&self.db).await
    }

    #[tool(description = "Update a song's title, artist or like count.")]
    async fn songs_update(&self, params: Parameters<SongsUpdateParams>) -> Result<CallToolResult, McpError> {
        songs::update_impl(&self.db, params.0).await
    }

    #[tool(description = "Like a song, incrementing its like count.")]
    async fn songs_like(&self, params: Parameters<SongIdParams>) -> Result<CallToolResult, McpError> {
        songs::like_impl(&self.db, params.0).await
    }

    #[tool(description = "Delete a song by id.")]
    async fn songs_delete(&self, params: Parameters<SongIdParams>) -> Result<CallToolResult, McpError> {
        songs::delete_impl(&self.db, params.0).await
    }

    #[tool(description = "Ask for notification permission. The first request decides.")]
    async fn notify_permission(&self) -> Result<CallToolResult, McpError> {
        notify::permission_impl(&self.host).await
    }

    #[tool(description = "Show a notification with agree/disagree actions through the active worker.")]
    async fn notify_show(&self, params: Parameters<NotifyShowParams>) -> Result<CallToolResult, McpError> {
        notify::show_impl(&self.host, params.0).await
    }

    #[tool(description = "Answer a notification with 'agree' or 'disagree'; the choice is relayed to all pages.")]
    async fn notify_respond(&self, params: Parameters<NotifyRespondParams>) -> Result<CallToolResult, McpError> {
        notify::respond_impl(&self.host, params.0).await
    }
}

impl ServerHandler for EncoreServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "encore".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(format!("Offline-first playlist worker for {}", self.host.scope())),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
