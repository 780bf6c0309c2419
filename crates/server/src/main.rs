//! encore server entry point.
//!
//! Boots configuration, storage and the worker host, registers the worker at
//! the origin root, then serves MCP on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use encore_client::fetch::{FetchConfig, HttpNetwork, parse_origin};
use encore_client::{HostEvent, ServiceHost, WorkerConfig};
use encore_core::{AppConfig, CACHE_VERSION, Database};

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, db = %config.db_path.display(), "Starting encore server on stdio transport");

    let db = Database::open(&config.db_path).await?;
    let network = Arc::new(HttpNetwork::new(FetchConfig::from(&config))?);
    let scope = parse_origin(&config.origin)?;

    let (host, events) = ServiceHost::new(scope, db.clone(), network, config.notifications_enabled);
    let host = Arc::new(host);
    tokio::spawn(log_events(events));

    // The app shell page the worker controls once it claims.
    host.open_client(host.scope()).await;

    match WorkerConfig::from_app(&config, CACHE_VERSION) {
        Ok(worker) => {
            let state = host.register(host.worker(worker)).await;
            tracing::info!(%state, "worker registration finished");
        }
        Err(e) => tracing::warn!("worker registration skipped: {}", e),
    }

    let handler = handler::EncoreServer::new(config, db.clone(), host);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    db.close().await?;

    Ok(())
}

async fn log_events(mut events: mpsc::UnboundedReceiver<HostEvent>) {
    while let Some(event) = events.recv().await {
        match &event {
            HostEvent::StateChanged { worker, state } => tracing::info!(%worker, %state, "worker state"),
            HostEvent::Notification(n) => tracing::info!(tag = %n.tag, title = %n.title, "notification shown"),
            HostEvent::NotificationChoice(c) => {
                tracing::info!(tag = %c.tag, action = %c.action, "notification choice relayed to clients")
            }
        }
    }
}
