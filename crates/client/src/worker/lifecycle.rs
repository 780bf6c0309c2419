//! Install and activate.
//!
//! Install caches the static asset set into the worker's generation and only
//! reports success once every asset is stored. Activate claims open pages and
//! deletes every generation except the worker's own.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::watch;
use url::Url;

use encore_core::{AppConfig, Database, Error, Network, Request, generation_name};

use super::clients::Clients;
use super::state::{WorkerId, WorkerState};
use crate::fetch::url::{parse_origin, resolve};

/// Per-worker settings.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Cache version compiled into this worker.
    pub version: String,
    /// Registration scope; also the base for relative asset paths.
    pub scope: Url,
    /// Static asset set, resolved against the scope.
    pub static_assets: Vec<Url>,
    /// Extra pre-population attempts after a failed install.
    pub install_retries: u32,
}

impl WorkerConfig {
    pub fn new(version: &str, scope: &str, static_assets: &[&str]) -> Result<Self, Error> {
        let scope = parse_origin(scope).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let static_assets = static_assets
            .iter()
            .map(|a| resolve(&scope, a).map_err(|e| Error::InvalidUrl(format!("{a}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { version: version.to_string(), scope, static_assets, install_retries: 0 })
    }

    /// Build from application configuration for the given cache version.
    pub fn from_app(config: &AppConfig, version: &str) -> Result<Self, Error> {
        let assets: Vec<&str> = config.static_assets.iter().map(String::as_str).collect();
        let mut worker = Self::new(version, &config.origin, &assets)?;
        worker.install_retries = config.install_retries;
        Ok(worker)
    }

    pub fn generation(&self) -> String {
        generation_name(&self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub generation: String,
    pub cached: usize,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub generation: String,
    pub claimed: usize,
    pub deleted: Vec<String>,
}

/// Drives one worker through install and activate.
pub struct LifecycleController {
    worker: WorkerId,
    config: WorkerConfig,
    generation: String,
    db: Database,
    network: Arc<dyn Network>,
    clients: Arc<Clients>,
    state: watch::Sender<WorkerState>,
    skip_waiting: AtomicBool,
}

impl LifecycleController {
    pub fn new(
        worker: WorkerId, config: WorkerConfig, db: Database, network: Arc<dyn Network>, clients: Arc<Clients>,
    ) -> Self {
        let (state, _) = watch::channel(WorkerState::Uninstalled);
        let generation = config.generation();
        Self { worker, config, generation, db, network, clients, state, skip_waiting: AtomicBool::new(false) }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    pub fn generation(&self) -> &str {
        &self.generation
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Whether install asked to activate without waiting for pages to close.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    fn transition(&self, next: WorkerState) {
        let prev = self.state.send_replace(next);
        tracing::info!(worker = %self.worker, from = %prev, to = %next, "worker state changed");
    }

    /// Install: cache the static asset set.
    ///
    /// Allowed from `Uninstalled`, or from `Installing` after a failed
    /// attempt. On failure the worker stays `Installing`.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        match self.state() {
            WorkerState::Uninstalled | WorkerState::Installing => {}
            other => return Err(Error::InvalidState(format!("cannot install from {other}"))),
        }

        self.skip_waiting.store(true, Ordering::SeqCst);
        self.transition(WorkerState::Installing);

        let cache = self.db.open_generation(&self.generation).await?;
        let requests: Vec<Request> = self.config.static_assets.iter().cloned().map(Request::get).collect();

        let mut attempts = 0;
        let cached = loop {
            attempts += 1;
            match cache.add_all(&*self.network, &requests).await {
                Ok(count) => break count,
                Err(e) if attempts <= self.config.install_retries => {
                    tracing::warn!(worker = %self.worker, attempt = attempts, "pre-population failed, retrying: {}", e);
                }
                Err(e) => {
                    tracing::warn!(worker = %self.worker, "install failed: {}", e);
                    return Err(e);
                }
            }
        };

        self.transition(WorkerState::Installed);
        Ok(InstallReport { generation: self.generation.clone(), cached, attempts })
    }

    /// Activate: claim pages and delete stale generations.
    ///
    /// Requires `Installed`. Failure to delete a stale generation is logged
    /// and left for the next activation.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let current = self.state();
        if current != WorkerState::Installed {
            return Err(Error::InvalidState(format!("cannot activate from {current}")));
        }

        self.transition(WorkerState::Activating);

        let claimed = self.clients.claim(self.worker, &self.config.scope).await;

        let mut deleted = Vec::new();
        match self.db.generations().await {
            Ok(names) => {
                for name in names.into_iter().filter(|n| *n != self.generation) {
                    match self.db.delete_generation(&name).await {
                        Ok(true) => deleted.push(name),
                        Ok(false) => {}
                        Err(e) => tracing::warn!(generation = %name, "failed to delete stale generation: {}", e),
                    }
                }
            }
            Err(e) => tracing::warn!("failed to list generations: {}", e),
        }

        if !deleted.is_empty() {
            tracing::info!(worker = %self.worker, ?deleted, "purged stale generations");
        }

        self.transition(WorkerState::Active);
        Ok(ActivationReport { generation: self.generation.clone(), claimed, deleted })
    }

    /// Retire this worker after a newer one activated.
    pub fn mark_redundant(&self) {
        if !self.state().is_terminal() {
            self.transition(WorkerState::Redundant);
        }
    }

    /// Wait until the worker is active. Returns false if it went redundant
    /// first.
    pub async fn ready(&self) -> bool {
        let mut rx = self.subscribe();
        match rx
            .wait_for(|s| matches!(s, WorkerState::Active | WorkerState::Redundant))
            .await
        {
            Ok(state) => *state == WorkerState::Active,
            Err(_) => false,
        }
    }
}
