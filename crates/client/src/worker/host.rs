//! The host: registration slots, open pages, and signal delivery.
//!
//! Registration runs install then activate on the new worker and retires the
//! previous active one. Only one registration runs at a time. The slot lock
//! is held only to swap workers in and out, never across a signal.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock, mpsc};
use url::Url;

use encore_core::{Database, Error, Network, Request};

use super::clients::{ClientId, Clients};
use super::intercept::Intercepted;
use super::lifecycle::WorkerConfig;
use super::notify::{Notification, NotificationChoice, Notifier, Permission};
use super::service::Worker;
use super::signal::{MessageReply, PageMessage, Signal};
use super::state::{WorkerId, WorkerState};

/// Events the host publishes to whoever drives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    StateChanged { worker: WorkerId, state: WorkerState },
    Notification(Notification),
    NotificationChoice(NotificationChoice),
}

#[derive(Default)]
struct Slots {
    installing: Option<Arc<Worker>>,
    waiting: Option<Arc<Worker>>,
    active: Option<Arc<Worker>>,
}

/// Summary of one worker for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerSummary {
    pub id: WorkerId,
    pub version: String,
    pub generation: String,
    pub state: WorkerState,
}

impl WorkerSummary {
    fn of(worker: &Worker) -> Self {
        Self {
            id: worker.id(),
            version: worker.version().to_string(),
            generation: worker.generation().to_string(),
            state: worker.state(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostStatus {
    pub scope: String,
    pub installing: Option<WorkerSummary>,
    pub waiting: Option<WorkerSummary>,
    pub active: Option<WorkerSummary>,
    pub clients: usize,
}

pub struct ServiceHost {
    scope: Url,
    db: Database,
    network: Arc<dyn Network>,
    clients: Arc<Clients>,
    notifier: Arc<Notifier>,
    events: mpsc::UnboundedSender<HostEvent>,
    slots: RwLock<Slots>,
    update: Mutex<()>,
}

impl ServiceHost {
    pub fn new(
        scope: Url, db: Database, network: Arc<dyn Network>, notifications_enabled: bool,
    ) -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let notifier = Arc::new(Notifier::new(notifications_enabled, events.clone()));
        let host = Self {
            scope,
            db,
            network,
            clients: Arc::new(Clients::new()),
            notifier,
            events,
            slots: RwLock::new(Slots::default()),
            update: Mutex::new(()),
        };
        (host, rx)
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    /// Build a worker bound to this host's storage, network and pages.
    pub fn worker(&self, config: WorkerConfig) -> Worker {
        Worker::new(
            config,
            self.db.clone(),
            Arc::clone(&self.network),
            Arc::clone(&self.clients),
            Arc::clone(&self.notifier),
        )
    }

    fn emit_state(&self, worker: &Worker) {
        let _ = self.events.send(HostEvent::StateChanged { worker: worker.id(), state: worker.state() });
    }

    /// Register `worker`: install it, then activate it in place of the
    /// current active worker. Failures are logged and leave the previous
    /// active worker in charge. Returns the worker's resulting state.
    pub async fn register(&self, worker: Worker) -> WorkerState {
        let _update = self.update.lock().await;
        let worker = Arc::new(worker);
        tracing::info!(worker = %worker.id(), generation = worker.generation(), "registering worker");

        self.slots.write().await.installing = Some(Arc::clone(&worker));
        let installed = worker.dispatch(Signal::Install).await;
        self.emit_state(&worker);

        {
            let mut slots = self.slots.write().await;
            slots.installing = None;
            if let Err(e) = installed {
                tracing::warn!(worker = %worker.id(), "registration failed during install: {}", e);
                return worker.state();
            }
            slots.waiting = Some(Arc::clone(&worker));
        }

        let activated = worker.dispatch(Signal::Activate).await;
        self.emit_state(&worker);

        let previous = {
            let mut slots = self.slots.write().await;
            slots.waiting = None;
            if let Err(e) = activated {
                tracing::warn!(worker = %worker.id(), "registration failed during activate: {}", e);
                return worker.state();
            }
            slots.active.replace(Arc::clone(&worker))
        };

        if let Some(previous) = previous {
            previous.lifecycle().mark_redundant();
            self.emit_state(&previous);
        }

        worker.state()
    }

    pub async fn active(&self) -> Option<Arc<Worker>> {
        self.slots.read().await.active.clone()
    }

    pub async fn status(&self) -> HostStatus {
        let slots = self.slots.read().await;
        HostStatus {
            scope: self.scope.to_string(),
            installing: slots.installing.as_deref().map(WorkerSummary::of),
            waiting: slots.waiting.as_deref().map(WorkerSummary::of),
            active: slots.active.as_deref().map(WorkerSummary::of),
            clients: self.clients.len().await,
        }
    }

    /// Route a page request through the active worker, or straight to the
    /// network when there is none.
    pub async fn fetch(&self, request: Request) -> Result<Intercepted, Error> {
        match self.active().await {
            Some(worker) => self.route(worker, request).await,
            None => self.fetch_direct(request).await,
        }
    }

    /// Send a fetch to `worker`. If a registration retired it in the meantime,
    /// the request goes to whichever worker is active now.
    async fn route(&self, worker: Arc<Worker>, request: Request) -> Result<Intercepted, Error> {
        if worker.state().can_intercept_fetch() {
            match worker.fetch(request.clone()).await {
                Err(Error::InvalidState(_)) if worker.state().is_terminal() => {}
                other => return other,
            }
        }

        tracing::debug!(worker = %worker.id(), "worker retired mid-fetch, rerouting {}", request.url);
        match self.active().await {
            Some(current) if current.id() != worker.id() => current.fetch(request).await,
            _ => self.fetch_direct(request).await,
        }
    }

    async fn fetch_direct(&self, request: Request) -> Result<Intercepted, Error> {
        tracing::debug!("no active worker, fetching {} directly", request.url);
        let response = self.network.fetch(&request).await?;
        Ok(Intercepted::bypass(response))
    }

    /// Deliver a page message to the active worker.
    pub async fn post_message(&self, message: PageMessage) -> Result<MessageReply, Error> {
        let worker = self.active().await.ok_or(Error::NoActiveWorker)?;
        worker.message(message).await
    }

    pub async fn notification_permission(&self) -> Permission {
        self.notifier.permission().await
    }

    pub async fn request_notification_permission(&self) -> Permission {
        self.notifier.request_permission().await
    }

    /// Open a page. It is controlled by the active worker from the start.
    pub async fn open_client(&self, url: &Url) -> ClientId {
        let controller = self.active().await.map(|w| w.id());
        self.clients.open(url, controller).await
    }

    pub async fn close_client(&self, id: ClientId) -> bool {
        self.clients.close(id).await.is_some()
    }
}
