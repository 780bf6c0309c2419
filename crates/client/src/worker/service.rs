//! A worker instance: lifecycle, fetch policy and notifications behind one
//! dispatch table.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use encore_core::{Database, Error, Network, Request};

use super::clients::Clients;
use super::intercept::{FetchInterceptor, Intercepted};
use super::lifecycle::{LifecycleController, WorkerConfig};
use super::notify::Notifier;
use super::signal::{DispatchTable, MessageReply, Outcome, PageMessage, Signal, SignalKind};
use super::state::{WorkerId, WorkerState};

pub struct Worker {
    id: WorkerId,
    lifecycle: Arc<LifecycleController>,
    interceptor: Arc<FetchInterceptor>,
    notifier: Arc<Notifier>,
    table: DispatchTable,
}

impl Worker {
    pub(crate) fn new(
        config: WorkerConfig, db: Database, network: Arc<dyn Network>, clients: Arc<Clients>, notifier: Arc<Notifier>,
    ) -> Self {
        let id = WorkerId::next();
        let generation = config.generation();
        let lifecycle = Arc::new(LifecycleController::new(id, config, db.clone(), Arc::clone(&network), clients));
        let interceptor = Arc::new(FetchInterceptor::new(db, generation, network));

        let mut worker = Self { id, lifecycle, interceptor, notifier, table: DispatchTable::new() };
        worker.register_defaults();
        worker
    }

    fn register_defaults(&mut self) {
        let lifecycle = Arc::clone(&self.lifecycle);
        self.table.on(SignalKind::Install, move |_| {
            let lifecycle = Arc::clone(&lifecycle);
            async move { lifecycle.install().await.map(Outcome::Installed) }.boxed()
        });

        let lifecycle = Arc::clone(&self.lifecycle);
        self.table.on(SignalKind::Activate, move |_| {
            let lifecycle = Arc::clone(&lifecycle);
            async move { lifecycle.activate().await.map(Outcome::Activated) }.boxed()
        });

        let interceptor = Arc::clone(&self.interceptor);
        self.table.on(SignalKind::Fetch, move |signal| {
            let interceptor = Arc::clone(&interceptor);
            async move {
                match signal {
                    Signal::Fetch(request) => interceptor.handle(request).await.map(Outcome::Fetched),
                    other => Err(Error::InvalidInput(format!("fetch handler got {}", other.kind()))),
                }
            }
            .boxed()
        });

        let notifier = Arc::clone(&self.notifier);
        self.table.on(SignalKind::Message, move |signal| {
            let notifier = Arc::clone(&notifier);
            async move {
                match signal {
                    Signal::Message(PageMessage::ShowNotification { title, body }) => {
                        let shown = notifier.show(&title, &body).await?;
                        Ok(Outcome::Message(MessageReply::Shown(shown)))
                    }
                    Signal::Message(PageMessage::NotificationAction { tag, action }) => {
                        let choice = notifier.respond(&tag, &action)?;
                        Ok(Outcome::Message(MessageReply::Relayed(choice)))
                    }
                    other => Err(Error::InvalidInput(format!("message handler got {}", other.kind()))),
                }
            }
            .boxed()
        });
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    pub fn generation(&self) -> &str {
        self.lifecycle.generation()
    }

    pub fn version(&self) -> &str {
        &self.lifecycle.config().version
    }

    pub fn lifecycle(&self) -> &LifecycleController {
        &self.lifecycle
    }

    /// Replace the handler for `kind`.
    pub fn on<F>(&mut self, kind: SignalKind, handler: F)
    where
        F: Fn(Signal) -> BoxFuture<'static, Result<Outcome, Error>> + Send + Sync + 'static,
    {
        self.table.on(kind, handler);
    }

    pub fn handled_kinds(&self) -> Vec<SignalKind> {
        self.table.kinds()
    }

    pub async fn dispatch(&self, signal: Signal) -> Result<Outcome, Error> {
        tracing::trace!(worker = %self.id, kind = %signal.kind(), "dispatching signal");
        self.table.dispatch(signal).await
    }

    /// Dispatch a fetch signal. Only an active worker intercepts.
    pub async fn fetch(&self, request: Request) -> Result<Intercepted, Error> {
        let state = self.state();
        if !state.can_intercept_fetch() {
            return Err(Error::InvalidState(format!("{} cannot intercept fetches while {state}", self.id)));
        }
        match self.dispatch(Signal::Fetch(request)).await? {
            Outcome::Fetched(intercepted) => Ok(intercepted),
            other => Err(Error::InvalidState(format!("fetch handler returned {other:?}"))),
        }
    }

    pub async fn message(&self, message: PageMessage) -> Result<MessageReply, Error> {
        match self.dispatch(Signal::Message(message)).await? {
            Outcome::Message(reply) => Ok(reply),
            other => Err(Error::InvalidState(format!("message handler returned {other:?}"))),
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("generation", &self.generation())
            .field("state", &self.state())
            .field("table", &self.table)
            .finish()
    }
}
