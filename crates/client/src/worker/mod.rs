//! The background worker.
//!
//! ```text
//!   register ──► install ──► installed ──► activate ──► active
//!                  │  (cache static assets)      (claim pages, purge
//!                  │                              stale generations)
//!                  ▼
//!              installing (on failure; previous worker stays active)
//!
//!   page fetch ──► ServiceHost ──► active Worker ──► FetchInterceptor
//!                                                     ├─ bypass: network only
//!                                                     └─ cache + network, SWR
//! ```
//!
//! Signals reach a worker through its [`DispatchTable`]; the [`ServiceHost`]
//! owns registration, open pages and the event channel.

pub mod clients;
pub mod host;
pub mod intercept;
pub mod lifecycle;
pub mod notify;
pub mod service;
pub mod signal;
pub mod state;

pub use clients::{Client, ClientId, Clients};
pub use host::{HostEvent, HostStatus, ServiceHost, WorkerSummary};
pub use intercept::{FetchInterceptor, Intercepted, ResponseSource, should_bypass};
pub use lifecycle::{ActivationReport, InstallReport, LifecycleController, WorkerConfig};
pub use notify::{ACTION_AGREE, ACTION_DISAGREE, Notification, NotificationAction, NotificationChoice, Notifier, Permission};
pub use service::Worker;
pub use signal::{DispatchTable, Handler, MessageReply, Outcome, PageMessage, Signal, SignalKind};
pub use state::{WorkerId, WorkerState};
