//! Signals a worker reacts to and the table that routes them.

use std::collections::HashMap;
use std::fmt;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use encore_core::{Error, Request};

use super::intercept::Intercepted;
use super::lifecycle::{ActivationReport, InstallReport};
use super::notify::{Notification, NotificationChoice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Install,
    Activate,
    Fetch,
    Message,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalKind::Install => "install",
            SignalKind::Activate => "activate",
            SignalKind::Fetch => "fetch",
            SignalKind::Message => "message",
        };
        f.write_str(name)
    }
}

/// Message a page posts to its controlling worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageMessage {
    ShowNotification { title: String, body: String },
    NotificationAction { tag: String, action: String },
}

#[derive(Debug, Clone)]
pub enum Signal {
    Install,
    Activate,
    Fetch(Request),
    Message(PageMessage),
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::Install => SignalKind::Install,
            Signal::Activate => SignalKind::Activate,
            Signal::Fetch(_) => SignalKind::Fetch,
            Signal::Message(_) => SignalKind::Message,
        }
    }
}

/// Reply to a [`PageMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageReply {
    Shown(Notification),
    Relayed(NotificationChoice),
}

#[derive(Debug)]
pub enum Outcome {
    Installed(InstallReport),
    Activated(ActivationReport),
    Fetched(Intercepted),
    Message(MessageReply),
}

pub type Handler = Box<dyn Fn(Signal) -> BoxFuture<'static, Result<Outcome, Error>> + Send + Sync>;

/// Routes each signal to the handler registered for its kind.
#[derive(Default)]
pub struct DispatchTable {
    handlers: HashMap<SignalKind, Handler>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, replacing any previous one.
    pub fn on<F>(&mut self, kind: SignalKind, handler: F)
    where
        F: Fn(Signal) -> BoxFuture<'static, Result<Outcome, Error>> + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
    }

    pub fn dispatch(&self, signal: Signal) -> BoxFuture<'static, Result<Outcome, Error>> {
        let kind = signal.kind();
        match self.handlers.get(&kind) {
            Some(handler) => handler(signal),
            None => Box::pin(async move { Err(Error::NoHandler(kind.to_string())) }),
        }
    }

    pub fn kinds(&self) -> Vec<SignalKind> {
        let mut kinds: Vec<SignalKind> = self.handlers.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable").field("kinds", &self.kinds()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    #[tokio::test]
    async fn test_missing_handler_is_no_handler() {
        let table = DispatchTable::new();
        let result = table.dispatch(Signal::Install).await;
        assert!(matches!(result, Err(Error::NoHandler(kind)) if kind == "install"));
    }

    #[tokio::test]
    async fn test_registered_handler_runs() {
        let mut table = DispatchTable::new();
        table.on(SignalKind::Message, |signal| {
            async move {
                match signal {
                    Signal::Message(PageMessage::NotificationAction { tag, action }) => {
                        Ok(Outcome::Message(MessageReply::Relayed(NotificationChoice { tag, action })))
                    }
                    other => Err(Error::InvalidInput(format!("unexpected {}", other.kind()))),
                }
            }
            .boxed()
        });

        assert_eq!(table.kinds(), vec![SignalKind::Message]);
        let outcome = table
            .dispatch(Signal::Message(PageMessage::NotificationAction {
                tag: "encore-1".into(),
                action: "agree".into(),
            }))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Message(MessageReply::Relayed(c)) if c.action == "agree"));
    }

    #[test]
    fn test_page_message_wire_format() {
        let msg: PageMessage =
            serde_json::from_str(r#"{"type":"show_notification","title":"Hi","body":"There"}"#).unwrap();
        assert_eq!(msg, PageMessage::ShowNotification { title: "Hi".into(), body: "There".into() });
    }
}
