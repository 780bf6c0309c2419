//! Notification permission and display.
//!
//! Pages ask for permission once, then message the active worker to show a
//! notification. Every notification carries the same `agree`/`disagree`
//! action pair; the user's choice comes back as a page message and is relayed
//! to all clients.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};

use encore_core::Error;

use super::host::HostEvent;

pub const ACTION_AGREE: &str = "agree";
pub const ACTION_DISAGREE: &str = "disagree";

/// Notification permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Not asked yet.
    #[default]
    Default,
    Granted,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// A notification shown by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub tag: String,
    pub title: String,
    pub body: String,
    pub actions: Vec<NotificationAction>,
    pub shown_at: String,
}

/// The user's answer to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChoice {
    pub tag: String,
    pub action: String,
}

fn default_actions() -> Vec<NotificationAction> {
    vec![
        NotificationAction { action: ACTION_AGREE.into(), title: "Agree".into() },
        NotificationAction { action: ACTION_DISAGREE.into(), title: "Disagree".into() },
    ]
}

/// Owns the permission decision and emits notifications on the host channel.
#[derive(Debug)]
pub struct Notifier {
    enabled: bool,
    permission: RwLock<Permission>,
    events: mpsc::UnboundedSender<HostEvent>,
    next_tag: AtomicU64,
}

impl Notifier {
    pub fn new(enabled: bool, events: mpsc::UnboundedSender<HostEvent>) -> Self {
        Self { enabled, permission: RwLock::new(Permission::Default), events, next_tag: AtomicU64::new(0) }
    }

    pub async fn permission(&self) -> Permission {
        *self.permission.read().await
    }

    /// Ask for permission. The first request decides; later requests return
    /// the recorded answer.
    pub async fn request_permission(&self) -> Permission {
        let mut permission = self.permission.write().await;
        if *permission == Permission::Default {
            *permission = if self.enabled { Permission::Granted } else { Permission::Denied };
            tracing::info!(permission = ?*permission, "notification permission decided");
        }
        *permission
    }

    /// Show a notification with the standard action pair.
    pub async fn show(&self, title: &str, body: &str) -> Result<Notification, Error> {
        let permission = self.permission().await;
        if permission != Permission::Granted {
            return Err(Error::PermissionDenied(format!("notification permission is {permission:?}")));
        }

        let title = title.trim();
        let body = body.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("notification title cannot be empty".into()));
        }
        if body.is_empty() {
            return Err(Error::InvalidInput("notification body cannot be empty".into()));
        }

        let tag = format!("encore-{}", self.next_tag.fetch_add(1, Ordering::Relaxed) + 1);
        let notification = Notification {
            tag,
            title: title.to_string(),
            body: body.to_string(),
            actions: default_actions(),
            shown_at: chrono::Utc::now().to_rfc3339(),
        };

        tracing::debug!(tag = %notification.tag, "showing notification");
        let _ = self.events.send(HostEvent::Notification(notification.clone()));
        Ok(notification)
    }

    /// Relay the user's action choice to every client.
    pub fn respond(&self, tag: &str, action: &str) -> Result<NotificationChoice, Error> {
        if tag.trim().is_empty() {
            return Err(Error::InvalidInput("notification tag cannot be empty".into()));
        }
        if action != ACTION_AGREE && action != ACTION_DISAGREE {
            return Err(Error::InvalidInput(format!("unknown notification action: {action}")));
        }

        let choice = NotificationChoice { tag: tag.to_string(), action: action.to_string() };
        let _ = self.events.send(HostEvent::NotificationChoice(choice.clone()));
        Ok(choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permission_decided_once() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let notifier = Notifier::new(true, tx);
        assert_eq!(notifier.permission().await, Permission::Default);
        assert_eq!(notifier.request_permission().await, Permission::Granted);
        assert_eq!(notifier.request_permission().await, Permission::Granted);
    }

    #[tokio::test]
    async fn test_show_requires_permission() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let notifier = Notifier::new(false, tx);

        let result = notifier.show("Hi", "There").await;
        assert!(matches!(result, Err(Error::PermissionDenied(_))));

        assert_eq!(notifier.request_permission().await, Permission::Denied);
        let result = notifier.show("Hi", "There").await;
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_show_emits_notification_with_actions() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = Notifier::new(true, tx);
        notifier.request_permission().await;

        let shown = notifier.show(" New song ", "Jolene was added").await.unwrap();
        assert_eq!(shown.title, "New song");
        let actions: Vec<&str> = shown.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec![ACTION_AGREE, ACTION_DISAGREE]);

        match rx.recv().await.unwrap() {
            HostEvent::Notification(n) => assert_eq!(n, shown),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_show_validates_fields() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let notifier = Notifier::new(true, tx);
        notifier.request_permission().await;

        assert!(matches!(notifier.show("", "body").await, Err(Error::InvalidInput(_))));
        assert!(matches!(notifier.show("title", "  ").await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_respond_relays_choice() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = Notifier::new(true, tx);

        let choice = notifier.respond("encore-1", ACTION_DISAGREE).unwrap();
        assert_eq!(choice.action, "disagree");
        assert!(matches!(rx.recv().await.unwrap(), HostEvent::NotificationChoice(c) if c == choice));

        assert!(matches!(notifier.respond("encore-1", "maybe"), Err(Error::InvalidInput(_))));
    }
}
