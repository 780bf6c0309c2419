//! Notification tools.
//!
//! Permission is asked for once; showing and answering a notification are page
//! messages delivered to the active worker.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use encore_client::worker::{MessageReply, Permission};
use encore_client::{PageMessage, ServiceHost};

use super::json_result;

/// Parameters for the notify_show tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotifyShowParams {
    pub title: String,
    pub body: String,
}

/// Parameters for the notify_respond tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotifyRespondParams {
    /// Tag of the notification being answered.
    pub tag: String,
    /// "agree" or "disagree".
    pub action: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotifyPermissionOutput {
    pub permission: Permission,
}

pub async fn permission_impl(host: &ServiceHost) -> Result<CallToolResult, McpError> {
    let permission = host.request_notification_permission().await;
    json_result(&NotifyPermissionOutput { permission })
}

pub async fn show_impl(host: &ServiceHost, params: NotifyShowParams) -> Result<CallToolResult, McpError> {
    let reply = host
        .post_message(PageMessage::ShowNotification { title: params.title, body: params.body })
        .await?;
    json_result(&reply)
}

pub async fn respond_impl(host: &ServiceHost, params: NotifyRespondParams) -> Result<CallToolResult, McpError> {
    let reply = host
        .post_message(PageMessage::NotificationAction { tag: params.tag, action: params.action })
        .await?;
    if let MessageReply::Relayed(choice) = &reply {
        tracing::info!(tag = %choice.tag, action = %choice.action, "notification answered");
    }
    json_result(&reply)
}
