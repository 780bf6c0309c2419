//! Open pages (clients) and which worker controls each.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;

use super::state::WorkerId;

/// Identifier of an open page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(u64);

/// An open page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Client {
    pub id: ClientId,
    pub url: String,
    pub controller: Option<WorkerId>,
}

/// Registry of open pages.
///
/// Uses a HashMap with tokio RwLock for concurrent access.
#[derive(Debug, Default)]
pub struct Clients {
    pages: RwLock<HashMap<ClientId, Client>>,
    next_id: AtomicU64,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly opened page, optionally already controlled.
    pub async fn open(&self, url: &Url, controller: Option<WorkerId>) -> ClientId {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let client = Client { id, url: url.to_string(), controller };
        self.pages.write().await.insert(id, client);
        id
    }

    pub async fn close(&self, id: ClientId) -> Option<Client> {
        self.pages.write().await.remove(&id)
    }

    pub async fn get(&self, id: ClientId) -> Option<Client> {
        self.pages.read().await.get(&id).cloned()
    }

    /// All open pages, oldest first.
    pub async fn list(&self) -> Vec<Client> {
        let mut clients: Vec<Client> = self.pages.read().await.values().cloned().collect();
        clients.sort_by_key(|c| c.id);
        clients
    }

    pub async fn len(&self) -> usize {
        self.pages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pages.read().await.is_empty()
    }

    pub async fn controlled_by(&self, worker: WorkerId) -> usize {
        self.pages
            .read()
            .await
            .values()
            .filter(|c| c.controller == Some(worker))
            .count()
    }

    /// Make `worker` the controller of every page in `scope` it does not
    /// already control. Returns how many pages changed hands.
    pub async fn claim(&self, worker: WorkerId, scope: &Url) -> usize {
        let mut pages = self.pages.write().await;
        let mut claimed = 0;
        for client in pages.values_mut() {
            if client.controller != Some(worker) && client.url.starts_with(scope.as_str()) {
                client.controller = Some(worker);
                claimed += 1;
            }
        }
        claimed
    }
}
