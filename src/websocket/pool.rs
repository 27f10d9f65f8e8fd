use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;
use tracing::info;

struct ActiveConnection {
    id: Uuid,
    handle: JoinHandle<()>,
}

/// Live controller connections, one per conversation.
#[derive(Default)]
pub struct ConnectionPool {
    connections: Arc<RwLock<HashMap<String, ActiveConnection>>>,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns the task serving `conversation_id` and registers it. An older
    /// connection for the same conversation is aborted and replaced.
    pub async fn spawn<F, Fut>(&self, conversation_id: &str, task: F) -> Uuid
    where
        F: FnOnce(Uuid) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut connections = self.connections.write().await;
        let id = Uuid::new_v4();
        // The write lock is held until insertion, so the task cannot
        // deregister itself before it is registered.
        let handle = tokio::spawn(task(id));

        let connection = ActiveConnection { id, handle };
        if let Some(previous) = connections.insert(conversation_id.to_string(), connection) {
            previous.handle.abort();
            info!("Replaced connection {} for conversation {}", previous.id, conversation_id);
        } else {
            info!("Added connection {} for conversation {}", id, conversation_id);
        }
        id
    }

    /// Deregisters a connection if it is still the current one for its conversation.
    pub async fn remove(&self, conversation_id: &str, id: Uuid) -> bool {
        let mut connections = self.connections.write().await;
        let is_current = connections
            .get(conversation_id)
            .map(|c| c.id == id)
            .unwrap_or(false);

        if is_current {
            connections.remove(conversation_id);
            info!("Removed connection {} for conversation {}", id, conversation_id);
        }
        is_current
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Conversations with a live connection, sorted.
    pub async fn conversation_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.connections.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Aborts every connection task.
    pub async fn shutdown(&self) {
        let mut connections = self.connections.write().await;
        for (conversation_id, connection) in connections.drain() {
            connection.handle.abort();
            info!("Closed connection {} for conversation {}", connection.id, conversation_id);
        }
    }
}
