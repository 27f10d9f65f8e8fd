//! Session registry
//!
//! Maps each controller conversation to the Watson session opened for it.
//! Sessions are created lazily and kept for the life of the process.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, warn};

use crate::error::AssistantError;
use crate::watson::AssistantService;

pub struct SessionRegistry {
    assistant: Arc<dyn AssistantService>,
    sessions: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl SessionRegistry {
    pub fn new(assistant: Arc<dyn AssistantService>) -> Self {
        Self {
            assistant,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn assistant(&self) -> &Arc<dyn AssistantService> {
        &self.assistant
    }

    /// Returns the session for `conversation_id`, opening one on first use.
    ///
    /// Concurrent callers for the same conversation share a single creation
    /// call. A failed creation leaves nothing cached, so the next call tries
    /// again.
    pub async fn get_or_create_session(
        &self,
        conversation_id: &str,
    ) -> Result<String, AssistantError> {
        let cell = {
            let mut sessions = self.sessions.lock().await;
            sessions
                .entry(conversation_id.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let session_id = cell
            .get_or_try_init(|| async {
                let session_id = self.assistant.create_session().await?;
                info!("Opened session {} for conversation {}", session_id, conversation_id);
                Ok::<_, AssistantError>(session_id)
            })
            .await?;

        Ok(session_id.clone())
    }

    pub async fn get(&self, conversation_id: &str) -> Option<String> {
        self.sessions
            .lock()
            .await
            .get(conversation_id)
            .and_then(|cell| cell.get().cloned())
    }

    /// Forgets the cached session, returning it if one was set.
    pub async fn invalidate(&self, conversation_id: &str) -> Option<String> {
        let removed = self
            .sessions
            .lock()
            .await
            .remove(conversation_id)
            .and_then(|cell| cell.get().cloned());
        if let Some(session_id) = &removed {
            warn!("Dropped session {} for conversation {}", session_id, conversation_id);
        }
        removed
    }

    /// Number of conversations with an established session.
    pub async fn len(&self) -> usize {
        self.sessions
            .lock()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
