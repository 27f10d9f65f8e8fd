use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::conversation::{Conversation, ConversationOptions};
use crate::messages::ConversationStart;
use crate::session::SessionRegistry;
use crate::websocket::connection;
use crate::websocket::ConnectionPool;

/// Opens and serves the bot's side of controller conversations.
pub struct ControllerClient {
    ws_url: String,
    options: ConversationOptions,
    sessions: Arc<SessionRegistry>,
    pool: Arc<ConnectionPool>,
}

impl ControllerClient {
    pub fn new(
        ws_url: impl Into<String>,
        options: ConversationOptions,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            ws_url: ws_url.into(),
            options,
            sessions,
            pool: Arc::new(ConnectionPool::new()),
        }
    }

    /// Starts serving a conversation in the background and returns the id of
    /// the new connection. Connection failures are logged, not returned: the
    /// controller's webhook call has already been answered by then.
    pub async fn open(self: &Arc<Self>, start: ConversationStart) -> Uuid {
        let client = self.clone();
        let conversation_id = start.conversation_id.clone();
        self.pool
            .spawn(&conversation_id, move |connection_id| client.serve(start, connection_id))
            .await
    }

    async fn serve(self: Arc<Self>, start: ConversationStart, connection_id: Uuid) {
        let conversation_id = start.conversation_id;

        match connection::connect(&self.ws_url, &conversation_id, &start.session).await {
            Ok((mut source, sink, writer)) => {
                let mut conversation =
                    Conversation::new(conversation_id.clone(), self.sessions.clone(), self.options);
                if let Err(e) = conversation.run(&mut source, &sink).await {
                    error!("Conversation {} stopped: {}", conversation_id, e);
                }

                // Dropping the last sender lets the writer flush and close.
                drop(sink);
                if let Err(e) = writer.await {
                    error!("Writer task for {} failed: {}", conversation_id, e);
                }
            }
            Err(e) => {
                error!("Failed to connect to controller for {}: {}", conversation_id, e);
            }
        }

        self.pool.remove(&conversation_id, connection_id).await;
        info!("Connection {} for conversation {} finished", connection_id, conversation_id);
    }

    pub fn pool(&self) -> Arc<ConnectionPool> {
        self.pool.clone()
    }

    pub fn sessions(&self) -> Arc<SessionRegistry> {
        self.sessions.clone()
    }
}
