pub mod api;
pub mod config;
pub mod conversation;
pub mod error;
pub mod messages;
pub mod session;
pub mod watson;
pub mod websocket;

use std::sync::Arc;
use actix_web::{web, HttpResponse};

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use conversation::{Conversation, ConversationOptions, MessageSource, ReplySink};
pub use messages::{IncomingMessage, MessageType, OutgoingMessage};
pub use session::SessionRegistry;
pub use watson::{AssistantService, WatsonClient};
pub use websocket::ControllerClient;

/// Health check endpoint handler
/// Reports how many conversations are connected and how many sessions exist
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let conversations = state.controller.pool().conversation_ids().await;
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "active_conversations": conversations.len(),
        "conversations": conversations,
        "sessions": state.sessions.len().await,
    }))
}

/// Application state shared across all components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub sessions: Arc<SessionRegistry>,
    pub controller: Arc<ControllerClient>,
}

impl AppState {
    pub fn new(config: Settings) -> Result<Self> {
        let assistant = WatsonClient::new(&config.watson)?;
        Ok(Self::with_assistant(config, Arc::new(assistant)))
    }

    /// Builds the state around any assistant implementation.
    pub fn with_assistant(config: Settings, assistant: Arc<dyn AssistantService>) -> Self {
        let sessions = Arc::new(SessionRegistry::new(assistant));
        let controller = Arc::new(ControllerClient::new(
            config.controller.ws_url.clone(),
            ConversationOptions::from(&config),
            sessions.clone(),
        ));

        Self {
            config: Arc::new(config),
            sessions,
            controller,
        }
    }

    /// Conversation handle for the direct (non-socket) path. Session state
    /// lives in the shared registry, so handles are cheap and short-lived.
    pub fn conversation(&self, conversation_id: &str) -> Conversation {
        Conversation::new(
            conversation_id,
            self.sessions.clone(),
            ConversationOptions::from(self.config.as_ref()),
        )
    }

    pub async fn shutdown(&self) -> Result<()> {
        let pool = self.controller.pool();
        tracing::info!("Closing {} controller connections", pool.connection_count().await);
        pool.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watson::MockAssistantService;

    #[test]
    fn test_app_state_creation() {
        let config = Settings::new_for_test().expect("Failed to load test config");
        let state = AppState::new(config);
        assert!(state.is_ok());
    }

    #[test]
    fn test_app_state_clone() {
        let config = Settings::new_for_test().expect("Failed to load test config");
        let state = AppState::with_assistant(config, Arc::new(MockAssistantService::new()));

        let cloned = state.clone();

        assert!(Arc::ptr_eq(&state.config, &cloned.config));
        assert!(Arc::ptr_eq(&state.sessions, &cloned.sessions));
        assert!(Arc::ptr_eq(&state.controller.sessions(), &state.sessions));
    }
}
