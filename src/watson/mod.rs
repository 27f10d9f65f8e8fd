//! Watson Assistant v2 integration
//!
//! [`AssistantService`] is the seam the rest of the bridge talks to;
//! [`WatsonClient`] is the real implementation over the REST API,
//! authenticated with IBM Cloud IAM tokens.

mod client;
mod iam;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AssistantError;

pub use client::WatsonClient;
pub use iam::IamTokenManager;

/// User id reported to Watson for every conversation in development mode.
pub const DEVELOPMENT_USER_ID: &str = "DEVELOPMENT";

/// Watson `user_id` for a conversation.
pub fn user_id_for(conversation_id: &str, dev_environment: bool) -> String {
    if dev_environment {
        DEVELOPMENT_USER_ID.to_string()
    } else {
        format!("blab_conv_{}", conversation_id)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssistantService: Send + Sync {
    /// Opens a new assistant session and returns its id.
    async fn create_session(&self) -> Result<String, AssistantError>;

    /// Sends user text within a session; returns the raw `output.generic` items.
    async fn message(
        &self,
        session_id: &str,
        text: &str,
        user_id: &str,
    ) -> Result<Vec<Value>, AssistantError>;
}

#[derive(Debug, Serialize)]
pub struct MessageInput<'a> {
    pub message_type: &'static str,
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub struct MessageRequest<'a> {
    pub input: MessageInput<'a>,
    pub user_id: &'a str,
}

impl<'a> MessageRequest<'a> {
    pub fn text(text: &'a str, user_id: &'a str) -> Self {
        Self {
            input: MessageInput {
                message_type: "text",
                text,
            },
            user_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageOutput {
    #[serde(default)]
    pub generic: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    pub output: MessageOutput,
}
