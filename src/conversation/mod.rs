//! Conversation flow
//!
//! A [`Conversation`] binds one controller conversation to its assistant
//! session: it sends the bootstrap input that makes the assistant greet,
//! forwards human text, and turns the assistant's replies into controller
//! messages. Transports plug in through [`MessageSource`] and [`ReplySink`].

mod transport;

pub use transport::{MessageSource, ReplySink};

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{ExpiredSessionPolicy, Settings};
use crate::error::{AppError, AssistantError};
use crate::messages::{translate, IncomingMessage, MessageType, OutgoingMessage, ReplyBody};
use crate::session::SessionRegistry;
use crate::watson::user_id_for;

/// Input sent to the assistant when a conversation starts, so that it
/// answers with its greeting.
pub const BOOTSTRAP_TEXT: &str = " ";

#[derive(Debug, Clone, Copy)]
pub struct ConversationOptions {
    pub dev_environment: bool,
    pub on_expired: ExpiredSessionPolicy,
}

impl From<&Settings> for ConversationOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            dev_environment: settings.dev_environment,
            on_expired: settings.session.on_expired,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Uninitialized,
    Active,
}

pub struct Conversation {
    id: String,
    user_id: String,
    sessions: Arc<SessionRegistry>,
    on_expired: ExpiredSessionPolicy,
    state: ConversationState,
}

impl Conversation {
    pub fn new(
        id: impl Into<String>,
        sessions: Arc<SessionRegistry>,
        options: ConversationOptions,
    ) -> Self {
        let id = id.into();
        Self {
            user_id: user_id_for(&id, options.dev_environment),
            id,
            sessions,
            on_expired: options.on_expired,
            state: ConversationState::Uninitialized,
        }
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    /// Opens (or reuses) the assistant session and returns the greeting
    /// replies. Greetings quote nothing. Starting an active conversation
    /// returns no messages.
    pub async fn start(&mut self) -> Result<Vec<OutgoingMessage>, AppError> {
        if self.state == ConversationState::Active {
            return Ok(Vec::new());
        }

        self.sessions.get_or_create_session(&self.id).await?;
        self.state = ConversationState::Active;
        info!("Conversation {} started", self.id);

        let greeting = self.exchange(BOOTSTRAP_TEXT).await?;
        Ok(greeting.into_iter().map(OutgoingMessage::new).collect())
    }

    /// Answers one incoming message. Bot-authored, non-text and empty
    /// messages produce nothing and never reach the assistant.
    pub async fn answer(
        &mut self,
        message: &IncomingMessage,
    ) -> Result<Vec<OutgoingMessage>, AppError> {
        if !message.sent_by_human {
            debug!("Ignoring bot-authored message {} in {}", message.id, self.id);
            return Ok(Vec::new());
        }
        if message.message_type != MessageType::Text {
            debug!("Ignoring {:?} message {} in {}", message.message_type, message.id, self.id);
            return Ok(Vec::new());
        }
        if message.text.is_empty() {
            return Ok(Vec::new());
        }

        if self.state == ConversationState::Uninitialized {
            self.sessions.get_or_create_session(&self.id).await?;
            self.state = ConversationState::Active;
        }

        let replies = self.exchange(&message.text).await?;
        let mut outgoing: Vec<OutgoingMessage> =
            replies.into_iter().map(OutgoingMessage::new).collect();
        if let Some(first) = outgoing.first_mut() {
            if !message.id.is_empty() {
                first.quoted_message_id = Some(message.id.clone());
            }
        }
        Ok(outgoing)
    }

    /// Sends greetings, then answers every message from `source` until it
    /// closes. A failed answer is logged and the loop carries on; a failed
    /// send ends the run, since the transport is gone.
    pub async fn run<S, K>(&mut self, source: &mut S, sink: &K) -> Result<(), AppError>
    where
        S: MessageSource,
        K: ReplySink,
    {
        match self.start().await {
            Ok(greetings) => {
                for greeting in greetings {
                    sink.send(greeting).await?;
                }
            }
            Err(e) => error!("Failed to greet conversation {}: {}", self.id, e),
        }

        while let Some(next) = source.next_message().await {
            let message = match next {
                Ok(message) => message,
                Err(e) => {
                    warn!("Skipping unreadable frame in {}: {}", self.id, e);
                    continue;
                }
            };

            match self.answer(&message).await {
                Ok(replies) => {
                    for reply in replies {
                        sink.send(reply).await?;
                    }
                }
                Err(e) => error!("Failed to answer message {} in {}: {}", message.id, self.id, e),
            }
        }

        info!("Conversation {} closed", self.id);
        Ok(())
    }

    /// One round trip to the assistant, translated.
    async fn exchange(&self, text: &str) -> Result<Vec<ReplyBody>, AppError> {
        let session_id = self.sessions.get_or_create_session(&self.id).await?;
        let assistant = self.sessions.assistant();

        let items = match assistant.message(&session_id, text, &self.user_id).await {
            Err(AssistantError::SessionExpired(reason))
                if self.on_expired == ExpiredSessionPolicy::Recreate =>
            {
                warn!("Session for {} expired ({}), opening a new one", self.id, reason);
                self.sessions.invalidate(&self.id).await;
                let session_id = self.sessions.get_or_create_session(&self.id).await?;
                assistant.message(&session_id, text, &self.user_id).await?
            }
            other => other?,
        };

        let replies = items
            .iter()
            .map(translate)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(replies)
    }
}
