use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{AppError, WebSocketError};
use crate::messages::{IncomingMessage, OutgoingMessage};

/// Where a conversation's incoming messages come from.
#[async_trait]
pub trait MessageSource: Send {
    /// Next incoming message; `None` once the transport is closed. An `Err`
    /// item is a single bad frame, and the source stays usable.
    async fn next_message(&mut self) -> Option<Result<IncomingMessage, AppError>>;
}

/// Where a conversation's replies go.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, message: OutgoingMessage) -> Result<(), AppError>;
}

#[async_trait]
impl MessageSource for mpsc::UnboundedReceiver<IncomingMessage> {
    async fn next_message(&mut self) -> Option<Result<IncomingMessage, AppError>> {
        self.recv().await.map(Ok)
    }
}

#[async_trait]
impl ReplySink for mpsc::UnboundedSender<OutgoingMessage> {
    async fn send(&self, message: OutgoingMessage) -> Result<(), AppError> {
        mpsc::UnboundedSender::send(self, message)
            .map_err(|e| WebSocketError::SendError(e.to_string()))?;
        Ok(())
    }
}
