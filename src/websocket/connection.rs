use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::conversation::{MessageSource, ReplySink};
use crate::error::{AppError, WebSocketError};
use crate::messages::{ControllerEvent, IncomingMessage, OutgoingMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Address of the controller socket for one conversation.
pub fn conversation_url(ws_url: &str, conversation_id: &str) -> String {
    format!("{}/ws/chat/{}/", ws_url.trim_end_matches('/'), conversation_id)
}

/// Reading half of a controller connection.
pub struct SocketSource {
    conversation_id: String,
    stream: SplitStream<WsStream>,
}

/// Writing half of a controller connection. Frames are queued to a writer
/// task, so sending never waits on the socket.
#[derive(Clone)]
pub struct SocketSink {
    conversation_id: String,
    tx: mpsc::UnboundedSender<Message>,
}

/// Connects to the controller on behalf of the bot, authenticating with the
/// controller session cookie, and starts the writer task.
pub async fn connect(
    ws_url: &str,
    conversation_id: &str,
    session: &str,
) -> Result<(SocketSource, SocketSink, JoinHandle<()>), WebSocketError> {
    let url = conversation_url(ws_url, conversation_id);
    let mut request = url.as_str().into_client_request()?;
    let cookie = HeaderValue::from_str(&format!("sessionid={}", session))
        .map_err(|e| WebSocketError::ConnectionError(format!("Invalid session cookie: {}", e)))?;
    request.headers_mut().insert(COOKIE, cookie);

    let (ws_stream, _) = tokio_tungstenite::connect_async(request).await?;
    info!("Connected to controller at {}", url);

    let (ws_sink, stream) = ws_stream.split();
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_frames(conversation_id.to_string(), ws_sink, rx));

    Ok((
        SocketSource {
            conversation_id: conversation_id.to_string(),
            stream,
        },
        SocketSink {
            conversation_id: conversation_id.to_string(),
            tx,
        },
        writer,
    ))
}

/// Forwards queued frames to the socket until every sender is dropped.
async fn write_frames(
    conversation_id: String,
    mut ws_sink: SplitSink<WsStream, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = rx.recv().await {
        if let Err(e) = ws_sink.send(message).await {
            error!("Error sending to controller for {}: {}", conversation_id, e);
            break;
        }
    }

    if let Err(e) = ws_sink.close().await {
        debug!("Error closing controller socket for {}: {}", conversation_id, e);
    }
}

#[async_trait]
impl MessageSource for SocketSource {
    async fn next_message(&mut self) -> Option<Result<IncomingMessage, AppError>> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => match serde_json::from_str::<ControllerEvent>(&text) {
                    Ok(ControllerEvent { message: Some(message) }) => return Some(Ok(message)),
                    Ok(_) => debug!("Ignoring non-message event in {}", self.conversation_id),
                    Err(e) => {
                        return Some(Err(WebSocketError::InvalidFormat(e.to_string()).into()));
                    }
                },
                Ok(Message::Close(reason)) => {
                    info!("Controller closed {}: {:?}", self.conversation_id, reason);
                    return None;
                }
                Ok(Message::Binary(bin)) => {
                    warn!("Ignoring {} byte binary frame in {}", bin.len(), self.conversation_id);
                }
                // Pings are answered by tungstenite itself.
                Ok(_) => {}
                Err(e) => {
                    error!("Error receiving from controller for {}: {}", self.conversation_id, e);
                    return None;
                }
            }
        }
        None
    }
}

#[async_trait]
impl ReplySink for SocketSink {
    async fn send(&self, message: OutgoingMessage) -> Result<(), AppError> {
        let text = serde_json::to_string(&message).map_err(|e| {
            WebSocketError::InvalidFormat(format!("Failed to serialize message: {}", e))
        })?;

        self.tx
            .send(Message::Text(text))
            .map_err(|e| WebSocketError::SendError(format!("{} ({})", e, self.conversation_id)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_url() {
        assert_eq!(
            conversation_url("ws://localhost:8000", "abc"),
            "ws://localhost:8000/ws/chat/abc/"
        );
        assert_eq!(
            conversation_url("wss://blab.example.org/", "abc"),
            "wss://blab.example.org/ws/chat/abc/"
        );
    }
}
