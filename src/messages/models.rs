use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Message kinds as encoded on the controller wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    #[serde(rename = "S")]
    System,
    #[serde(rename = "T")]
    Text,
    #[serde(rename = "V")]
    Voice,
    #[serde(rename = "a")]
    Audio,
    #[serde(rename = "v")]
    Video,
    #[serde(rename = "i")]
    Image,
    #[serde(rename = "A")]
    Attachment,
}

/// A message pushed by the controller into a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub local_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub text: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub sent_by_human: bool,
    /// Controller timestamp, passed through unparsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<serde_json::Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl IncomingMessage {
    /// Human-authored text message
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            local_id: new_local_id(),
            text: text.into(),
            message_type: MessageType::Text,
            sent_by_human: true,
            time: None,
        }
    }
}

/// Content of a reply, before it is addressed to a specific incoming message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyBody {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_file_url: Option<String>,
}

impl ReplyBody {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            message_type: MessageType::Text,
            text: text.into(),
            options: None,
            external_file_url: None,
        }
    }
}

/// A message the bot sends back to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    #[serde(flatten)]
    pub body: ReplyBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_message_id: Option<String>,
    pub local_id: String,
}

impl OutgoingMessage {
    pub fn new(body: ReplyBody) -> Self {
        Self {
            body,
            quoted_message_id: None,
            local_id: new_local_id(),
        }
    }

    pub fn quoting(mut self, message_id: impl Into<String>) -> Self {
        self.quoted_message_id = Some(message_id.into());
        self
    }
}

/// Frames the controller sends over a conversation socket. Only `message`
/// frames matter to the bot; anything else (state updates, participant
/// changes) is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerEvent {
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

/// Body of the webhook the controller calls when a conversation (re)connects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationStart {
    pub conversation_id: String,
    pub session: String,
}

/// Fresh local id: a v4 UUID without hyphens.
pub fn new_local_id() -> String {
    Uuid::new_v4().simple().to_string()
}
