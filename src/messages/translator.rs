//! Translation of Watson `output.generic` items into controller replies.

use serde_json::Value;

use crate::error::AssistantError;
use crate::messages::models::{MessageType, ReplyBody};

pub const UNSUPPORTED_MESSAGE: &str = "UNSUPPORTED MESSAGE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    fn message_type(self) -> MessageType {
        match self {
            MediaKind::Image => MessageType::Image,
            MediaKind::Video => MessageType::Video,
            MediaKind::Audio => MessageType::Audio,
        }
    }
}

/// One item of a Watson reply, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenericReply {
    Text {
        text: String,
    },
    Option {
        title: String,
        labels: Vec<String>,
    },
    Media {
        kind: MediaKind,
        source: String,
        title: Option<String>,
        description: Option<String>,
    },
    /// Any `response_type` the bridge does not render (pause, search, ...).
    Unsupported {
        response_type: String,
    },
}

impl GenericReply {
    /// Decodes a raw item, dispatching on its `response_type` (case-insensitive).
    pub fn decode(item: &Value) -> Result<Self, AssistantError> {
        let response_type = required_str(item, "response_type")?;

        let reply = match response_type.to_lowercase().as_str() {
            "text" => GenericReply::Text {
                text: required_str(item, "text")?.to_string(),
            },
            "option" => {
                let title = required_str(item, "title")?.to_string();
                let options = item
                    .get("options")
                    .and_then(Value::as_array)
                    .ok_or_else(|| missing("option", "options"))?;
                let labels = options
                    .iter()
                    .map(|o| required_str(o, "label").map(str::to_string))
                    .collect::<Result<Vec<_>, _>>()?;
                GenericReply::Option { title, labels }
            }
            t @ ("image" | "video" | "audio") => {
                let kind = match t {
                    "image" => MediaKind::Image,
                    "video" => MediaKind::Video,
                    _ => MediaKind::Audio,
                };
                GenericReply::Media {
                    kind,
                    source: required_str(item, "source")?.to_string(),
                    title: optional_str(item, "title"),
                    description: optional_str(item, "description"),
                }
            }
            _ => GenericReply::Unsupported {
                response_type: response_type.to_string(),
            },
        };
        Ok(reply)
    }

    pub fn into_reply(self) -> ReplyBody {
        match self {
            GenericReply::Text { text } => ReplyBody::text(text),
            GenericReply::Option { title, labels } => ReplyBody {
                options: Some(labels),
                ..ReplyBody::text(title)
            },
            GenericReply::Media {
                kind,
                source,
                title,
                description,
            } => ReplyBody {
                message_type: kind.message_type(),
                text: unify_text(title.as_deref(), description.as_deref()),
                options: None,
                external_file_url: Some(source),
            },
            GenericReply::Unsupported { .. } => ReplyBody::text(UNSUPPORTED_MESSAGE),
        }
    }
}

/// Decodes and renders a single raw reply item.
pub fn translate(item: &Value) -> Result<ReplyBody, AssistantError> {
    GenericReply::decode(item).map(GenericReply::into_reply)
}

/// Joins a media title and description; an empty string counts as absent.
pub fn unify_text(title: Option<&str>, description: Option<&str>) -> String {
    let title = title.filter(|t| !t.is_empty());
    let description = description.filter(|d| !d.is_empty());
    match (title, description) {
        (Some(t), Some(d)) => format!("{}\n\n{}", t, d),
        (Some(t), None) => t.to_string(),
        (None, Some(d)) => d.to_string(),
        (None, None) => String::new(),
    }
}

fn required_str<'a>(item: &'a Value, field: &str) -> Result<&'a str, AssistantError> {
    item.get(field).and_then(Value::as_str).ok_or_else(|| {
        let kind = item
            .get("response_type")
            .and_then(Value::as_str)
            .unwrap_or("generic item");
        missing(kind, field)
    })
}

fn optional_str(item: &Value, field: &str) -> Option<String> {
    item.get(field).and_then(Value::as_str).map(str::to_string)
}

fn missing(kind: &str, field: &str) -> AssistantError {
    AssistantError::MalformedReply(format!("{} reply without `{}`", kind, field))
}
