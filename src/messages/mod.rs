//! Controller message model and the translation of assistant replies into it.

pub mod models;
pub mod translator;

pub use models::{
    new_local_id, ControllerEvent, ConversationStart, IncomingMessage, MessageType,
    OutgoingMessage, ReplyBody,
};
pub use translator::{translate, unify_text, GenericReply, MediaKind, UNSUPPORTED_MESSAGE};
