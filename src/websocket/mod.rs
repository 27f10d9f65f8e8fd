//! WebSocket client for the BLAB controller
//!
//! For every conversation the controller announces, the bot opens its own
//! socket to the controller, reads `{"message": ...}` events from it and
//! writes replies back as flat outgoing-message objects.

mod connection;
mod pool;
mod server;

pub use connection::{connect, conversation_url, SocketSink, SocketSource};
pub use pool::ConnectionPool;
pub use server::ControllerClient;
