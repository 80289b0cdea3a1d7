//! WebSocket transport for the chat core.
//!
//! Binds one socket to one hub connection: inbound frames are decoded into
//! [`ClientMessage`] requests, outbound hub events are serialized from
//! [`crate::chat::ServerEvent`], and socket teardown triggers the hub-side
//! disconnect cleanup.

mod handler;
mod messages;

pub use handler::{chat_ws_handler, WsQuery};
pub use messages::ClientMessage;
