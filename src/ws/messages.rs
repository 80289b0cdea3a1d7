//! Inbound message types sent by clients.

use serde::Deserialize;

/// Messages sent from client to server. Every request is implicitly scoped to
/// the sending connection.
///
/// Variant names match the socket event vocabulary the web client emits.
/// The `username` field of `JoinRoom` is wire compatibility only: identity
/// always comes from the verified token bound at connect time, never from a
/// request payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Join a room, implicitly leaving the current one.
    JoinRoom {
        /// Display name as the client believes it to be. Ignored.
        #[serde(default)]
        username: Option<String>,
        /// Room to join.
        room: String,
    },
    /// Post a message to the current room.
    ChatMessage {
        /// Message text.
        text: String,
    },
    /// Edit one of the requester's own messages.
    EditMessage {
        /// Target message ID.
        id: u64,
        /// Replacement text.
        text: String,
    },
    /// Delete one of the requester's own messages.
    DeleteMessage {
        /// Target message ID.
        id: u64,
    },
    /// Announce that the requester is typing.
    Typing,
    /// Clear the typing indicator.
    StopTyping,
}
