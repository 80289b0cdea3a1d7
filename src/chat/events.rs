//! Outbound event types broadcast to room members.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::ChatError;

/// A chat message stored in the ephemeral log.
///
/// `id` is unique and strictly increasing process-wide, so global ordering is
/// unambiguous even for clients that only ever see one room's subset. Author
/// fields are copied from the identity bound to the posting connection at
/// creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Process-wide monotonic message ID. Never reused, even after deletion.
    pub id: u64,
    /// Name of the room the message was posted to.
    pub room: String,
    /// Author's user ID.
    pub user_id: i64,
    /// Author's display name at creation time.
    pub username: String,
    /// Author's avatar URL at creation time.
    pub avatar: String,
    /// Message text.
    pub text: String,
    /// Server-observed creation time (RFC 3339 on the wire).
    pub time: DateTime<Utc>,
    /// Whether the message has been edited since creation.
    pub edited: bool,
}

/// Events sent from the server to clients.
///
/// Variant names match the socket event vocabulary the web client listens on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// A new message was posted to the room.
    Message {
        /// The full stored message, including the server-assigned id and time.
        message: Message,
    },
    /// The room's roster changed. Users are listed in join order.
    RoomUsers {
        /// Current members of the room.
        users: Vec<Identity>,
    },
    /// Someone in the room is typing. Last writer wins.
    Typing {
        /// Display name of the current typer.
        username: String,
    },
    /// The typing indicator was cleared.
    StopTyping,
    /// A message's text was edited.
    MessageUpdated {
        /// ID of the edited message.
        id: u64,
        /// New text.
        text: String,
    },
    /// A message was deleted.
    MessageDeleted {
        /// ID of the deleted message.
        id: u64,
    },
    /// An error reported to the requesting connection only, never broadcast.
    Error {
        /// Machine-readable error code.
        code: String,
        /// Human-readable description.
        message: String,
    },
}

impl ServerEvent {
    /// Build an error event from a core error.
    pub fn error(err: &ChatError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
