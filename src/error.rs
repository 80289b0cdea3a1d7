//! Error types for TrimChat.

use thiserror::Error;

/// Common error type for TrimChat.
#[derive(Error, Debug)]
pub enum ChatError {
    /// No identity is bound to the connection.
    #[error("no identity bound to connection")]
    Unauthenticated,

    /// The action requires room membership that is absent.
    #[error("not in a room")]
    NotInRoom,

    /// Room name is empty or malformed.
    #[error("invalid room name")]
    InvalidRoom,

    /// Message text is blank after trimming.
    #[error("message text is empty")]
    EmptyMessage,

    /// Edit/delete target does not exist.
    #[error("message not found")]
    NotFound,

    /// The requester is not the author of the target message.
    #[error("not the message author")]
    Forbidden,

    /// Token verification failure at the auth boundary.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// Short machine-readable code used in error events sent to clients.
    ///
    /// `NotFound` and `Forbidden` deliberately share one code: the requester
    /// is not told whether the message was missing or simply not theirs.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Unauthenticated => "unauthenticated",
            ChatError::NotInRoom => "not_in_room",
            ChatError::InvalidRoom => "invalid_room",
            ChatError::EmptyMessage => "empty_message",
            ChatError::NotFound | ChatError::Forbidden => "no_effect",
            ChatError::Auth(_) => "auth_error",
            ChatError::Config(_) => "config_error",
            ChatError::Io(_) => "io_error",
        }
    }
}

/// Result type alias for TrimChat operations.
pub type Result<T> = std::result::Result<T, ChatError>;
