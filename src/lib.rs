//! TrimChat - Multi-room real-time chat server
//!
//! Clients join named rooms over WebSocket, exchange messages, see who else is
//! present and who is typing, and may edit or delete their own prior messages.
//! Messages addressed to the bot are answered via an external text-generation
//! call without blocking other room activity.

pub mod auth;
pub mod bot;
pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod ws;

pub use auth::{issue_token, verify_token, Identity};
pub use bot::{BotResponder, PollinationsClient, ReplyGenerator, BOT_USER_ID};
pub use chat::{ChatHub, ConnId, Message, ServerEvent};
pub use config::Config;
pub use error::{ChatError, Result};
pub use server::{create_router, serve, AppState};
pub use ws::ClientMessage;
