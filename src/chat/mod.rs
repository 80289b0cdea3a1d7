//! Chat core for TrimChat.
//!
//! This module provides the real-time session and room-broadcast engine:
//! - Connection-to-identity binding
//! - Room membership tracking with roster broadcast on every change
//! - An ephemeral message log with ownership-checked edit/delete
//! - Typing-indicator propagation (last-writer-wins per room)
//! - Ordered, best-effort event fan-out to room members

mod events;
mod hub;

pub use events::{Message, ServerEvent};
pub use hub::{ChatHub, ConnId};
