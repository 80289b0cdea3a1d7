//! Bot responder for TrimChat.
//!
//! Messages containing the mention token are answered by an external
//! text-generation service. The reply path is fire-and-forget: posting never
//! blocks on the generation call, and generation failures degrade to fixed
//! fallback text rather than surfacing as errors.

mod client;
mod responder;

pub use client::{PollinationsClient, ReplyGenerator};
pub use responder::{BotResponder, BOT_USER_ID};
