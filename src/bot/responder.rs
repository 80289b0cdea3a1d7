//! Trigger detection and the fire-and-forget reply task.

use std::sync::Arc;

use crate::auth::Identity;
use crate::bot::ReplyGenerator;
use crate::chat::ChatHub;
use crate::config::BotConfig;

/// Fixed user ID of the bot identity. Real users get positive IDs from the
/// auth service, so the bot can never collide with an author check.
pub const BOT_USER_ID: i64 = 0;

/// Watches posted messages for the mention token and injects replies.
///
/// Replies are detached tasks: `observe` returns immediately and the reply
/// re-enters the hub via [`ChatHub::post_bot`] whenever the generation call
/// resolves. There is no cancellation; a reply for an emptied room is still
/// computed and broadcast to whoever is present at resolution time.
pub struct BotResponder {
    hub: Arc<ChatHub>,
    generator: Arc<dyn ReplyGenerator>,
    identity: Identity,
    trigger: String,
    enabled: bool,
}

impl BotResponder {
    /// Create a responder from the bot configuration.
    pub fn new(hub: Arc<ChatHub>, generator: Arc<dyn ReplyGenerator>, config: &BotConfig) -> Self {
        Self {
            hub,
            generator,
            identity: Identity::new(BOT_USER_ID, config.name.clone(), Some(config.avatar.clone())),
            trigger: config.trigger.clone(),
            enabled: config.enabled,
        }
    }

    /// The bot's fixed identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Extract the prompt from a message addressed to the bot.
    ///
    /// Matching is case-insensitive containment of the mention token. The
    /// token is stripped from the prompt; a message that is nothing but the
    /// token prompts with the original text.
    pub fn extract_prompt(&self, text: &str) -> Option<String> {
        let start = find_ignore_ascii_case(text, &self.trigger)?;

        let mut prompt = String::with_capacity(text.len());
        prompt.push_str(&text[..start]);
        prompt.push_str(&text[start + self.trigger.len()..]);
        let prompt = prompt.trim();

        if prompt.is_empty() {
            Some(text.trim().to_string())
        } else {
            Some(prompt.to_string())
        }
    }

    /// Evaluate a freshly posted message, spawning a reply task on trigger.
    ///
    /// Never blocks: returns as soon as the task is spawned (or immediately
    /// when the message does not address the bot).
    pub fn observe(&self, room: &str, text: &str) {
        if !self.enabled {
            return;
        }
        let Some(prompt) = self.extract_prompt(text) else {
            return;
        };

        tracing::debug!(room, "bot triggered");

        let hub = Arc::clone(&self.hub);
        let generator = Arc::clone(&self.generator);
        let identity = self.identity.clone();
        let room = room.to_string();

        tokio::spawn(async move {
            let reply = generator.generate(&prompt).await;
            let message = hub.post_bot(&room, &identity, &reply).await;
            tracing::debug!(room, id = message.id, "bot reply posted");
        });
    }
}

/// Byte position of `needle` in `haystack`, ignoring ASCII case.
///
/// Matching by bytes keeps the reported offset valid for slicing `haystack`
/// even when it contains multi-byte characters elsewhere.
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}
