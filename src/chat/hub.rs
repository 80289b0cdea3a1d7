//! The chat hub: room registry, message log and event fan-out.
//!
//! All shared state lives behind a single mutex held for the duration of each
//! operation, so every operation is atomic with respect to other connections'
//! requests and per-room delivery order equals server processing order. The
//! bot's external call is the only work that spans a suspension point; it runs
//! in a detached task and re-enters the hub through [`ChatHub::post_bot`].

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::auth::Identity;
use crate::chat::{Message, ServerEvent};
use crate::{ChatError, Result};

/// Handle identifying one live connection.
pub type ConnId = Uuid;

/// Per-connection record: delivery channel, bound identity, current room.
struct ConnEntry {
    /// Outbox the hub pushes events into. Unbounded so a slow consumer never
    /// blocks fan-out; a closed consumer's send failures are swallowed.
    outbox: mpsc::UnboundedSender<ServerEvent>,
    identity: Option<Identity>,
    room: Option<String>,
}

/// Per-room record. Created by the first joiner, dropped with the last leaver.
#[derive(Default)]
struct RoomEntry {
    /// Members in join order. Roster broadcasts preserve this order.
    members: Vec<ConnId>,
    /// Scalar typing indicator, last writer wins. No server-side expiry.
    typist: Option<String>,
}

#[derive(Default)]
struct HubState {
    conns: HashMap<ConnId, ConnEntry>,
    rooms: HashMap<String, RoomEntry>,
    messages: BTreeMap<u64, Message>,
    next_id: u64,
}

impl HubState {
    fn alloc_message(&mut self, room: String, identity: &Identity, text: &str) -> Message {
        self.next_id += 1;
        let message = Message {
            id: self.next_id,
            room,
            user_id: identity.id,
            username: identity.username.clone(),
            avatar: identity.avatar.clone(),
            text: text.to_string(),
            time: Utc::now(),
            edited: false,
        };
        self.messages.insert(message.id, message.clone());
        message
    }
}

/// Deliver an event to every member of a room, optionally skipping one
/// connection. Each delivery is attempted independently; a failed send (the
/// receiver is gone) never propagates to the caller or other recipients.
fn broadcast(state: &HubState, room: &str, event: &ServerEvent, exclude: Option<ConnId>) {
    let Some(entry) = state.rooms.get(room) else {
        return;
    };
    for conn in &entry.members {
        if Some(*conn) == exclude {
            continue;
        }
        if let Some(conn_entry) = state.conns.get(conn) {
            let _ = conn_entry.outbox.send(event.clone());
        }
    }
}

/// Broadcast the current roster to every member of a room.
fn broadcast_roster(state: &HubState, room: &str) {
    let users = roster_of(state, room);
    broadcast(state, room, &ServerEvent::RoomUsers { users }, None);
}

/// Roster of a room in join order.
fn roster_of(state: &HubState, room: &str) -> Vec<Identity> {
    let Some(entry) = state.rooms.get(room) else {
        return Vec::new();
    };
    entry
        .members
        .iter()
        .filter_map(|conn| state.conns.get(conn))
        .filter_map(|c| c.identity.clone())
        .collect()
}

/// Remove a connection from its current room, if any.
///
/// Broadcasts the updated roster to the remaining members and drops the room
/// entry when it empties. Returns the room that was left.
fn leave_locked(state: &mut HubState, conn: ConnId) -> Option<String> {
    let room = state.conns.get_mut(&conn)?.room.take()?;

    if let Some(entry) = state.rooms.get_mut(&room) {
        entry.members.retain(|c| *c != conn);
        if entry.members.is_empty() {
            state.rooms.remove(&room);
        } else {
            broadcast_roster(state, &room);
        }
    }
    Some(room)
}

/// The shared chat engine.
///
/// One instance exists per process; every WebSocket session talks to it.
pub struct ChatHub {
    state: Mutex<HubState>,
}

impl ChatHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HubState::default()),
        }
    }

    /// Register a new connection and its delivery channel.
    pub async fn connect(&self, outbox: mpsc::UnboundedSender<ServerEvent>) -> ConnId {
        let conn = Uuid::new_v4();
        let mut state = self.state.lock().await;
        state.conns.insert(
            conn,
            ConnEntry {
                outbox,
                identity: None,
                room: None,
            },
        );
        conn
    }

    /// Remove a connection: leaves its room (re-broadcasting the roster to the
    /// remainder) and drops the record. This is the sole cleanup trigger.
    pub async fn disconnect(&self, conn: ConnId) {
        let mut state = self.state.lock().await;
        leave_locked(&mut state, conn);
        state.conns.remove(&conn);
    }

    /// Attach an authenticated identity to a connection.
    ///
    /// Idempotent per connection: rebinding replaces the prior identity, which
    /// is how a mid-session token refresh lands without reconnecting.
    pub async fn bind_identity(&self, conn: ConnId, identity: Identity) -> Result<()> {
        let mut state = self.state.lock().await;
        let entry = state
            .conns
            .get_mut(&conn)
            .ok_or(ChatError::Unauthenticated)?;
        entry.identity = Some(identity);
        Ok(())
    }

    /// Join a room, implicitly leaving the current one.
    ///
    /// Binds the identity, appends the connection to the room's member list
    /// and broadcasts the updated roster to every member, including the
    /// joiner. The first joiner creates the room.
    pub async fn join(&self, conn: ConnId, room: &str, identity: Identity) -> Result<()> {
        let room = room.trim();
        if room.is_empty() {
            return Err(ChatError::InvalidRoom);
        }

        let mut state = self.state.lock().await;
        if !state.conns.contains_key(&conn) {
            return Err(ChatError::Unauthenticated);
        }

        leave_locked(&mut state, conn);

        if let Some(entry) = state.conns.get_mut(&conn) {
            entry.identity = Some(identity);
            entry.room = Some(room.to_string());
        }
        state
            .rooms
            .entry(room.to_string())
            .or_default()
            .members
            .push(conn);

        broadcast_roster(&state, room);
        Ok(())
    }

    /// Leave the current room. No-op when not in one; never errors.
    pub async fn leave(&self, conn: ConnId) {
        let mut state = self.state.lock().await;
        leave_locked(&mut state, conn);
    }

    /// Post a message to the connection's current room.
    ///
    /// Allocates the next global id, stamps server time, stores the message
    /// and broadcasts it to the room including the author, so the author's UI
    /// reflects the server-assigned id and time.
    pub async fn post(&self, conn: ConnId, text: &str) -> Result<Message> {
        let mut state = self.state.lock().await;
        let entry = state.conns.get(&conn).ok_or(ChatError::Unauthenticated)?;
        let room = entry.room.clone().ok_or(ChatError::NotInRoom)?;
        let identity = entry.identity.clone().ok_or(ChatError::Unauthenticated)?;

        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let message = state.alloc_message(room, &identity, text);
        broadcast(
            &state,
            &message.room,
            &ServerEvent::Message {
                message: message.clone(),
            },
            None,
        );
        Ok(message)
    }

    /// Post a message authored by the bot identity into a room.
    ///
    /// No membership requirement: the bot is not a connection, and the reply
    /// may resolve after the room emptied, in which case it is stored and
    /// broadcast to nobody.
    pub async fn post_bot(&self, room: &str, identity: &Identity, text: &str) -> Message {
        let mut state = self.state.lock().await;
        let message = state.alloc_message(room.to_string(), identity, text);
        broadcast(
            &state,
            room,
            &ServerEvent::Message {
                message: message.clone(),
            },
            None,
        );
        message
    }

    /// Edit a message's text.
    ///
    /// Ownership is checked against the requesting connection's live identity,
    /// never against anything in the request payload. The update event goes to
    /// the message's room only.
    pub async fn edit(&self, conn: ConnId, id: u64, text: &str) -> Result<Message> {
        let mut state = self.state.lock().await;
        let requester = state
            .conns
            .get(&conn)
            .and_then(|c| c.identity.as_ref())
            .ok_or(ChatError::Unauthenticated)?
            .id;

        let stored = state.messages.get_mut(&id).ok_or(ChatError::NotFound)?;
        if stored.user_id != requester {
            return Err(ChatError::Forbidden);
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        stored.text = text.to_string();
        stored.edited = true;
        let message = stored.clone();

        broadcast(
            &state,
            &message.room,
            &ServerEvent::MessageUpdated {
                id: message.id,
                text: message.text.clone(),
            },
            None,
        );
        Ok(message)
    }

    /// Delete a message under the same ownership check as [`ChatHub::edit`].
    pub async fn delete(&self, conn: ConnId, id: u64) -> Result<()> {
        let mut state = self.state.lock().await;
        let requester = state
            .conns
            .get(&conn)
            .and_then(|c| c.identity.as_ref())
            .ok_or(ChatError::Unauthenticated)?
            .id;

        let stored = state.messages.get(&id).ok_or(ChatError::NotFound)?;
        if stored.user_id != requester {
            return Err(ChatError::Forbidden);
        }

        let room = stored.room.clone();
        state.messages.remove(&id);

        broadcast(&state, &room, &ServerEvent::MessageDeleted { id }, None);
        Ok(())
    }

    /// Mark the connection's identity as the room's current typer.
    ///
    /// Last writer wins; a newer typer silently masks the previous one. The
    /// server holds no expiry timer, so a client that never sends stop leaves
    /// a stale indicator.
    pub async fn start_typing(&self, conn: ConnId) -> Result<()> {
        let mut state = self.state.lock().await;
        let entry = state.conns.get(&conn).ok_or(ChatError::Unauthenticated)?;
        let room = entry.room.clone().ok_or(ChatError::NotInRoom)?;
        let username = entry
            .identity
            .as_ref()
            .ok_or(ChatError::Unauthenticated)?
            .username
            .clone();

        if let Some(room_entry) = state.rooms.get_mut(&room) {
            room_entry.typist = Some(username.clone());
        }
        broadcast(&state, &room, &ServerEvent::Typing { username }, None);
        Ok(())
    }

    /// Clear the room's typing indicator. No-op when not in a room.
    pub async fn stop_typing(&self, conn: ConnId) {
        let mut state = self.state.lock().await;
        let Some(room) = state.conns.get(&conn).and_then(|c| c.room.clone()) else {
            return;
        };
        if let Some(room_entry) = state.rooms.get_mut(&room) {
            room_entry.typist = None;
        }
        broadcast(&state, &room, &ServerEvent::StopTyping, None);
    }

    /// Current roster of a room, in join order. Empty for unknown rooms.
    pub async fn roster(&self, room: &str) -> Vec<Identity> {
        let state = self.state.lock().await;
        roster_of(&state, room)
    }

    /// Look up a stored message by id.
    pub async fn message(&self, id: u64) -> Option<Message> {
        self.state.lock().await.messages.get(&id).cloned()
    }

    /// Current typer of a room, if any.
    pub async fn typist(&self, room: &str) -> Option<String> {
        let state = self.state.lock().await;
        state.rooms.get(room).and_then(|r| r.typist.clone())
    }

    /// Room the connection is currently joined to.
    pub async fn current_room(&self, conn: ConnId) -> Option<String> {
        let state = self.state.lock().await;
        state.conns.get(&conn).and_then(|c| c.room.clone())
    }

    /// Number of rooms with at least one member.
    pub async fn room_count(&self) -> usize {
        self.state.lock().await.rooms.len()
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.conns.len()
    }
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new()
    }
}
