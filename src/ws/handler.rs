//! Chat WebSocket handler.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::auth::{self, Identity};
use crate::chat::{ConnId, ServerEvent};
use crate::server::AppState;

use super::messages::ClientMessage;

/// Query parameters for the WebSocket connection.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// Token issued by the auth service.
    pub token: String,
}

/// WebSocket chat handler.
///
/// GET /ws?token={jwt}
///
/// The token is verified before the upgrade; its identity is bound to the
/// connection for the whole session.
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
) -> Response {
    let identity = match auth::verify_token(&state.jwt_secret, &query.token) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!("WebSocket connection rejected: {}", e);
            return Response::builder()
                .status(401)
                .body("Unauthorized".into())
                .unwrap();
        }
    };

    tracing::info!(
        "WebSocket connection from user {} ({})",
        identity.username,
        identity.id
    );

    ws.on_upgrade(move |socket| handle_socket(socket, state, identity))
}

/// Handle a WebSocket connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, identity: Identity) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Register with the hub; the outbox carries every event the hub wants
    // this client to see, broadcasts and requester-only errors alike.
    let (outbox, mut events) = mpsc::unbounded_channel();
    let conn = state.hub.connect(outbox.clone()).await;
    if state.hub.bind_identity(conn, identity.clone()).await.is_err() {
        return;
    }

    tracing::debug!("session started: {} for user {}", conn, identity.username);

    loop {
        tokio::select! {
            // Inbound client requests
            Some(msg_result) = ws_receiver.next() => {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handle_client_message(&state, conn, &identity, &outbox, client_msg)
                                    .await;
                            }
                            Err(e) => {
                                tracing::debug!("failed to parse client message: {}", e);
                                let error = ServerEvent::Error {
                                    code: "invalid_message".to_string(),
                                    message: "Invalid message format".to_string(),
                                };
                                let _ = outbox.send(error);
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        tracing::debug!("WebSocket closed by client: {}", conn);
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        let _ = ws_sender.send(Message::Pong(data)).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!("WebSocket error: {}", e);
                        break;
                    }
                }
            }

            // Outbound hub events
            event = events.recv() => {
                match event {
                    Some(event) => {
                        if let Ok(json) = serde_json::to_string(&event) {
                            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    None => break,
                }
            }
        }
    }

    // Disconnect is the sole cleanup trigger: leaves the room and
    // re-broadcasts the roster to whoever remains.
    state.hub.disconnect(conn).await;
    tracing::debug!("session ended: {}", conn);
}

/// Dispatch one client request to the hub.
///
/// Errors go to the requester's own outbox only, never to the room. Failed
/// edits and deletes surface as a single conflated code regardless of whether
/// the message was missing or not the requester's.
async fn handle_client_message(
    state: &AppState,
    conn: ConnId,
    identity: &Identity,
    outbox: &mpsc::UnboundedSender<ServerEvent>,
    msg: ClientMessage,
) {
    match msg {
        ClientMessage::JoinRoom { username, room } => {
            if let Some(claimed) = username {
                if claimed != identity.username {
                    tracing::debug!(
                        "payload username {:?} ignored for {}",
                        claimed,
                        identity.username
                    );
                }
            }
            if let Err(e) = state.hub.join(conn, &room, identity.clone()).await {
                let _ = outbox.send(ServerEvent::error(&e));
            }
        }

        ClientMessage::ChatMessage { text } => match state.hub.post(conn, &text).await {
            Ok(message) => {
                state.responder.observe(&message.room, &message.text);
            }
            Err(e) => {
                let _ = outbox.send(ServerEvent::error(&e));
            }
        },

        ClientMessage::EditMessage { id, text } => {
            if let Err(e) = state.hub.edit(conn, id, &text).await {
                let _ = outbox.send(ServerEvent::error(&e));
            }
        }

        ClientMessage::DeleteMessage { id } => {
            if let Err(e) = state.hub.delete(conn, id).await {
                let _ = outbox.send(ServerEvent::error(&e));
            }
        }

        ClientMessage::Typing => {
            if let Err(e) = state.hub.start_typing(conn).await {
                let _ = outbox.send(ServerEvent::error(&e));
            }
        }

        ClientMessage::StopTyping => {
            state.hub.stop_typing(conn).await;
        }
    }
}
