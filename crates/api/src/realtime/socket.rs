use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::request::Parts,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use officehours_core::events::{ChannelEvent, ClientMessage};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{middleware::auth::actor_from_parts, ApiState};

/// The gateway identity of the handshake, if any. Anonymous sockets still
/// receive events but never affect presence.
pub struct SocketUser(pub Option<Uuid>);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for SocketUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SocketUser(actor_from_parts(parts).ok().map(|a| a.user_id)))
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ApiState>>,
    SocketUser(user_id): SocketUser,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

pub async fn handle_socket(socket: WebSocket, state: Arc<ApiState>, user_id: Option<Uuid>) {
    info!("WebSocket connection established (user={:?})", user_id);

    let (mut sender, mut receiver) = socket.split();
    // Subscribe before anything else so no event published after the
    // handshake is missed.
    let mut events = state.hub.subscribe();
    let mut rooms: HashSet<Uuid> = HashSet::new();

    if let Some(user) = user_id {
        if state.hub.connect(user) {
            if let Err(e) = state.presence.set_online(user).await {
                warn!("Failed to mark user {} online: {}", user, e);
            }
        }
    }

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(message) => apply_client_message(&mut rooms, message),
                        Err(e) => debug!("Ignoring malformed client frame: {}", e),
                    }
                    touch(&state, user_id).await;
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => touch(&state, user_id).await,
                Some(Ok(Message::Close(_))) | None => {
                    debug!("WebSocket connection closed by client");
                    break;
                }
                Some(Ok(Message::Binary(_))) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    break;
                }
            },
            event = events.recv() => match event {
                Ok(event) => {
                    if !should_forward(&rooms, &event) {
                        continue;
                    }
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            error!("Failed to encode {} event: {}", event.name(), e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        debug!("WebSocket sender closed");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // The client cannot tell what it missed. Closing makes it
                    // reconnect, rejoin its rooms and re-fetch.
                    warn!("WebSocket session lagged, {} events skipped, closing", skipped);
                    let close = CloseFrame {
                        code: close_code::AGAIN,
                        reason: "lagged".into(),
                    };
                    let _ = sender.send(Message::Close(Some(close))).await;
                    break;
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    if let Some(user) = user_id {
        if state.hub.disconnect(user) {
            if let Err(e) = state.presence.set_offline(user).await {
                warn!("Failed to mark user {} offline: {}", user, e);
            }
        }
    }

    info!("WebSocket connection closed (user={:?}, rooms={})", user_id, rooms.len());
}

async fn touch(state: &ApiState, user_id: Option<Uuid>) {
    if let Some(user) = user_id {
        if let Err(e) = state.presence.heartbeat(user).await {
            debug!("Heartbeat for user {} failed: {}", user, e);
        }
    }
}

pub(crate) fn apply_client_message(rooms: &mut HashSet<Uuid>, message: ClientMessage) {
    match message {
        ClientMessage::JoinOfficeHours(room) => {
            debug!("Joined office hours room {}", room.instructor_id);
            rooms.insert(room.instructor_id);
        }
        ClientMessage::LeaveOfficeHours(room) => {
            debug!("Left office hours room {}", room.instructor_id);
            rooms.remove(&room.instructor_id);
        }
    }
}

/// Room-scoped events reach members of that room; global events reach everyone.
pub(crate) fn should_forward(rooms: &HashSet<Uuid>, event: &ChannelEvent) -> bool {
    event.room().is_none_or(|room| rooms.contains(&room))
}
