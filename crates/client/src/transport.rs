//! Realtime connection providers.
//!
//! A [`Connection`] is a pair of channels: client frames out, server events
//! in. The incoming side ends when the underlying socket closes, which is how
//! the realtime channel notices a disconnect. Tests substitute their own
//! [`ConnectionProvider`] to drive the channel without a server.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use officehours_core::{
    events::{ChannelEvent, ClientMessage},
    models::actor::Actor,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Message},
};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};

/// Interval between keepalive pings on an idle socket.
const PING_INTERVAL: Duration = Duration::from_secs(30);

pub struct Connection {
    pub outgoing: mpsc::UnboundedSender<ClientMessage>,
    pub incoming: mpsc::UnboundedReceiver<ChannelEvent>,
}

#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn connect(&self) -> ClientResult<Connection>;
}

/// Connects to the API's `/ws` endpoint with tokio-tungstenite.
pub struct WsConnectionProvider {
    url: String,
    actor: Actor,
}

impl WsConnectionProvider {
    /// `ws_url` is the `/ws` endpoint. The handshake carries the same identity
    /// headers as REST calls, which the server uses for presence.
    pub fn new(ws_url: &str, actor: Actor) -> Self {
        Self {
            url: ws_url.to_string(),
            actor,
        }
    }
}

#[async_trait]
impl ConnectionProvider for WsConnectionProvider {
    async fn connect(&self) -> ClientResult<Connection> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| ClientError::Transport(format!("Invalid realtime url {}: {e}", self.url)))?;
        let headers = request.headers_mut();
        headers.insert("x-user-role", HeaderValue::from_static(self.actor.role.as_str()));
        let user_id = HeaderValue::from_str(&self.actor.user_id.to_string())
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        headers.insert("x-user-id", user_id);

        let (stream, _response) = connect_async(request)
            .await
            .map_err(|e| ClientError::Transport(format!("Failed to connect to {}: {e}", self.url)))?;
        info!("Connected to realtime channel at {}", self.url);

        let (mut sink, mut source) = stream.split();
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel::<ChannelEvent>();

        tokio::spawn(async move {
            let mut keepalive = tokio::time::interval(PING_INTERVAL);
            keepalive.tick().await;
            loop {
                tokio::select! {
                    message = outgoing_rx.recv() => {
                        let Some(message) = message else {
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        };
                        let text = match serde_json::to_string(&message) {
                            Ok(text) => text,
                            Err(e) => {
                                warn!("Failed to encode client frame: {}", e);
                                continue;
                            }
                        };
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    _ = keepalive.tick() => {
                        if sink.send(Message::Ping(Vec::new())).await.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("Realtime writer stopped");
        });

        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ChannelEvent>(&text) {
                        Ok(event) => {
                            if incoming_tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => debug!("Ignoring unknown server frame: {}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Realtime socket error: {}", e);
                        break;
                    }
                }
            }
            debug!("Realtime reader stopped");
        });

        Ok(Connection {
            outgoing: outgoing_tx,
            incoming: incoming_rx,
        })
    }
}
