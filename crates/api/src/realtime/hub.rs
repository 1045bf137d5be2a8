use std::collections::HashMap;
use std::sync::Mutex;

use officehours_core::events::{ChannelEvent, EventPublisher};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// In-process fan-out for channel events, backed by `tokio::sync::broadcast`.
///
/// Delivery is best effort: with no connected sessions events are dropped,
/// and a session that falls more than `capacity` events behind skips ahead.
pub struct BroadcastHub {
    sender: broadcast::Sender<ChannelEvent>,
    /// Open sockets per identified user, so presence only flips to offline
    /// when the last one closes.
    connections: Mutex<HashMap<Uuid, usize>>,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Registers a socket for `user_id`; returns true for the user's first one.
    pub fn connect(&self, user_id: Uuid) -> bool {
        let mut connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());
        let count = connections.entry(user_id).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Unregisters a socket for `user_id`; returns true when it was the last one.
    pub fn disconnect(&self, user_id: Uuid) -> bool {
        let mut connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());
        match connections.get_mut(&user_id) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                connections.remove(&user_id);
                true
            }
            None => false,
        }
    }
}

impl EventPublisher for BroadcastHub {
    fn publish(&self, event: ChannelEvent) {
        let name = event.name();
        // `send` only fails when nobody is listening.
        match self.sender.send(event) {
            Ok(receivers) => debug!("Published {} to {} sessions", name, receivers),
            Err(_) => debug!("Published {} with no connected sessions", name),
        }
    }
}
