//! Realtime channel with an explicit subscription registry.
//!
//! Subscribers register interest in a [`Topic`] and receive
//! [`ChannelSignal`]s. Room membership on the server is derived from the
//! registry: the first queue subscriber for an instructor joins that room,
//! the last one to drop leaves it, and every (re)connection re-joins all
//! registered rooms before signalling [`ChannelSignal::Reconnected`] so
//! subscribers re-fetch instead of trusting missed events.
//!
//! Transport failures never reach subscribers. The channel logs them and
//! keeps retrying until shut down.

use officehours_core::events::{ChannelEvent, ClientMessage};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::transport::ConnectionProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Events scoped to one instructor's queue.
    Queue(Uuid),
    /// Global presence changes.
    Presence,
}

impl Topic {
    pub fn of(event: &ChannelEvent) -> Topic {
        match event.room() {
            Some(instructor_id) => Topic::Queue(instructor_id),
            None => Topic::Presence,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSignal {
    Event(ChannelEvent),
    /// A connection was (re)established; state may have changed unseen.
    Reconnected,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: HashMap<u64, (Topic, mpsc::UnboundedSender<ChannelSignal>)>,
    outgoing: Option<mpsc::UnboundedSender<ClientMessage>>,
}

impl Registry {
    fn rooms(&self) -> BTreeSet<Uuid> {
        self.subscribers
            .values()
            .filter_map(|(topic, _)| match topic {
                Topic::Queue(room) => Some(*room),
                Topic::Presence => None,
            })
            .collect()
    }

    fn members(&self, room: Uuid) -> usize {
        self.subscribers
            .values()
            .filter(|(topic, _)| *topic == Topic::Queue(room))
            .count()
    }

    fn send(&self, message: ClientMessage) {
        if let Some(outgoing) = &self.outgoing {
            if outgoing.send(message).is_err() {
                warn!("Realtime connection closed; dropping {:?}", message);
            }
        }
    }
}

struct Shared {
    provider: Arc<dyn ConnectionProvider>,
    reconnect_delay: Duration,
    shutdown: CancellationToken,
    registry: Mutex<Registry>,
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn attach(&self, outgoing: mpsc::UnboundedSender<ClientMessage>) {
        let mut registry = self.registry();
        registry.outgoing = Some(outgoing);
        for room in registry.rooms() {
            registry.send(ClientMessage::join(room));
        }
        for (_, sender) in registry.subscribers.values() {
            let _ = sender.send(ChannelSignal::Reconnected);
        }
    }

    fn detach(&self, leave_rooms: bool) {
        let mut registry = self.registry();
        if leave_rooms {
            for room in registry.rooms() {
                registry.send(ClientMessage::leave(room));
            }
        }
        registry.outgoing = None;
    }

    fn dispatch(&self, event: ChannelEvent) {
        let topic = Topic::of(&event);
        let registry = self.registry();
        for (_, sender) in registry.subscribers.values().filter(|(t, _)| *t == topic) {
            let _ = sender.send(ChannelSignal::Event(event.clone()));
        }
    }
}

/// Handle to the shared realtime connection. Cheap to clone.
#[derive(Clone)]
pub struct RealtimeChannel {
    shared: Arc<Shared>,
}

impl RealtimeChannel {
    pub fn new(provider: Arc<dyn ConnectionProvider>, reconnect_delay: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                provider,
                reconnect_delay,
                shutdown: CancellationToken::new(),
                registry: Mutex::new(Registry::default()),
            }),
        }
    }

    /// Spawns the connect/reconnect loop. It runs until [`shutdown`](Self::shutdown).
    pub fn start(&self) -> JoinHandle<()> {
        let shared = self.shared.clone();
        tokio::spawn(run(shared))
    }

    pub fn subscribe(&self, topic: Topic) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut registry = self.shared.registry();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.insert(id, (topic, sender));

        if let Topic::Queue(room) = topic {
            if registry.members(room) == 1 {
                registry.send(ClientMessage::join(room));
            }
        }

        Subscription {
            id,
            topic,
            receiver,
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.registry().outgoing.is_some()
    }

    /// Leaves every room and stops the connection loop.
    pub fn shutdown(&self) {
        self.shared.shutdown.cancel();
    }
}

async fn run(shared: Arc<Shared>) {
    loop {
        let connected = tokio::select! {
            _ = shared.shutdown.cancelled() => break,
            result = shared.provider.connect() => result,
        };

        match connected {
            Ok(mut connection) => {
                shared.attach(connection.outgoing);
                loop {
                    tokio::select! {
                        _ = shared.shutdown.cancelled() => {
                            shared.detach(true);
                            info!("Realtime channel stopped");
                            return;
                        }
                        event = connection.incoming.recv() => match event {
                            Some(event) => shared.dispatch(event),
                            None => break,
                        },
                    }
                }
                shared.detach(false);
                warn!(
                    "Realtime channel disconnected, retrying in {:?}",
                    shared.reconnect_delay
                );
            }
            Err(e) => warn!("Realtime connect failed: {}", e),
        }

        tokio::select! {
            _ = shared.shutdown.cancelled() => break,
            _ = tokio::time::sleep(shared.reconnect_delay) => {}
        }
    }
    info!("Realtime channel stopped");
}

/// A registered interest in one topic. Dropping it unregisters.
pub struct Subscription {
    id: u64,
    topic: Topic,
    receiver: mpsc::UnboundedReceiver<ChannelSignal>,
    shared: Weak<Shared>,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Next signal; `None` once the channel is gone.
    pub async fn recv(&mut self) -> Option<ChannelSignal> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let mut registry = shared.registry();
        registry.subscribers.remove(&self.id);
        if let Topic::Queue(room) = self.topic {
            if registry.members(room) == 0 {
                debug!("Last subscriber left room {}", room);
                registry.send(ClientMessage::leave(room));
            }
        }
    }
}
