use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use officehours_client::{
    error::{ClientError, ClientResult},
    transport::{Connection, ConnectionProvider},
};
use officehours_core::{
    events::{ChannelEvent, ClientMessage, QueueAction, QueueUpdated},
    models::queue::{QueueEntry, QueueStatus},
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

/// The server side of a fake realtime connection.
pub struct FakeServer {
    pub events: mpsc::UnboundedSender<ChannelEvent>,
    pub frames: mpsc::UnboundedReceiver<ClientMessage>,
}

impl FakeServer {
    pub async fn next_frame(&mut self) -> ClientMessage {
        timeout(Duration::from_secs(2), self.frames.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("client hung up")
    }
}

/// Hands out pre-built connections in order, then refuses.
pub struct FakeProvider {
    links: Mutex<VecDeque<Connection>>,
}

impl FakeProvider {
    pub fn with_links(count: usize) -> (Self, Vec<FakeServer>) {
        let mut links = VecDeque::new();
        let mut servers = Vec::new();
        for _ in 0..count {
            let (events, incoming) = mpsc::unbounded_channel();
            let (outgoing, frames) = mpsc::unbounded_channel();
            links.push_back(Connection { outgoing, incoming });
            servers.push(FakeServer { events, frames });
        }
        (
            Self {
                links: Mutex::new(links),
            },
            servers,
        )
    }
}

#[async_trait]
impl ConnectionProvider for FakeProvider {
    async fn connect(&self) -> ClientResult<Connection> {
        self.links
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::Transport("server unavailable".to_string()))
    }
}

pub fn queue_updated(instructor_id: Uuid) -> ChannelEvent {
    ChannelEvent::QueueUpdated(QueueUpdated {
        action: QueueAction::Joined,
        instructor_id,
        queue_id: Some(Uuid::new_v4()),
        student_id: Some(Uuid::new_v4()),
        position: Some(1),
        timestamp: Utc::now(),
    })
}

/// An open entry that joined `minutes_ago` minutes ago.
pub fn entry(instructor_id: Uuid, status: QueueStatus, minutes_ago: i64) -> QueueEntry {
    let joined_at = Utc::now() - ChronoDuration::minutes(minutes_ago);
    QueueEntry {
        id: Uuid::new_v4(),
        instructor_id,
        student_id: Uuid::new_v4(),
        schedule_id: None,
        status,
        question: Some("How do lifetimes interact with closures?".to_string()),
        schedule_slot: None,
        joined_at,
        admitted_at: (status == QueueStatus::Admitted).then_some(joined_at),
        ended_at: None,
    }
}

/// Polls `condition` until it holds or two seconds pass.
pub async fn eventually<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never became true");
}
