//! Realtime channel wire types.
//!
//! Every event is a signal that an instructor's queue (or someone's presence)
//! changed. Receivers re-fetch authoritative state instead of rendering the
//! embedded fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::presence::PresenceStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueAction {
    Joined,
    /// A student cancelled their own waiting entry.
    Left,
    Admitted,
    Completed,
    /// The instructor cancelled an entry.
    Cancelled,
    /// Every open entry was cancelled because office hours were closed.
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueUpdated {
    pub action: QueueAction,
    pub instructor_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAdmitted {
    pub queue_id: Uuid,
    pub instructor_id: Uuid,
    pub student_id: Uuid,
    pub admitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCompleted {
    pub queue_id: Uuid,
    pub instructor_id: Uuid,
    pub student_id: Uuid,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCancelled {
    pub queue_id: Uuid,
    pub instructor_id: Uuid,
    pub student_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceChanged {
    pub user_id: Uuid,
    pub status: PresenceStatus,
    #[serde(default)]
    pub activity: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Server → client frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ChannelEvent {
    #[serde(rename = "queue-updated")]
    QueueUpdated(QueueUpdated),
    #[serde(rename = "office-hours-admitted")]
    Admitted(SessionAdmitted),
    #[serde(rename = "office-hours-completed")]
    Completed(SessionCompleted),
    #[serde(rename = "office-hours-cancelled")]
    Cancelled(SessionCancelled),
    #[serde(rename = "presence-changed")]
    PresenceChanged(PresenceChanged),
}

impl ChannelEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelEvent::QueueUpdated(_) => "queue-updated",
            ChannelEvent::Admitted(_) => "office-hours-admitted",
            ChannelEvent::Completed(_) => "office-hours-completed",
            ChannelEvent::Cancelled(_) => "office-hours-cancelled",
            ChannelEvent::PresenceChanged(_) => "presence-changed",
        }
    }

    /// The instructor room this event is scoped to; `None` for global events.
    pub fn room(&self) -> Option<Uuid> {
        match self {
            ChannelEvent::QueueUpdated(e) => Some(e.instructor_id),
            ChannelEvent::Admitted(e) => Some(e.instructor_id),
            ChannelEvent::Completed(e) => Some(e.instructor_id),
            ChannelEvent::Cancelled(e) => Some(e.instructor_id),
            ChannelEvent::PresenceChanged(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRequest {
    pub instructor_id: Uuid,
}

/// Client → server frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "join-office-hours")]
    JoinOfficeHours(RoomRequest),
    #[serde(rename = "leave-office-hours")]
    LeaveOfficeHours(RoomRequest),
}

impl ClientMessage {
    pub fn join(instructor_id: Uuid) -> Self {
        ClientMessage::JoinOfficeHours(RoomRequest { instructor_id })
    }

    pub fn leave(instructor_id: Uuid) -> Self {
        ClientMessage::LeaveOfficeHours(RoomRequest { instructor_id })
    }
}

/// Fan-out sink for domain events. Publishing never fails; delivery is best effort.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: ChannelEvent);
}

/// Publisher that drops everything.
#[derive(Debug, Default)]
pub struct NullPublisher;

impl EventPublisher for NullPublisher {
    fn publish(&self, _event: ChannelEvent) {}
}

/// Publisher that keeps every event in memory, in publish order.
#[derive(Debug, Default)]
pub struct CollectingPublisher {
    events: Mutex<Vec<ChannelEvent>>,
}

impl CollectingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains and returns everything published so far.
    pub fn take(&self) -> Vec<ChannelEvent> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *events)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.take().iter().map(ChannelEvent::name).collect()
    }
}

impl EventPublisher for CollectingPublisher {
    fn publish(&self, event: ChannelEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}
