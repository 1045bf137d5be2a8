//! Storage contracts for queue entries, office-hours schedules and presence.
//!
//! The store is the single source of truth; services never cache what it
//! returns beyond a single call. `officehours-db` provides the PostgreSQL
//! implementation, [`memory::MemoryStore`] an in-process one.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use eyre::Result;
use uuid::Uuid;

use crate::models::{
    presence::{PresenceRecord, PresenceStatus},
    queue::{QueueEntry, QueueStatus},
    schedule::OfficeHoursSchedule,
};

/// Raised by a store that cannot reach its backend at all, as opposed to a
/// query that failed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("storage unavailable: {0}")]
pub struct StoreUnavailable(pub String);

#[derive(Debug, Clone, PartialEq)]
pub struct NewQueueEntry {
    pub instructor_id: Uuid,
    pub student_id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub question: Option<String>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSchedule {
    pub instructor_id: Uuid,
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Inserts a `waiting` entry. Returns `None` when the student already
    /// holds a non-terminal entry with the same instructor.
    async fn insert_entry(&self, entry: NewQueueEntry) -> Result<Option<QueueEntry>>;

    async fn get_entry(&self, id: Uuid) -> Result<Option<QueueEntry>>;

    async fn find_active_entry(
        &self,
        instructor_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<QueueEntry>>;

    /// Non-terminal entries of one instructor, ordered by `joined_at`, ties in
    /// insertion order.
    async fn active_entries(&self, instructor_id: Uuid) -> Result<Vec<QueueEntry>>;

    /// Moves an entry from `expected` to `to`, stamping the matching
    /// timestamp. Returns `None` if the entry is no longer in `expected`.
    async fn transition(
        &self,
        id: Uuid,
        expected: QueueStatus,
        to: QueueStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<QueueEntry>>;

    /// Cancels every non-terminal entry of an instructor, returning how many changed.
    async fn cancel_all_active(&self, instructor_id: Uuid, at: DateTime<Utc>) -> Result<u64>;

    /// Mean minutes between `joined_at` and `admitted_at` over every entry
    /// that was ever admitted, optionally limited to entries joined since `since`.
    async fn average_wait_minutes(
        &self,
        instructor_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Option<f64>>;
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn insert_schedule(&self, schedule: NewSchedule) -> Result<OfficeHoursSchedule>;

    /// Includes soft-deleted schedules.
    async fn get_schedule(&self, id: Uuid) -> Result<Option<OfficeHoursSchedule>>;

    /// Non-deleted schedules, active first, then by day and start time.
    async fn list_schedules(&self, instructor_id: Uuid) -> Result<Vec<OfficeHoursSchedule>>;

    /// Persists every mutable field of `schedule`.
    async fn save_schedule(&self, schedule: OfficeHoursSchedule) -> Result<OfficeHoursSchedule>;

    async fn soft_delete_schedule(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait PresenceStore: Send + Sync {
    async fn upsert_presence(
        &self,
        user_id: Uuid,
        status: PresenceStatus,
        activity: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<PresenceRecord>;

    /// Refreshes `last_seen_at`, creating an `online` record if none exists.
    async fn touch_presence(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<PresenceRecord>;

    async fn get_presence(&self, user_id: Uuid) -> Result<Option<PresenceRecord>>;

    async fn bulk_presence(&self, user_ids: Vec<Uuid>) -> Result<Vec<PresenceRecord>>;

    /// Non-offline users, most recently updated first.
    async fn online_presence(&self, limit: usize) -> Result<Vec<PresenceRecord>>;

    /// Marks every non-offline user last seen before `threshold` as offline
    /// and returns the changed records.
    async fn mark_inactive_offline(
        &self,
        threshold: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<Vec<PresenceRecord>>;
}
