use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::Result;
use officehours_core::{
    models::{
        presence::{PresenceRecord, PresenceStatus},
        queue::{QueueEntry, QueueStatus},
        schedule::OfficeHoursSchedule,
    },
    store::{
        NewQueueEntry, NewSchedule, PresenceStore, QueueStore, ScheduleStore, StoreUnavailable,
    },
};
use uuid::Uuid;

use crate::repositories::{presence, queue, schedule};
use crate::DbPool;

/// PostgreSQL-backed implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Marks failures to reach PostgreSQL at all so callers can tell an outage
/// from a failed query.
fn classify(report: eyre::Report) -> eyre::Report {
    let unreachable = matches!(
        report.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_))
    );
    if unreachable {
        let message = report
            .chain()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(": ");
        eyre::Report::new(StoreUnavailable(message))
    } else {
        report
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = eyre::Report>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl QueueStore for PgStore {
    async fn insert_entry(&self, entry: NewQueueEntry) -> Result<Option<QueueEntry>> {
        queue::insert_entry(&self.pool, &entry)
            .await
            .map_err(classify)?
            .map(QueueEntry::try_from)
            .transpose()
    }

    async fn get_entry(&self, id: Uuid) -> Result<Option<QueueEntry>> {
        queue::get_entry_by_id(&self.pool, id)
            .await
            .map_err(classify)?
            .map(QueueEntry::try_from)
            .transpose()
    }

    async fn find_active_entry(
        &self,
        instructor_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<QueueEntry>> {
        queue::find_active_entry(&self.pool, instructor_id, student_id)
            .await
            .map_err(classify)?
            .map(QueueEntry::try_from)
            .transpose()
    }

    async fn active_entries(&self, instructor_id: Uuid) -> Result<Vec<QueueEntry>> {
        let rows = queue::get_active_entries(&self.pool, instructor_id)
            .await
            .map_err(classify)?;
        convert_all(rows)
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: QueueStatus,
        to: QueueStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<QueueEntry>> {
        if to == QueueStatus::Waiting {
            return Err(eyre::eyre!("entries cannot return to waiting"));
        }
        queue::transition_entry(&self.pool, id, expected, to, at)
            .await
            .map_err(classify)?
            .map(QueueEntry::try_from)
            .transpose()
    }

    async fn cancel_all_active(&self, instructor_id: Uuid, at: DateTime<Utc>) -> Result<u64> {
        queue::cancel_active_entries(&self.pool, instructor_id, at)
            .await
            .map_err(classify)
    }

    async fn average_wait_minutes(
        &self,
        instructor_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Option<f64>> {
        queue::average_wait_minutes(&self.pool, instructor_id, since)
            .await
            .map_err(classify)
    }
}

#[async_trait]
impl ScheduleStore for PgStore {
    async fn insert_schedule(&self, new: NewSchedule) -> Result<OfficeHoursSchedule> {
        schedule::create_schedule(&self.pool, &new)
            .await
            .map_err(classify)?
            .try_into()
    }

    async fn get_schedule(&self, id: Uuid) -> Result<Option<OfficeHoursSchedule>> {
        schedule::get_schedule_by_id(&self.pool, id)
            .await
            .map_err(classify)?
            .map(OfficeHoursSchedule::try_from)
            .transpose()
    }

    async fn list_schedules(&self, instructor_id: Uuid) -> Result<Vec<OfficeHoursSchedule>> {
        let rows = schedule::get_schedules_by_instructor(&self.pool, instructor_id)
            .await
            .map_err(classify)?;
        convert_all(rows)
    }

    async fn save_schedule(&self, updated: OfficeHoursSchedule) -> Result<OfficeHoursSchedule> {
        schedule::update_schedule(&self.pool, &updated)
            .await
            .map_err(classify)?
            .try_into()
    }

    async fn soft_delete_schedule(&self, id: Uuid) -> Result<()> {
        schedule::soft_delete_schedule(&self.pool, id)
            .await
            .map_err(classify)
    }
}

#[async_trait]
impl PresenceStore for PgStore {
    async fn upsert_presence(
        &self,
        user_id: Uuid,
        status: PresenceStatus,
        activity: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<PresenceRecord> {
        presence::upsert_presence(&self.pool, user_id, status.as_str(), activity.as_deref(), at)
            .await
            .map_err(classify)?
            .try_into()
    }

    async fn touch_presence(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<PresenceRecord> {
        presence::touch_presence(&self.pool, user_id, at)
            .await
            .map_err(classify)?
            .try_into()
    }

    async fn get_presence(&self, user_id: Uuid) -> Result<Option<PresenceRecord>> {
        presence::get_presence_by_user(&self.pool, user_id)
            .await
            .map_err(classify)?
            .map(PresenceRecord::try_from)
            .transpose()
    }

    async fn bulk_presence(&self, user_ids: Vec<Uuid>) -> Result<Vec<PresenceRecord>> {
        let rows = presence::get_presence_by_users(&self.pool, &user_ids)
            .await
            .map_err(classify)?;
        convert_all(rows)
    }

    async fn online_presence(&self, limit: usize) -> Result<Vec<PresenceRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = presence::get_online_presence(&self.pool, limit)
            .await
            .map_err(classify)?;
        convert_all(rows)
    }

    async fn mark_inactive_offline(
        &self,
        threshold: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<Vec<PresenceRecord>> {
        let rows = presence::mark_inactive_offline(&self.pool, threshold, at)
            .await
            .map_err(classify)?;
        convert_all(rows)
    }
}
