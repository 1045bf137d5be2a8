use chrono::{DateTime, NaiveTime, Utc};
use eyre::{eyre, Result};
use officehours_core::models::{
    presence::PresenceRecord,
    queue::{QueueEntry, ScheduleSlot},
    schedule::OfficeHoursSchedule,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A queue row joined with its (optional) schedule slot.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbQueueEntry {
    pub id: Uuid,
    pub instructor_id: Uuid,
    pub student_id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub status: String,
    pub question: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub admitted_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub slot_day_of_week: Option<i16>,
    pub slot_start_time: Option<NaiveTime>,
    pub slot_end_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSchedule {
    pub id: Uuid,
    pub instructor_id: Uuid,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbPresence {
    pub user_id: Uuid,
    pub status: String,
    pub activity: Option<String>,
    pub last_seen_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn day_of_week(raw: i16) -> Result<u8> {
    u8::try_from(raw)
        .ok()
        .filter(|day| *day <= 6)
        .ok_or_else(|| eyre!("Invalid day_of_week {} in database", raw))
}

impl TryFrom<DbQueueEntry> for QueueEntry {
    type Error = eyre::Report;

    fn try_from(row: DbQueueEntry) -> Result<Self> {
        let schedule_slot = match (row.slot_day_of_week, row.slot_start_time, row.slot_end_time) {
            (Some(day), Some(start_time), Some(end_time)) => Some(ScheduleSlot {
                day_of_week: day_of_week(day)?,
                start_time,
                end_time,
            }),
            _ => None,
        };

        Ok(QueueEntry {
            id: row.id,
            instructor_id: row.instructor_id,
            student_id: row.student_id,
            schedule_id: row.schedule_id,
            status: row.status.parse().map_err(|e: String| eyre!(e))?,
            question: row.question,
            schedule_slot,
            joined_at: row.joined_at,
            admitted_at: row.admitted_at,
            ended_at: row.ended_at,
        })
    }
}

impl TryFrom<DbSchedule> for OfficeHoursSchedule {
    type Error = eyre::Report;

    fn try_from(row: DbSchedule) -> Result<Self> {
        Ok(OfficeHoursSchedule {
            id: row.id,
            instructor_id: row.instructor_id,
            day_of_week: day_of_week(row.day_of_week)?,
            start_time: row.start_time,
            end_time: row.end_time,
            is_active: row.is_active,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<DbPresence> for PresenceRecord {
    type Error = eyre::Report;

    fn try_from(row: DbPresence) -> Result<Self> {
        Ok(PresenceRecord {
            user_id: row.user_id,
            status: row.status.parse().map_err(|e: String| eyre!(e))?,
            activity: row.activity,
            last_seen_at: row.last_seen_at,
            updated_at: row.updated_at,
        })
    }
}
