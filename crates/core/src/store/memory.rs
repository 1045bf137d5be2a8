use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::{eyre, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewQueueEntry, NewSchedule, PresenceStore, QueueStore, ScheduleStore};
use crate::models::{
    presence::{PresenceRecord, PresenceStatus},
    queue::{QueueEntry, QueueStatus},
    schedule::OfficeHoursSchedule,
};

#[derive(Default)]
struct MemoryState {
    /// Insertion order doubles as the tie-break for equal join times.
    entries: Vec<QueueEntry>,
    schedules: HashMap<Uuid, OfficeHoursSchedule>,
    presence: HashMap<Uuid, PresenceRecord>,
}

impl MemoryState {
    fn with_slot(&self, mut entry: QueueEntry) -> QueueEntry {
        entry.schedule_slot = entry
            .schedule_id
            .and_then(|id| self.schedules.get(&id))
            .map(OfficeHoursSchedule::slot);
        entry
    }
}

/// In-process store used by tests and by the server when no database is configured.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn insert_entry(&self, new: NewQueueEntry) -> Result<Option<QueueEntry>> {
        let mut state = self.state.write().await;

        let duplicate = state.entries.iter().any(|e| {
            e.instructor_id == new.instructor_id
                && e.student_id == new.student_id
                && !e.status.is_terminal()
        });
        if duplicate {
            return Ok(None);
        }

        let entry = QueueEntry {
            id: Uuid::new_v4(),
            instructor_id: new.instructor_id,
            student_id: new.student_id,
            schedule_id: new.schedule_id,
            status: QueueStatus::Waiting,
            question: new.question,
            schedule_slot: None,
            joined_at: new.joined_at,
            admitted_at: None,
            ended_at: None,
        };
        state.entries.push(entry.clone());

        Ok(Some(state.with_slot(entry)))
    }

    async fn get_entry(&self, id: Uuid) -> Result<Option<QueueEntry>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .map(|e| state.with_slot(e)))
    }

    async fn find_active_entry(
        &self,
        instructor_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<QueueEntry>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .find(|e| {
                e.instructor_id == instructor_id
                    && e.student_id == student_id
                    && !e.status.is_terminal()
            })
            .cloned()
            .map(|e| state.with_slot(e)))
    }

    async fn active_entries(&self, instructor_id: Uuid) -> Result<Vec<QueueEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<QueueEntry> = state
            .entries
            .iter()
            .filter(|e| e.instructor_id == instructor_id && !e.status.is_terminal())
            .cloned()
            .map(|e| state.with_slot(e))
            .collect();
        entries.sort_by_key(|e| e.joined_at);
        Ok(entries)
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: QueueStatus,
        to: QueueStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<QueueEntry>> {
        if to == QueueStatus::Waiting {
            return Err(eyre!("entries cannot return to waiting"));
        }

        let mut state = self.state.write().await;

        let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        if entry.status != expected {
            return Ok(None);
        }

        entry.status = to;
        if to == QueueStatus::Admitted {
            entry.admitted_at = Some(at);
        } else {
            entry.ended_at = Some(at);
        }

        let updated = entry.clone();
        Ok(Some(state.with_slot(updated)))
    }

    async fn cancel_all_active(&self, instructor_id: Uuid, at: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut changed = 0;
        for entry in state
            .entries
            .iter_mut()
            .filter(|e| e.instructor_id == instructor_id && !e.status.is_terminal())
        {
            entry.status = QueueStatus::Cancelled;
            entry.ended_at = Some(at);
            changed += 1;
        }
        Ok(changed)
    }

    async fn average_wait_minutes(
        &self,
        instructor_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Option<f64>> {
        let state = self.state.read().await;
        let waits: Vec<f64> = state
            .entries
            .iter()
            .filter(|e| e.instructor_id == instructor_id)
            .filter(|e| since.is_none_or(|since| e.joined_at >= since))
            .filter_map(|e| e.admitted_at.map(|admitted| admitted - e.joined_at))
            .map(|wait| wait.num_milliseconds() as f64 / 60_000.0)
            .collect();

        if waits.is_empty() {
            return Ok(None);
        }
        Ok(Some(waits.iter().sum::<f64>() / waits.len() as f64))
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn insert_schedule(&self, new: NewSchedule) -> Result<OfficeHoursSchedule> {
        let schedule = OfficeHoursSchedule {
            id: Uuid::new_v4(),
            instructor_id: new.instructor_id,
            day_of_week: new.day_of_week,
            start_time: new.start_time,
            end_time: new.end_time,
            is_active: true,
            is_deleted: false,
            created_at: new.created_at,
        };
        self.state
            .write()
            .await
            .schedules
            .insert(schedule.id, schedule.clone());
        Ok(schedule)
    }

    async fn get_schedule(&self, id: Uuid) -> Result<Option<OfficeHoursSchedule>> {
        Ok(self.state.read().await.schedules.get(&id).cloned())
    }

    async fn list_schedules(&self, instructor_id: Uuid) -> Result<Vec<OfficeHoursSchedule>> {
        let state = self.state.read().await;
        let mut schedules: Vec<OfficeHoursSchedule> = state
            .schedules
            .values()
            .filter(|s| s.instructor_id == instructor_id && !s.is_deleted)
            .cloned()
            .collect();
        schedules.sort_by_key(|s| (!s.is_active, s.day_of_week, s.start_time));
        Ok(schedules)
    }

    async fn save_schedule(&self, schedule: OfficeHoursSchedule) -> Result<OfficeHoursSchedule> {
        let mut state = self.state.write().await;
        match state.schedules.get_mut(&schedule.id) {
            Some(existing) => {
                *existing = schedule.clone();
                Ok(schedule)
            }
            None => Err(eyre!("Schedule not found")),
        }
    }

    async fn soft_delete_schedule(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(schedule) = state.schedules.get_mut(&id) {
            schedule.is_deleted = true;
            schedule.is_active = false;
        }
        Ok(())
    }
}

#[async_trait]
impl PresenceStore for MemoryStore {
    async fn upsert_presence(
        &self,
        user_id: Uuid,
        status: PresenceStatus,
        activity: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<PresenceRecord> {
        let record = PresenceRecord {
            user_id,
            status,
            activity,
            last_seen_at: at,
            updated_at: at,
        };
        self.state
            .write()
            .await
            .presence
            .insert(user_id, record.clone());
        Ok(record)
    }

    async fn touch_presence(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<PresenceRecord> {
        let mut state = self.state.write().await;
        let record = state
            .presence
            .entry(user_id)
            .and_modify(|r| {
                r.last_seen_at = at;
                r.updated_at = at;
            })
            .or_insert_with(|| PresenceRecord {
                user_id,
                status: PresenceStatus::Online,
                activity: None,
                last_seen_at: at,
                updated_at: at,
            });
        Ok(record.clone())
    }

    async fn get_presence(&self, user_id: Uuid) -> Result<Option<PresenceRecord>> {
        Ok(self.state.read().await.presence.get(&user_id).cloned())
    }

    async fn bulk_presence(&self, user_ids: Vec<Uuid>) -> Result<Vec<PresenceRecord>> {
        let state = self.state.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| state.presence.get(id).cloned())
            .collect())
    }

    async fn online_presence(&self, limit: usize) -> Result<Vec<PresenceRecord>> {
        let state = self.state.read().await;
        let mut online: Vec<PresenceRecord> = state
            .presence
            .values()
            .filter(|r| r.status != PresenceStatus::Offline)
            .cloned()
            .collect();
        online.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        online.truncate(limit);
        Ok(online)
    }

    async fn mark_inactive_offline(
        &self,
        threshold: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<Vec<PresenceRecord>> {
        let mut state = self.state.write().await;
        let mut changed = Vec::new();
        for record in state
            .presence
            .values_mut()
            .filter(|r| r.status != PresenceStatus::Offline && r.last_seen_at < threshold)
        {
            record.status = PresenceStatus::Offline;
            record.updated_at = at;
            changed.push(record.clone());
        }
        Ok(changed)
    }
}
