use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Longest question a student may attach to a queue entry.
pub const MAX_QUESTION_LEN: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Waiting,
    Admitted,
    Completed,
    Cancelled,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Waiting => "waiting",
            QueueStatus::Admitted => "admitted",
            QueueStatus::Completed => "completed",
            QueueStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled entries never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueStatus::Completed | QueueStatus::Cancelled)
    }

    /// Statuses that still occupy the student's slot in an instructor's queue.
    pub fn active() -> [QueueStatus; 2] {
        [QueueStatus::Waiting, QueueStatus::Admitted]
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(QueueStatus::Waiting),
            "admitted" => Ok(QueueStatus::Admitted),
            "completed" => Ok(QueueStatus::Completed),
            "cancelled" => Ok(QueueStatus::Cancelled),
            other => Err(format!("unknown queue status '{}'", other)),
        }
    }
}

/// The weekly office-hours slot a queue entry was attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: Uuid,
    pub instructor_id: Uuid,
    pub student_id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub status: QueueStatus,
    pub question: Option<String>,
    pub schedule_slot: Option<ScheduleSlot>,
    pub joined_at: DateTime<Utc>,
    pub admitted_at: Option<DateTime<Utc>>,
    /// Set once the entry reaches `completed` or `cancelled`.
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedEntry {
    #[serde(flatten)]
    pub entry: QueueEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub waiting: u32,
    pub admitted: u32,
    /// Mean minutes between joining and admission.
    pub average_wait_time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub queue: Vec<PositionedEntry>,
    pub count: usize,
    pub stats: QueueStats,
}

impl QueueSnapshot {
    /// Builds a snapshot from the non-terminal entries of one instructor.
    ///
    /// Entries are ordered by `joined_at` (stable, so callers can pre-order
    /// ties) and waiting entries receive positions `1..=N` in that order.
    pub fn from_active(mut entries: Vec<QueueEntry>, average_wait_time: Option<f64>) -> Self {
        entries.sort_by_key(|e| e.joined_at);

        let mut stats = QueueStats {
            average_wait_time,
            ..QueueStats::default()
        };
        let mut next_position = 1;

        let queue: Vec<PositionedEntry> = entries
            .into_iter()
            .filter(|e| !e.status.is_terminal())
            .map(|entry| {
                let position = match entry.status {
                    QueueStatus::Waiting => {
                        stats.waiting += 1;
                        let p = next_position;
                        next_position += 1;
                        Some(p)
                    }
                    _ => {
                        stats.admitted += 1;
                        None
                    }
                };
                PositionedEntry { entry, position }
            })
            .collect();

        Self {
            count: queue.len(),
            queue,
            stats,
        }
    }

    pub fn position_of(&self, queue_id: Uuid) -> Option<u32> {
        self.queue
            .iter()
            .find(|p| p.entry.id == queue_id)
            .and_then(|p| p.position)
    }

    pub fn student_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.queue.iter().map(|p| p.entry.student_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinQueueRequest {
    pub instructor_id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub question: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinQueueResponse {
    pub queue_entry: QueueEntry,
    pub position: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntryResponse {
    pub message: String,
    pub queue_entry: QueueEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyQueueStatus {
    pub queue_entry: Option<QueueEntry>,
    /// Zero unless the entry is currently waiting.
    pub position: u32,
    pub in_queue: bool,
}
