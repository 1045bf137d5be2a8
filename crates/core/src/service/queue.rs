//! Office-hours queue state machine.
//!
//! ```text
//! join ──> waiting ──admit──> admitted ──complete──> completed
//!             │                  │
//!             └──────cancel──────┴──────────────────> cancelled
//! ```
//!
//! Mutations of one instructor's queue run under that instructor's lock, and
//! positions are always re-derived from join order, so waiting entries carry
//! positions `1..=N` with no gaps or duplicates.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    errors::{QueueError, QueueResult},
    events::{
        ChannelEvent, EventPublisher, QueueAction, QueueUpdated, SessionAdmitted,
        SessionCancelled, SessionCompleted,
    },
    locks::InstructorLocks,
    models::{
        actor::Actor,
        queue::{
            JoinQueueRequest, JoinQueueResponse, MyQueueStatus, QueueEntry, QueueSnapshot,
            QueueStatus, MAX_QUESTION_LEN,
        },
    },
    store::{NewQueueEntry, QueueStore, ScheduleStore},
};

#[derive(Clone)]
pub struct QueueService {
    store: Arc<dyn QueueStore>,
    schedules: Arc<dyn ScheduleStore>,
    publisher: Arc<dyn EventPublisher>,
    locks: InstructorLocks,
    wait_window: Option<Duration>,
}

impl QueueService {
    pub fn new(
        store: Arc<dyn QueueStore>,
        schedules: Arc<dyn ScheduleStore>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            schedules,
            publisher,
            locks: InstructorLocks::new(),
            wait_window: None,
        }
    }

    /// Limits the average wait statistic to entries joined within `window`.
    /// `None` averages over all history.
    pub fn with_wait_window(mut self, window: Option<Duration>) -> Self {
        self.wait_window = window;
        self
    }

    pub async fn join(
        &self,
        student_id: Uuid,
        request: JoinQueueRequest,
    ) -> QueueResult<JoinQueueResponse> {
        let instructor_id = request.instructor_id;
        if student_id == instructor_id {
            return Err(QueueError::Validation(
                "Instructors cannot join their own queue".to_string(),
            ));
        }

        let question = normalize_question(request.question)?;

        if let Some(schedule_id) = request.schedule_id {
            let schedule = self
                .schedules
                .get_schedule(schedule_id)
                .await?
                .filter(|s| !s.is_deleted)
                .ok_or_else(|| {
                    QueueError::NotFound(format!("Schedule with ID {} not found", schedule_id))
                })?;
            if schedule.instructor_id != instructor_id {
                return Err(QueueError::Validation(
                    "Schedule does not belong to this instructor".to_string(),
                ));
            }
            if !schedule.is_active {
                return Err(QueueError::Validation(
                    "Office hours for this schedule are not active".to_string(),
                ));
            }
        }

        let _guard = self.locks.acquire(instructor_id).await;

        let entry = self
            .store
            .insert_entry(NewQueueEntry {
                instructor_id,
                student_id,
                schedule_id: request.schedule_id,
                question,
                joined_at: Utc::now(),
            })
            .await?
            .ok_or(QueueError::AlreadyInQueue)?;

        let snapshot = QueueSnapshot::from_active(self.store.active_entries(instructor_id).await?, None);
        let position = snapshot.position_of(entry.id).unwrap_or(snapshot.stats.waiting);

        drop(_guard);

        info!(
            "Student {} joined queue of instructor {} at position {}",
            student_id, instructor_id, position
        );

        self.publisher.publish(ChannelEvent::QueueUpdated(QueueUpdated {
            action: QueueAction::Joined,
            instructor_id,
            queue_id: Some(entry.id),
            student_id: Some(student_id),
            position: Some(position),
            timestamp: entry.joined_at,
        }));

        Ok(JoinQueueResponse {
            queue_entry: entry,
            position,
        })
    }

    pub async fn admit(&self, queue_id: Uuid, acting_instructor_id: Uuid) -> QueueResult<QueueEntry> {
        let entry = self.load_entry(queue_id).await?;
        ensure_owner(&entry, acting_instructor_id)?;

        let _guard = self.locks.acquire(entry.instructor_id).await;
        let entry = self.load_entry(queue_id).await?;
        if entry.status != QueueStatus::Waiting {
            return Err(QueueError::InvalidTransition {
                from: entry.status,
                action: "admit",
            });
        }

        let now = Utc::now();
        let admitted = self
            .store
            .transition(queue_id, QueueStatus::Waiting, QueueStatus::Admitted, now)
            .await?
            .ok_or(QueueError::InvalidTransition {
                from: entry.status,
                action: "admit",
            })?;
        drop(_guard);

        info!("Instructor {} admitted queue entry {}", acting_instructor_id, queue_id);

        self.publisher.publish(ChannelEvent::Admitted(SessionAdmitted {
            queue_id,
            instructor_id: admitted.instructor_id,
            student_id: admitted.student_id,
            admitted_at: now,
        }));
        self.publish_update(QueueAction::Admitted, &admitted, now);

        Ok(admitted)
    }

    pub async fn complete(
        &self,
        queue_id: Uuid,
        acting_instructor_id: Uuid,
    ) -> QueueResult<QueueEntry> {
        let entry = self.load_entry(queue_id).await?;
        ensure_owner(&entry, acting_instructor_id)?;

        let _guard = self.locks.acquire(entry.instructor_id).await;
        let entry = self.load_entry(queue_id).await?;
        if entry.status != QueueStatus::Admitted {
            return Err(QueueError::InvalidTransition {
                from: entry.status,
                action: "complete",
            });
        }

        let now = Utc::now();
        let completed = self
            .store
            .transition(queue_id, QueueStatus::Admitted, QueueStatus::Completed, now)
            .await?
            .ok_or(QueueError::InvalidTransition {
                from: entry.status,
                action: "complete",
            })?;
        drop(_guard);

        info!("Instructor {} completed queue entry {}", acting_instructor_id, queue_id);

        self.publisher.publish(ChannelEvent::Completed(SessionCompleted {
            queue_id,
            instructor_id: completed.instructor_id,
            student_id: completed.student_id,
            completed_at: now,
        }));
        self.publish_update(QueueAction::Completed, &completed, now);

        Ok(completed)
    }

    /// Instructors may cancel any open entry of their queue; students only
    /// their own entry, and only while it is waiting.
    pub async fn cancel(&self, queue_id: Uuid, actor: Actor) -> QueueResult<QueueEntry> {
        let entry = self.load_entry(queue_id).await?;
        let by_instructor = entry.instructor_id == actor.user_id;
        let by_student = entry.student_id == actor.user_id;
        if !by_instructor && !by_student {
            return Err(QueueError::Forbidden(
                "Only the instructor or the queued student can cancel this entry".to_string(),
            ));
        }

        let _guard = self.locks.acquire(entry.instructor_id).await;
        let entry = self.load_entry(queue_id).await?;
        if entry.status.is_terminal() {
            return Err(QueueError::InvalidTransition {
                from: entry.status,
                action: "cancel",
            });
        }
        if !by_instructor && entry.status != QueueStatus::Waiting {
            return Err(QueueError::Forbidden(
                "Students can only leave the queue while waiting".to_string(),
            ));
        }

        let now = Utc::now();
        let cancelled = self
            .store
            .transition(queue_id, entry.status, QueueStatus::Cancelled, now)
            .await?
            .ok_or(QueueError::InvalidTransition {
                from: entry.status,
                action: "cancel",
            })?;
        drop(_guard);

        let action = if by_instructor {
            QueueAction::Cancelled
        } else {
            QueueAction::Left
        };
        info!("User {} cancelled queue entry {} ({:?})", actor.user_id, queue_id, action);

        self.publisher.publish(ChannelEvent::Cancelled(SessionCancelled {
            queue_id,
            instructor_id: cancelled.instructor_id,
            student_id: cancelled.student_id,
        }));
        self.publish_update(action, &cancelled, now);

        Ok(cancelled)
    }

    /// Open entries in join order, with positions and fresh statistics.
    pub async fn get_queue(&self, instructor_id: Uuid) -> QueueResult<QueueSnapshot> {
        let entries = self.store.active_entries(instructor_id).await?;
        // A window reaching past the representable range means all history.
        let since = self
            .wait_window
            .and_then(|window| Utc::now().checked_sub_signed(window));
        let average = self
            .store
            .average_wait_minutes(instructor_id, since)
            .await?
            .map(|minutes| (minutes * 10.0).round() / 10.0);

        debug!(
            "Loaded queue for instructor {}: {} open entries",
            instructor_id,
            entries.len()
        );
        Ok(QueueSnapshot::from_active(entries, average))
    }

    pub async fn my_entry(&self, student_id: Uuid, instructor_id: Uuid) -> QueueResult<MyQueueStatus> {
        let Some(entry) = self
            .store
            .find_active_entry(instructor_id, student_id)
            .await?
        else {
            return Ok(MyQueueStatus {
                queue_entry: None,
                position: 0,
                in_queue: false,
            });
        };

        let snapshot = QueueSnapshot::from_active(self.store.active_entries(instructor_id).await?, None);
        Ok(MyQueueStatus {
            position: snapshot.position_of(entry.id).unwrap_or(0),
            queue_entry: Some(entry),
            in_queue: true,
        })
    }

    /// Cancels every open entry of an instructor's queue.
    pub async fn clear(&self, instructor_id: Uuid) -> QueueResult<u64> {
        let _guard = self.locks.acquire(instructor_id).await;
        let now = Utc::now();
        let cancelled = self.store.cancel_all_active(instructor_id, now).await?;
        drop(_guard);

        if cancelled > 0 {
            info!("Cleared {} open entries from queue of instructor {}", cancelled, instructor_id);
            self.publisher.publish(ChannelEvent::QueueUpdated(QueueUpdated {
                action: QueueAction::Cleared,
                instructor_id,
                queue_id: None,
                student_id: None,
                position: None,
                timestamp: now,
            }));
        }
        Ok(cancelled)
    }

    async fn load_entry(&self, queue_id: Uuid) -> QueueResult<QueueEntry> {
        self.store
            .get_entry(queue_id)
            .await?
            .ok_or_else(|| QueueError::NotFound(format!("Queue entry with ID {} not found", queue_id)))
    }

    fn publish_update(&self, action: QueueAction, entry: &QueueEntry, at: chrono::DateTime<Utc>) {
        self.publisher.publish(ChannelEvent::QueueUpdated(QueueUpdated {
            action,
            instructor_id: entry.instructor_id,
            queue_id: Some(entry.id),
            student_id: Some(entry.student_id),
            position: None,
            timestamp: at,
        }));
    }
}

fn ensure_owner(entry: &QueueEntry, acting_instructor_id: Uuid) -> QueueResult<()> {
    if entry.instructor_id != acting_instructor_id {
        return Err(QueueError::Forbidden(
            "Only the owning instructor can manage this queue entry".to_string(),
        ));
    }
    Ok(())
}

fn normalize_question(question: Option<String>) -> QueueResult<Option<String>> {
    let Some(question) = question else {
        return Ok(None);
    };
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_QUESTION_LEN {
        return Err(QueueError::Validation(format!(
            "Question must be at most {} characters",
            MAX_QUESTION_LEN
        )));
    }
    Ok(Some(trimmed.to_string()))
}
