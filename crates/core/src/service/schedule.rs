use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    errors::{QueueError, QueueResult},
    models::schedule::{
        parse_time_of_day, validate_day_of_week, validate_time_range, CreateScheduleRequest,
        OfficeHoursSchedule, UpdateScheduleRequest,
    },
    service::queue::QueueService,
    store::{NewSchedule, ScheduleStore},
};

/// Weekly office-hours slots. Closing a slot (deactivating or deleting it)
/// cancels every open entry of the instructor's queue.
#[derive(Clone)]
pub struct ScheduleService {
    schedules: Arc<dyn ScheduleStore>,
    queue: QueueService,
}

impl ScheduleService {
    pub fn new(schedules: Arc<dyn ScheduleStore>, queue: QueueService) -> Self {
        Self { schedules, queue }
    }

    pub async fn create(
        &self,
        instructor_id: Uuid,
        request: CreateScheduleRequest,
    ) -> QueueResult<OfficeHoursSchedule> {
        validate_day_of_week(request.day_of_week)?;
        let start_time = parse_time_of_day(&request.start_time)?;
        let end_time = parse_time_of_day(&request.end_time)?;
        validate_time_range(start_time, end_time)?;

        let schedule = self
            .schedules
            .insert_schedule(NewSchedule {
                instructor_id,
                day_of_week: request.day_of_week,
                start_time,
                end_time,
                created_at: Utc::now(),
            })
            .await?;

        info!(
            "Created office hours schedule {} for instructor {}",
            schedule.id, instructor_id
        );
        Ok(schedule)
    }

    pub async fn list(&self, instructor_id: Uuid) -> QueueResult<Vec<OfficeHoursSchedule>> {
        Ok(self.schedules.list_schedules(instructor_id).await?)
    }

    pub async fn update(
        &self,
        schedule_id: Uuid,
        instructor_id: Uuid,
        request: UpdateScheduleRequest,
    ) -> QueueResult<OfficeHoursSchedule> {
        if request.is_empty() {
            return Err(QueueError::Validation("No updates provided".to_string()));
        }

        let mut schedule = self.load_owned(schedule_id, instructor_id).await?;

        if let Some(day) = request.day_of_week {
            validate_day_of_week(day)?;
            schedule.day_of_week = day;
        }
        if let Some(start) = request.start_time.as_deref() {
            schedule.start_time = parse_time_of_day(start)?;
        }
        if let Some(end) = request.end_time.as_deref() {
            schedule.end_time = parse_time_of_day(end)?;
        }
        validate_time_range(schedule.start_time, schedule.end_time)?;
        if let Some(active) = request.is_active {
            schedule.is_active = active;
        }

        let schedule = self.schedules.save_schedule(schedule).await?;

        if request.is_active == Some(false) {
            self.queue.clear(instructor_id).await?;
        }

        info!("Updated office hours schedule {}", schedule_id);
        Ok(schedule)
    }

    pub async fn delete(&self, schedule_id: Uuid, instructor_id: Uuid) -> QueueResult<()> {
        self.load_owned(schedule_id, instructor_id).await?;

        self.queue.clear(instructor_id).await?;
        self.schedules.soft_delete_schedule(schedule_id).await?;

        info!("Deleted office hours schedule {}", schedule_id);
        Ok(())
    }

    async fn load_owned(
        &self,
        schedule_id: Uuid,
        instructor_id: Uuid,
    ) -> QueueResult<OfficeHoursSchedule> {
        let schedule = self
            .schedules
            .get_schedule(schedule_id)
            .await?
            .filter(|s| !s.is_deleted)
            .ok_or_else(|| {
                QueueError::NotFound(format!("Schedule with ID {} not found", schedule_id))
            })?;

        if schedule.instructor_id != instructor_id {
            return Err(QueueError::Forbidden(
                "Only the owning instructor can modify this schedule".to_string(),
            ));
        }
        Ok(schedule)
    }
}
