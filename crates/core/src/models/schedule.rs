use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{QueueError, QueueResult};
use crate::models::queue::ScheduleSlot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeHoursSchedule {
    pub id: Uuid,
    pub instructor_id: Uuid,
    /// 0 = Sunday, 6 = Saturday
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl OfficeHoursSchedule {
    pub fn slot(&self) -> ScheduleSlot {
        ScheduleSlot {
            day_of_week: self.day_of_week,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    pub day_of_week: u8,
    /// `HH:MM` or `HH:MM:SS`
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleRequest {
    pub day_of_week: Option<u8>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateScheduleRequest {
    pub fn is_empty(&self) -> bool {
        self.day_of_week.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.is_active.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub message: String,
    pub schedule: OfficeHoursSchedule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleListResponse {
    pub schedules: Vec<OfficeHoursSchedule>,
    pub count: usize,
}

/// Parses a wall-clock time given as `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(value: &str) -> QueueResult<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| QueueError::Validation(format!("Invalid time '{}', expected HH:MM", value)))
}

pub fn validate_day_of_week(day: u8) -> QueueResult<()> {
    if day > 6 {
        return Err(QueueError::Validation(
            "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_time_range(start: NaiveTime, end: NaiveTime) -> QueueResult<()> {
    if start >= end {
        return Err(QueueError::Validation(
            "Start time must be before end time".to_string(),
        ));
    }
    Ok(())
}
