use crate::models::DbSchedule;
use eyre::Result;
use officehours_core::models::schedule::OfficeHoursSchedule;
use officehours_core::store::NewSchedule;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn create_schedule(pool: &Pool<Postgres>, new: &NewSchedule) -> Result<DbSchedule> {
    let id = Uuid::new_v4();

    tracing::debug!(
        "Creating schedule: id={}, instructor={}, day={}, {}-{}",
        id,
        new.instructor_id,
        new.day_of_week,
        new.start_time,
        new.end_time
    );

    let schedule = sqlx::query_as::<_, DbSchedule>(
        r#"
        INSERT INTO office_hours_schedules (id, instructor_id, day_of_week, start_time, end_time, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, instructor_id, day_of_week, start_time, end_time, is_active, is_deleted, created_at
        "#,
    )
    .bind(id)
    .bind(new.instructor_id)
    .bind(i16::from(new.day_of_week))
    .bind(new.start_time)
    .bind(new.end_time)
    .bind(new.created_at)
    .fetch_one(pool)
    .await?;

    tracing::debug!("Schedule created successfully: id={}", id);
    Ok(schedule)
}

pub async fn get_schedule_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbSchedule>> {
    tracing::debug!("Getting schedule by id: {}", id);

    let schedule = sqlx::query_as::<_, DbSchedule>(
        r#"
        SELECT id, instructor_id, day_of_week, start_time, end_time, is_active, is_deleted, created_at
        FROM office_hours_schedules
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(schedule)
}

pub async fn get_schedules_by_instructor(
    pool: &Pool<Postgres>,
    instructor_id: Uuid,
) -> Result<Vec<DbSchedule>> {
    let schedules = sqlx::query_as::<_, DbSchedule>(
        r#"
        SELECT id, instructor_id, day_of_week, start_time, end_time, is_active, is_deleted, created_at
        FROM office_hours_schedules
        WHERE instructor_id = $1 AND is_deleted = FALSE
        ORDER BY is_active DESC, day_of_week ASC, start_time ASC
        "#,
    )
    .bind(instructor_id)
    .fetch_all(pool)
    .await?;

    Ok(schedules)
}

pub async fn update_schedule(pool: &Pool<Postgres>, schedule: &OfficeHoursSchedule) -> Result<DbSchedule> {
    let updated = sqlx::query_as::<_, DbSchedule>(
        r#"
        UPDATE office_hours_schedules
        SET day_of_week = $2, start_time = $3, end_time = $4, is_active = $5
        WHERE id = $1
        RETURNING id, instructor_id, day_of_week, start_time, end_time, is_active, is_deleted, created_at
        "#,
    )
    .bind(schedule.id)
    .bind(i16::from(schedule.day_of_week))
    .bind(schedule.start_time)
    .bind(schedule.end_time)
    .bind(schedule.is_active)
    .fetch_one(pool)
    .await?;

    Ok(updated)
}

pub async fn soft_delete_schedule(pool: &Pool<Postgres>, id: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE office_hours_schedules
        SET is_deleted = TRUE, is_active = FALSE
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}
