use crate::models::DbQueueEntry;
use chrono::{DateTime, Utc};
use eyre::Result;
use officehours_core::models::queue::QueueStatus;
use officehours_core::store::NewQueueEntry;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

/// Projection shared by every query returning queue entries. Expects the
/// queue row aliased as `q`.
const ENTRY_SELECT: &str = r#"
    SELECT q.id, q.instructor_id, q.student_id, q.schedule_id, q.status, q.question,
           q.joined_at, q.admitted_at, q.ended_at,
           s.day_of_week AS slot_day_of_week,
           s.start_time AS slot_start_time,
           s.end_time AS slot_end_time
"#;

const SLOT_JOIN: &str = "LEFT JOIN office_hours_schedules s ON s.id = q.schedule_id";

/// Returns `None` when the partial unique index rejects a second open entry.
pub async fn insert_entry(pool: &Pool<Postgres>, new: &NewQueueEntry) -> Result<Option<DbQueueEntry>> {
    let id = Uuid::new_v4();

    tracing::debug!(
        "Inserting queue entry: id={}, instructor={}, student={}",
        id,
        new.instructor_id,
        new.student_id
    );

    let sql = format!(
        r#"
        WITH q AS (
            INSERT INTO office_hours_queue (id, instructor_id, student_id, schedule_id, status, question, joined_at)
            VALUES ($1, $2, $3, $4, 'waiting', $5, $6)
            ON CONFLICT (instructor_id, student_id) WHERE status IN ('waiting', 'admitted') DO NOTHING
            RETURNING *
        )
        {ENTRY_SELECT}
        FROM q {SLOT_JOIN}
        "#
    );

    let entry = sqlx::query_as::<_, DbQueueEntry>(&sql)
        .bind(id)
        .bind(new.instructor_id)
        .bind(new.student_id)
        .bind(new.schedule_id)
        .bind(new.question.as_deref())
        .bind(new.joined_at)
        .fetch_optional(pool)
        .await?;

    Ok(entry)
}

pub async fn get_entry_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbQueueEntry>> {
    let sql = format!("{ENTRY_SELECT} FROM office_hours_queue q {SLOT_JOIN} WHERE q.id = $1");

    let entry = sqlx::query_as::<_, DbQueueEntry>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(entry)
}

pub async fn find_active_entry(
    pool: &Pool<Postgres>,
    instructor_id: Uuid,
    student_id: Uuid,
) -> Result<Option<DbQueueEntry>> {
    let sql = format!(
        r#"
        {ENTRY_SELECT}
        FROM office_hours_queue q {SLOT_JOIN}
        WHERE q.instructor_id = $1 AND q.student_id = $2 AND q.status IN ('waiting', 'admitted')
        "#
    );

    let entry = sqlx::query_as::<_, DbQueueEntry>(&sql)
        .bind(instructor_id)
        .bind(student_id)
        .fetch_optional(pool)
        .await?;

    Ok(entry)
}

pub async fn get_active_entries(pool: &Pool<Postgres>, instructor_id: Uuid) -> Result<Vec<DbQueueEntry>> {
    let sql = format!(
        r#"
        {ENTRY_SELECT}
        FROM office_hours_queue q {SLOT_JOIN}
        WHERE q.instructor_id = $1 AND q.status IN ('waiting', 'admitted')
        ORDER BY q.joined_at ASC, q.seq ASC
        "#
    );

    let entries = sqlx::query_as::<_, DbQueueEntry>(&sql)
        .bind(instructor_id)
        .fetch_all(pool)
        .await?;

    tracing::debug!(
        "Loaded {} open entries for instructor {}",
        entries.len(),
        instructor_id
    );
    Ok(entries)
}

/// Conditional status update. Returns `None` if the row is not in `expected`.
pub async fn transition_entry(
    pool: &Pool<Postgres>,
    id: Uuid,
    expected: QueueStatus,
    to: QueueStatus,
    at: DateTime<Utc>,
) -> Result<Option<DbQueueEntry>> {
    let admitted_at = (to == QueueStatus::Admitted).then_some(at);
    let ended_at = to.is_terminal().then_some(at);

    let sql = format!(
        r#"
        WITH q AS (
            UPDATE office_hours_queue
            SET status = $3,
                admitted_at = COALESCE($4, admitted_at),
                ended_at = COALESCE($5, ended_at)
            WHERE id = $1 AND status = $2
            RETURNING *
        )
        {ENTRY_SELECT}
        FROM q {SLOT_JOIN}
        "#
    );

    let entry = sqlx::query_as::<_, DbQueueEntry>(&sql)
        .bind(id)
        .bind(expected.as_str())
        .bind(to.as_str())
        .bind(admitted_at)
        .bind(ended_at)
        .fetch_optional(pool)
        .await?;

    tracing::debug!(
        "Transition {} {} -> {}: applied={}",
        id,
        expected,
        to,
        entry.is_some()
    );
    Ok(entry)
}

pub async fn cancel_active_entries(
    pool: &Pool<Postgres>,
    instructor_id: Uuid,
    at: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE office_hours_queue
        SET status = 'cancelled', ended_at = $2
        WHERE instructor_id = $1 AND status IN ('waiting', 'admitted')
        "#,
    )
    .bind(instructor_id)
    .bind(at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn average_wait_minutes(
    pool: &Pool<Postgres>,
    instructor_id: Uuid,
    since: Option<DateTime<Utc>>,
) -> Result<Option<f64>> {
    let average = sqlx::query_scalar::<_, Option<f64>>(
        r#"
        SELECT (AVG(EXTRACT(EPOCH FROM (admitted_at - joined_at))) / 60.0)::FLOAT8
        FROM office_hours_queue
        WHERE instructor_id = $1
          AND admitted_at IS NOT NULL
          AND ($2::TIMESTAMPTZ IS NULL OR joined_at >= $2)
        "#,
    )
    .bind(instructor_id)
    .bind(since)
    .fetch_one(pool)
    .await?;

    Ok(average)
}
