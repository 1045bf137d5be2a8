use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS office_hours_schedules (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            instructor_id UUID NOT NULL,
            day_of_week SMALLINT NOT NULL CHECK (day_of_week BETWEEN 0 AND 6),
            start_time TIME NOT NULL,
            end_time TIME NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_schedule_range CHECK (end_time > start_time)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // `seq` breaks ties between entries that joined in the same instant.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS office_hours_queue (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            seq BIGSERIAL NOT NULL,
            instructor_id UUID NOT NULL,
            student_id UUID NOT NULL,
            schedule_id UUID NULL REFERENCES office_hours_schedules(id),
            status VARCHAR(16) NOT NULL DEFAULT 'waiting'
                CHECK (status IN ('waiting', 'admitted', 'completed', 'cancelled')),
            question TEXT NULL,
            joined_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            admitted_at TIMESTAMP WITH TIME ZONE NULL,
            ended_at TIMESTAMP WITH TIME ZONE NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_presence (
            user_id UUID PRIMARY KEY,
            status VARCHAR(16) NOT NULL DEFAULT 'offline'
                CHECK (status IN ('online', 'away', 'busy', 'offline')),
            activity VARCHAR(255) NULL,
            last_seen_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // One open entry per (instructor, student); joins rely on this for AlreadyInQueue.
    let indexes = [
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_queue_one_open_entry
            ON office_hours_queue(instructor_id, student_id)
            WHERE status IN ('waiting', 'admitted')
        "#,
        "CREATE INDEX IF NOT EXISTS idx_queue_instructor_status_joined ON office_hours_queue(instructor_id, status, joined_at, seq)",
        "CREATE INDEX IF NOT EXISTS idx_schedules_instructor_id ON office_hours_schedules(instructor_id)",
        "CREATE INDEX IF NOT EXISTS idx_presence_status_last_seen ON user_presence(status, last_seen_at)",
    ];
    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}
