use crate::models::DbPresence;
use chrono::{DateTime, Utc};
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn upsert_presence(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    status: &str,
    activity: Option<&str>,
    at: DateTime<Utc>,
) -> Result<DbPresence> {
    let presence = sqlx::query_as::<_, DbPresence>(
        r#"
        INSERT INTO user_presence (user_id, status, activity, last_seen_at, updated_at)
        VALUES ($1, $2, $3, $4, $4)
        ON CONFLICT (user_id) DO UPDATE
        SET status = EXCLUDED.status,
            activity = EXCLUDED.activity,
            last_seen_at = EXCLUDED.last_seen_at,
            updated_at = EXCLUDED.updated_at
        RETURNING user_id, status, activity, last_seen_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(status)
    .bind(activity)
    .bind(at)
    .fetch_one(pool)
    .await?;

    Ok(presence)
}

pub async fn touch_presence(pool: &Pool<Postgres>, user_id: Uuid, at: DateTime<Utc>) -> Result<DbPresence> {
    let presence = sqlx::query_as::<_, DbPresence>(
        r#"
        INSERT INTO user_presence (user_id, status, last_seen_at, updated_at)
        VALUES ($1, 'online', $2, $2)
        ON CONFLICT (user_id) DO UPDATE
        SET last_seen_at = EXCLUDED.last_seen_at,
            updated_at = EXCLUDED.updated_at
        RETURNING user_id, status, activity, last_seen_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(at)
    .fetch_one(pool)
    .await?;

    Ok(presence)
}

pub async fn get_presence_by_user(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Option<DbPresence>> {
    let presence = sqlx::query_as::<_, DbPresence>(
        r#"
        SELECT user_id, status, activity, last_seen_at, updated_at
        FROM user_presence
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(presence)
}

pub async fn get_presence_by_users(pool: &Pool<Postgres>, user_ids: &[Uuid]) -> Result<Vec<DbPresence>> {
    let presences = sqlx::query_as::<_, DbPresence>(
        r#"
        SELECT user_id, status, activity, last_seen_at, updated_at
        FROM user_presence
        WHERE user_id = ANY($1)
        "#,
    )
    .bind(user_ids)
    .fetch_all(pool)
    .await?;

    Ok(presences)
}

pub async fn get_online_presence(pool: &Pool<Postgres>, limit: i64) -> Result<Vec<DbPresence>> {
    let presences = sqlx::query_as::<_, DbPresence>(
        r#"
        SELECT user_id, status, activity, last_seen_at, updated_at
        FROM user_presence
        WHERE status <> 'offline'
        ORDER BY updated_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(presences)
}

pub async fn mark_inactive_offline(
    pool: &Pool<Postgres>,
    threshold: DateTime<Utc>,
    at: DateTime<Utc>,
) -> Result<Vec<DbPresence>> {
    let presences = sqlx::query_as::<_, DbPresence>(
        r#"
        UPDATE user_presence
        SET status = 'offline', updated_at = $2
        WHERE status <> 'offline' AND last_seen_at < $1
        RETURNING user_id, status, activity, last_seen_at, updated_at
        "#,
    )
    .bind(threshold)
    .bind(at)
    .fetch_all(pool)
    .await?;

    tracing::debug!("Marked {} presence records offline", presences.len());
    Ok(presences)
}
