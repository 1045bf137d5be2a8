use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use officehours_core::models::queue::{
    JoinQueueRequest, JoinQueueResponse, MyQueueStatus, QueueEntryResponse, QueueSnapshot,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    middleware::{
        auth::{AuthUser, InstructorUser},
        error_handling::AppError,
        extract::{ApiJson, ApiPath},
    },
    ApiState,
};

#[axum::debug_handler]
pub async fn join_queue(
    State(state): State<Arc<ApiState>>,
    AuthUser(actor): AuthUser,
    ApiJson(payload): ApiJson<JoinQueueRequest>,
) -> Result<(StatusCode, Json<JoinQueueResponse>), AppError> {
    let response = state.queue.join(actor.user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[axum::debug_handler]
pub async fn get_queue(
    State(state): State<Arc<ApiState>>,
    AuthUser(_actor): AuthUser,
    ApiPath(instructor_id): ApiPath<Uuid>,
) -> Result<Json<QueueSnapshot>, AppError> {
    Ok(Json(state.queue.get_queue(instructor_id).await?))
}

#[axum::debug_handler]
pub async fn admit_student(
    State(state): State<Arc<ApiState>>,
    InstructorUser(actor): InstructorUser,
    ApiPath(queue_id): ApiPath<Uuid>,
) -> Result<Json<QueueEntryResponse>, AppError> {
    let entry = state.queue.admit(queue_id, actor.user_id).await?;
    Ok(Json(QueueEntryResponse {
        message: "Student admitted".to_string(),
        queue_entry: entry,
    }))
}

#[axum::debug_handler]
pub async fn complete_session(
    State(state): State<Arc<ApiState>>,
    InstructorUser(actor): InstructorUser,
    ApiPath(queue_id): ApiPath<Uuid>,
) -> Result<Json<QueueEntryResponse>, AppError> {
    let entry = state.queue.complete(queue_id, actor.user_id).await?;
    Ok(Json(QueueEntryResponse {
        message: "Session completed".to_string(),
        queue_entry: entry,
    }))
}

#[axum::debug_handler]
pub async fn cancel_entry(
    State(state): State<Arc<ApiState>>,
    AuthUser(actor): AuthUser,
    ApiPath(queue_id): ApiPath<Uuid>,
) -> Result<Json<QueueEntryResponse>, AppError> {
    let entry = state.queue.cancel(queue_id, actor).await?;
    Ok(Json(QueueEntryResponse {
        message: "Queue entry cancelled".to_string(),
        queue_entry: entry,
    }))
}

#[axum::debug_handler]
pub async fn my_queue_status(
    State(state): State<Arc<ApiState>>,
    AuthUser(actor): AuthUser,
    ApiPath(instructor_id): ApiPath<Uuid>,
) -> Result<Json<MyQueueStatus>, AppError> {
    Ok(Json(state.queue.my_entry(actor.user_id, instructor_id).await?))
}
