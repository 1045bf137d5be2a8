use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use officehours_core::models::schedule::{
    CreateScheduleRequest, ScheduleListResponse, ScheduleResponse, UpdateScheduleRequest,
};
use serde_json::{json, Value};
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
pub async fn create_schedule(
    State(state): State<Arc<ApiState>>,
    InstructorUser(actor): InstructorUser,
    ApiJson(payload): ApiJson<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleResponse>), AppError> {
    let schedule = state.schedules.create(actor.user_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ScheduleResponse {
            message: "Office hours schedule created".to_string(),
            schedule,
        }),
    ))
}

#[axum::debug_handler]
pub async fn list_schedules(
    State(state): State<Arc<ApiState>>,
    AuthUser(_actor): AuthUser,
    ApiPath(instructor_id): ApiPath<Uuid>,
) -> Result<Json<ScheduleListResponse>, AppError> {
    let schedules = state.schedules.list(instructor_id).await?;
    Ok(Json(ScheduleListResponse {
        count: schedules.len(),
        schedules,
    }))
}

#[axum::debug_handler]
pub async fn update_schedule(
    State(state): State<Arc<ApiState>>,
    InstructorUser(actor): InstructorUser,
    ApiPath(schedule_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateScheduleRequest>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let schedule = state
        .schedules
        .update(schedule_id, actor.user_id, payload)
        .await?;
    Ok(Json(ScheduleResponse {
        message: "Office hours schedule updated".to_string(),
        schedule,
    }))
}

#[axum::debug_handler]
pub async fn delete_schedule(
    State(state): State<Arc<ApiState>>,
    InstructorUser(actor): InstructorUser,
    ApiPath(schedule_id): ApiPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.schedules.delete(schedule_id, actor.user_id).await?;
    Ok(Json(json!({ "message": "Office hours schedule deleted" })))
}
