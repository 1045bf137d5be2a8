use axum::{
    extract::State,
    Json,
};
use officehours_core::{
    errors::QueueError,
    models::presence::{
        BulkPresenceRequest, BulkPresenceResponse, PresenceResponse, UpdatePresenceRequest,
    },
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    middleware::{
        auth::AuthUser,
        error_handling::AppError,
        extract::{ApiJson, ApiPath, ApiQuery},
    },
    ApiState,
};

#[derive(Debug, Deserialize)]
pub struct OnlineQuery {
    pub limit: Option<usize>,
}

#[axum::debug_handler]
pub async fn bulk_presence(
    State(state): State<Arc<ApiState>>,
    AuthUser(_actor): AuthUser,
    ApiJson(payload): ApiJson<BulkPresenceRequest>,
) -> Result<Json<BulkPresenceResponse>, AppError> {
    let presences = state.presence.bulk(payload.user_ids).await?;
    Ok(Json(BulkPresenceResponse {
        count: presences.len(),
        presences,
    }))
}

#[axum::debug_handler]
pub async fn get_presence(
    State(state): State<Arc<ApiState>>,
    AuthUser(_actor): AuthUser,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<PresenceResponse>, AppError> {
    let presence = state
        .presence
        .get(user_id)
        .await?
        .ok_or_else(|| QueueError::NotFound(format!("No presence recorded for user {}", user_id)))?;
    Ok(Json(PresenceResponse { presence }))
}

#[axum::debug_handler]
pub async fn online_users(
    State(state): State<Arc<ApiState>>,
    AuthUser(_actor): AuthUser,
    ApiQuery(query): ApiQuery<OnlineQuery>,
) -> Result<Json<BulkPresenceResponse>, AppError> {
    let presences = state.presence.online(query.limit.unwrap_or(50)).await?;
    Ok(Json(BulkPresenceResponse {
        count: presences.len(),
        presences,
    }))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<Arc<ApiState>>,
    AuthUser(actor): AuthUser,
    ApiJson(payload): ApiJson<UpdatePresenceRequest>,
) -> Result<Json<PresenceResponse>, AppError> {
    let presence = state
        .presence
        .update_status(actor.user_id, payload.status, payload.activity)
        .await?;
    Ok(Json(PresenceResponse { presence }))
}

#[axum::debug_handler]
pub async fn heartbeat(
    State(state): State<Arc<ApiState>>,
    AuthUser(actor): AuthUser,
) -> Result<Json<PresenceResponse>, AppError> {
    let presence = state.presence.heartbeat(actor.user_id).await?;
    Ok(Json(PresenceResponse { presence }))
}
