use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/presence/bulk", post(handlers::presence::bulk_presence))
        .route("/api/presence/user/:id", get(handlers::presence::get_presence))
        .route("/api/presence/online", get(handlers::presence::online_users))
        .route("/api/presence/status", put(handlers::presence::update_status))
        .route("/api/presence/heartbeat", post(handlers::presence::heartbeat))
}
