use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/office-hours/queue/join", post(handlers::queue::join_queue))
        .route("/api/office-hours/queue/:id", get(handlers::queue::get_queue))
        .route(
            "/api/office-hours/queue/:id/admit",
            post(handlers::queue::admit_student),
        )
        .route(
            "/api/office-hours/queue/:id/complete",
            post(handlers::queue::complete_session),
        )
        .route(
            "/api/office-hours/queue/:id/cancel",
            post(handlers::queue::cancel_entry),
        )
        .route(
            "/api/office-hours/my-queue/:id",
            get(handlers::queue::my_queue_status),
        )
}
