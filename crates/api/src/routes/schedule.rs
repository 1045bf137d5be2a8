use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/office-hours/schedule",
            post(handlers::schedule::create_schedule),
        )
        // GET is keyed by instructor, PUT/DELETE by schedule.
        .route(
            "/api/office-hours/schedule/:id",
            get(handlers::schedule::list_schedules)
                .put(handlers::schedule::update_schedule)
                .delete(handlers::schedule::delete_schedule),
        )
}
