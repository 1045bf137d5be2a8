use axum::{routing::get, Router};
use std::sync::Arc;

use crate::{realtime::socket::ws_handler, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new().route("/ws", get(ws_handler))
}
