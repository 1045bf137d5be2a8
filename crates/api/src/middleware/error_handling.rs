//! # Error Handling Middleware
//!
//! Maps [`QueueError`] onto HTTP status codes and a consistent JSON body:
//!
//! ```json
//! { "error": "Resource not found: Queue entry with ID ... not found", "code": "not_found" }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use officehours_core::errors::QueueError;
use serde_json::json;

/// Application error wrapper that provides HTTP status code mapping
///
/// # Example
///
/// ```
/// use axum::Json;
/// use officehours_api::middleware::error_handling::AppError;
/// use officehours_core::errors::QueueError;
///
/// async fn handler() -> Result<Json<()>, AppError> {
///     Err(QueueError::NotFound("Queue entry not found".to_string()).into())
/// }
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct AppError(pub QueueError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            QueueError::NotFound(_) => StatusCode::NOT_FOUND,
            QueueError::Forbidden(_) => StatusCode::FORBIDDEN,
            QueueError::InvalidTransition { .. } => StatusCode::CONFLICT,
            QueueError::AlreadyInQueue => StatusCode::CONFLICT,
            QueueError::Validation(_) => StatusCode::BAD_REQUEST,
            QueueError::Authentication(_) => StatusCode::UNAUTHORIZED,
            QueueError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
            QueueError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            QueueError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Request failed: {:?}", self.0);
        }

        let body = Json(json!({
            "error": self.0.to_string(),
            "code": self.0.code(),
        }));

        (status, body).into_response()
    }
}

/// Allows `?` on `QueueResult` inside handlers.
impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        AppError(err)
    }
}

/// Wraps bare `eyre` reports the same way the services do.
impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(QueueError::from(err))
    }
}

/// Maps a QueueError directly to an HTTP response
pub fn map_error(err: QueueError) -> Response {
    AppError(err).into_response()
}
