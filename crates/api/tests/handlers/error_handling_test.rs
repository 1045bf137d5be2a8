use axum::{body::to_bytes, http::StatusCode};
use officehours_api::middleware::error_handling::{map_error, AppError};
use officehours_core::{errors::QueueError, models::queue::QueueStatus};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::Value;

#[rstest]
#[case(QueueError::NotFound("entry".into()), StatusCode::NOT_FOUND, "not_found")]
#[case(QueueError::Forbidden("nope".into()), StatusCode::FORBIDDEN, "forbidden")]
#[case(
    QueueError::InvalidTransition { from: QueueStatus::Completed, action: "admit" },
    StatusCode::CONFLICT,
    "invalid_transition"
)]
#[case(QueueError::AlreadyInQueue, StatusCode::CONFLICT, "already_in_queue")]
#[case(QueueError::Validation("bad".into()), StatusCode::BAD_REQUEST, "validation")]
#[case(QueueError::Authentication("who".into()), StatusCode::UNAUTHORIZED, "authentication")]
#[case(QueueError::Transport("down".into()), StatusCode::SERVICE_UNAVAILABLE, "transport")]
#[case(
    QueueError::Database(eyre::eyre!("connection reset")),
    StatusCode::INTERNAL_SERVER_ERROR,
    "database"
)]
#[tokio::test]
async fn test_error_maps_to_status_and_code(
    #[case] error: QueueError,
    #[case] status: StatusCode,
    #[case] code: &str,
) {
    let message = error.to_string();
    let response = map_error(error);
    assert_eq!(response.status(), status);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["code"], code);
    assert_eq!(body["error"], message);
}

#[test]
fn test_eyre_reports_become_database_errors() {
    let error = AppError::from(eyre::eyre!("pool timed out"));
    assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error.0.code(), "database");
}

#[test]
fn test_unreachable_store_is_service_unavailable() {
    use officehours_core::store::StoreUnavailable;

    let error = AppError::from(eyre::Report::new(StoreUnavailable("pool closed".into())));
    assert_eq!(error.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error.0.code(), "transport");
}
