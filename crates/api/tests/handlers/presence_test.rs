use axum::http::StatusCode;
use officehours_core::models::presence::{BulkPresenceResponse, PresenceResponse, PresenceStatus};
use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;

use crate::test_utils::{as_actor, student, TestContext};

#[tokio::test]
async fn test_status_update_and_bulk_lookup() {
    let ctx = TestContext::new();
    let (busy, idle) = (student(), student());

    let response = as_actor(ctx.server.put("/api/presence/status"), busy)
        .json(&json!({ "status": "busy", "activity": "In a meeting" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<PresenceResponse>().presence.status,
        PresenceStatus::Busy
    );

    let bulk = as_actor(ctx.server.post("/api/presence/bulk"), ctx.instructor)
        .json(&json!({ "userIds": [busy.user_id, idle.user_id] }))
        .await
        .json::<BulkPresenceResponse>();
    assert_eq!(bulk.count, 1);
    assert_eq!(bulk.presences[0].user_id, busy.user_id);

    let online = as_actor(ctx.server.get("/api/presence/online"), ctx.instructor)
        .await
        .json::<BulkPresenceResponse>();
    assert_eq!(online.count, 1);
}

#[tokio::test]
async fn test_heartbeat_then_lookup() {
    let ctx = TestContext::new();
    let who = student();

    let response = as_actor(ctx.server.post("/api/presence/heartbeat"), who).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = as_actor(
        ctx.server.get(&format!("/api/presence/user/{}", who.user_id)),
        ctx.instructor,
    )
    .await;
    assert_eq!(
        response.json::<PresenceResponse>().presence.status,
        PresenceStatus::Online
    );

    let response = as_actor(
        ctx.server.get(&format!("/api/presence/user/{}", Uuid::new_v4())),
        ctx.instructor,
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_status_is_rejected() {
    let ctx = TestContext::new();
    let response = as_actor(ctx.server.put("/api/presence/status"), student())
        .json(&json!({ "status": "asleep" }))
        .await;
    assert!(response.status_code().is_client_error());
}
