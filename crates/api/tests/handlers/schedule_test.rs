use axum::http::StatusCode;
use officehours_core::models::schedule::{ScheduleListResponse, ScheduleResponse};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{json, Value};

use crate::test_utils::{as_actor, student, TestContext};

async fn create(ctx: &TestContext, body: Value) -> axum_test::TestResponse {
    as_actor(ctx.server.post("/api/office-hours/schedule"), ctx.instructor)
        .json(&body)
        .await
}

#[tokio::test]
async fn test_create_and_list_schedules() {
    let ctx = TestContext::new();

    let response = create(
        &ctx,
        json!({ "dayOfWeek": 1, "startTime": "09:00", "endTime": "10:30" }),
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let created = response.json::<ScheduleResponse>();
    assert!(created.schedule.is_active);

    let list = as_actor(
        ctx.server
            .get(&format!("/api/office-hours/schedule/{}", ctx.instructor.user_id)),
        student(),
    )
    .await
    .json::<ScheduleListResponse>();
    assert_eq!(list.count, 1);
    assert_eq!(list.schedules[0].id, created.schedule.id);
}

#[rstest]
#[case(json!({ "dayOfWeek": 8, "startTime": "09:00", "endTime": "10:00" }))]
#[case(json!({ "dayOfWeek": 2, "startTime": "11:00", "endTime": "10:00" }))]
#[case(json!({ "dayOfWeek": 2, "startTime": "soon", "endTime": "10:00" }))]
#[tokio::test]
async fn test_create_rejects_invalid_slots(#[case] body: Value) {
    let ctx = TestContext::new();
    let response = create(&ctx, body).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "validation");
}

#[tokio::test]
async fn test_students_cannot_create_schedules() {
    let ctx = TestContext::new();
    let response = as_actor(ctx.server.post("/api/office-hours/schedule"), student())
        .json(&json!({ "dayOfWeek": 1, "startTime": "09:00", "endTime": "10:00" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_and_delete_schedule() {
    let ctx = TestContext::new();
    let created = create(
        &ctx,
        json!({ "dayOfWeek": 4, "startTime": "13:00", "endTime": "14:00" }),
    )
    .await
    .json::<ScheduleResponse>();
    let path = format!("/api/office-hours/schedule/{}", created.schedule.id);

    let response = as_actor(ctx.server.put(&path), ctx.instructor)
        .json(&json!({ "isActive": false }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(!response.json::<ScheduleResponse>().schedule.is_active);

    let response = as_actor(ctx.server.put(&path), ctx.instructor)
        .json(&json!({}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = as_actor(ctx.server.delete(&path), ctx.instructor).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = as_actor(ctx.server.delete(&path), ctx.instructor).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
