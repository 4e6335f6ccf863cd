mod test_utils;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use slotbook_core::models::{
    Actor, BookingStatus, ReviewEligibility, StudentSummary,
    booking::{CreateBookingResponse, GetBookingResponse, ListBookingsResponse},
    slot::{CreateSlotResponse, GetSlotResponse},
};
use test_utils::{TestContext, at, bearer};
use uuid::Uuid;

async fn publish(ctx: &TestContext, tutor: &Actor, start: &str, end: &str) -> Uuid {
    let (name, value) = bearer(tutor);
    let created: CreateSlotResponse = ctx
        .server
        .post("/api/slots")
        .add_header(name, value)
        .json(&json!({ "date": "2025-06-10", "startTime": start, "endTime": end }))
        .await
        .json();
    created.slot_id
}

async fn book(ctx: &TestContext, actor: &Actor, slot_id: Uuid) -> (StatusCode, Value) {
    let (name, value) = bearer(actor);
    let response = ctx
        .server
        .post("/api/bookings")
        .add_header(name, value)
        .json(&json!({ "slotId": slot_id }))
        .await;
    (response.status_code(), response.json())
}

async fn slot_status(ctx: &TestContext, slot_id: Uuid) -> String {
    let slot: GetSlotResponse = ctx.server.get(&format!("/api/slots/{}", slot_id)).await.json();
    slot.slot.status.to_string()
}

#[tokio::test]
async fn test_booking_lifecycle_over_http() {
    let ctx = TestContext::new();
    let tutor = Actor::tutor(Uuid::new_v4());
    let x = Actor::student(Uuid::new_v4());
    let y = Actor::student(Uuid::new_v4());
    let z = Actor::student(Uuid::new_v4());
    let slot_id = publish(&ctx, &tutor, "10:00", "11:00").await;

    let (status, body) = book(&ctx, &x, slot_id).await;
    assert_eq!(status, StatusCode::CREATED);
    let created: CreateBookingResponse = serde_json::from_value(body).unwrap();
    assert_eq!(created.booking.status, BookingStatus::Active);
    assert_eq!(slot_status(&ctx, slot_id).await, "BOOKED");

    let (status, body) = book(&ctx, &y, slot_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Slot is already booked");

    ctx.clock.set(at("2025-06-09 09:00"));
    let (name, value) = bearer(&x);
    let response = ctx
        .server
        .put(&format!("/api/bookings/{}", created.booking_id))
        .add_header(name, value)
        .json(&json!({ "status": "CANCELLED" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<GetBookingResponse>().booking.status,
        BookingStatus::Cancelled
    );
    assert_eq!(slot_status(&ctx, slot_id).await, "FREE");

    ctx.clock.set(at("2025-06-10 11:01"));
    let (name, value) = bearer(&x);
    let mine: ListBookingsResponse = ctx
        .server
        .get("/api/bookings/mine")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(mine.bookings.len(), 1);
    assert_eq!(mine.bookings[0].status, BookingStatus::Cancelled);

    let (status, _) = book(&ctx, &z, slot_id).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_cancellation_inside_cutoff_is_a_conflict() {
    let ctx = TestContext::new();
    let tutor = Actor::tutor(Uuid::new_v4());
    let student = Actor::student(Uuid::new_v4());
    let slot_id = publish(&ctx, &tutor, "10:00", "11:00").await;
    let (_, body) = book(&ctx, &student, slot_id).await;
    let booking_id = body["bookingId"].as_str().unwrap().to_string();

    ctx.clock.set(at("2025-06-09 12:00"));
    let (name, value) = bearer(&student);
    let response = ctx
        .server
        .put(&format!("/api/bookings/{}", booking_id))
        .add_header(name, value)
        .json(&json!({ "status": "CANCELLED" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    // Only admins may set any other status
    let (name, value) = bearer(&student);
    let response = ctx
        .server
        .put(&format!("/api/bookings/{}", booking_id))
        .add_header(name, value)
        .json(&json!({ "status": "COMPLETED" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let (name, value) = bearer(&Actor::admin(Uuid::new_v4()));
    let response = ctx
        .server
        .put(&format!("/api/bookings/{}", booking_id))
        .add_header(name, value)
        .json(&json!({ "status": "CANCELLED" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_booking_access_rules() {
    let ctx = TestContext::new();
    let tutor = Actor::tutor(Uuid::new_v4());
    let student = Actor::student(Uuid::new_v4());
    let slot_id = publish(&ctx, &tutor, "10:00", "11:00").await;

    let (status, _) = book(&ctx, &tutor, slot_id).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = book(&ctx, &student, Uuid::new_v4()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let response = ctx
        .server
        .post("/api/bookings")
        .json(&json!({ "slotId": slot_id }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = ctx
        .server
        .post("/api/bookings")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_static("Bearer not-a-token"),
        )
        .json(&json!({ "slotId": slot_id }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let (_, body) = book(&ctx, &student, slot_id).await;
    let path = format!("/api/bookings/{}", body["bookingId"].as_str().unwrap());

    let (name, value) = bearer(&Actor::student(Uuid::new_v4()));
    let response = ctx.server.get(&path).add_header(name, value).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let (name, value) = bearer(&tutor);
    let response = ctx.server.get(&path).add_header(name, value).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let (name, value) = bearer(&student);
    let response = ctx.server.delete(&path).add_header(name, value).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let (name, value) = bearer(&Actor::admin(Uuid::new_v4()));
    let response = ctx.server.delete(&path).add_header(name, value).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(slot_status(&ctx, slot_id).await, "FREE");
}

#[tokio::test]
async fn test_list_bookings_is_scoped_to_caller() {
    let ctx = TestContext::new();
    let tutor = Actor::tutor(Uuid::new_v4());
    let alice = Actor::student(Uuid::new_v4());
    let bob = Actor::student(Uuid::new_v4());
    let first = publish(&ctx, &tutor, "10:00", "11:00").await;
    let second = publish(&ctx, &tutor, "12:00", "13:00").await;
    book(&ctx, &alice, first).await;
    book(&ctx, &bob, second).await;

    // A student asking for someone else's bookings only ever sees their own
    let (name, value) = bearer(&alice);
    let listed: ListBookingsResponse = ctx
        .server
        .get(&format!("/api/bookings?studentId={}", bob.id))
        .add_header(name, value)
        .await
        .json();
    assert_eq!(listed.bookings.len(), 1);
    assert_eq!(listed.bookings[0].student_id, alice.id);

    let (name, value) = bearer(&tutor);
    let listed: ListBookingsResponse = ctx
        .server
        .get("/api/bookings")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(listed.bookings.len(), 2);

    let (name, value) = bearer(&Actor::admin(Uuid::new_v4()));
    let listed: ListBookingsResponse = ctx
        .server
        .get(&format!("/api/bookings?studentId={}", bob.id))
        .add_header(name, value)
        .await
        .json();
    assert_eq!(listed.bookings.len(), 1);
    assert_eq!(listed.bookings[0].student_id, bob.id);
}

#[tokio::test]
async fn test_review_eligibility_and_summary() {
    let ctx = TestContext::new();
    let tutor = Actor::tutor(Uuid::new_v4());
    let student = Actor::student(Uuid::new_v4());
    let slot_id = publish(&ctx, &tutor, "10:00", "11:00").await;
    let (_, body) = book(&ctx, &student, slot_id).await;
    let booking_id = body["bookingId"].as_str().unwrap().to_string();
    let path = format!("/api/bookings/{}/review-eligibility", booking_id);

    let (name, value) = bearer(&student);
    let eligibility: ReviewEligibility = ctx.server.get(&path).add_header(name, value).await.json();
    assert!(!eligibility.eligible);

    ctx.clock.set(at("2025-06-10 12:00"));
    let (name, value) = bearer(&student);
    let eligibility: ReviewEligibility = ctx.server.get(&path).add_header(name, value).await.json();
    assert!(eligibility.eligible);
    assert_eq!(eligibility.status, BookingStatus::Completed);

    let (name, value) = bearer(&student);
    let summary: StudentSummary = ctx
        .server
        .get("/api/bookings/summary")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(summary.student_id, student.id);
    assert_eq!((summary.total, summary.completed), (1, 1));

    let (name, value) = bearer(&tutor);
    let response = ctx
        .server
        .get(&format!("/api/bookings/summary?studentId={}", student.id))
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}
