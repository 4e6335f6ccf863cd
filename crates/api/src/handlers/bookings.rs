use axum::{
    Json,
    extract::{Path, Query, State, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
};
use serde::Deserialize;
use slotbook_core::{
    models::{
        BookingFilter, BookingStatus, ReviewEligibility, StudentSummary,
        booking::{
            CreateBookingRequest, CreateBookingResponse, GetBookingResponse, ListBookingsResponse,
            UpdateBookingRequest,
        },
    },
    policy,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    ApiState,
    handlers::OkResponse,
    middleware::{auth::CallerIdentity, error_handling::AppError},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBookingsQuery {
    pub student_id: Option<Uuid>,
    pub tutor_id: Option<Uuid>,
    pub slot_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub student_id: Option<Uuid>,
}

pub async fn create_booking(
    State(state): State<Arc<ApiState>>,
    CallerIdentity(actor): CallerIdentity,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), AppError> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let booking = state
        .services
        .orchestrator
        .create_booking(payload.slot_id, &actor, payload.student_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            booking_id: booking.id,
            booking,
        }),
    ))
}

pub async fn list_bookings(
    State(state): State<Arc<ApiState>>,
    CallerIdentity(actor): CallerIdentity,
    query: Result<Query<ListBookingsQuery>, QueryRejection>,
) -> Result<Json<ListBookingsResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let requested = BookingFilter {
        student_id: query.student_id,
        tutor_id: query.tutor_id,
        slot_id: query.slot_id,
        status: query.status,
    };
    let filter = policy::visible_bookings(&actor, requested);

    let bookings = state.services.orchestrator.list_bookings(&filter).await?;

    Ok(Json(ListBookingsResponse { bookings }))
}

pub async fn list_my_bookings(
    State(state): State<Arc<ApiState>>,
    CallerIdentity(actor): CallerIdentity,
) -> Result<Json<ListBookingsResponse>, AppError> {
    let bookings = state.services.orchestrator.list_my_bookings(&actor).await?;

    Ok(Json(ListBookingsResponse { bookings }))
}

pub async fn student_summary(
    State(state): State<Arc<ApiState>>,
    CallerIdentity(actor): CallerIdentity,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<Json<StudentSummary>, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let student_id = query.student_id.unwrap_or(actor.id);

    let summary = state
        .services
        .orchestrator
        .student_summary(student_id, &actor)
        .await?;

    Ok(Json(summary))
}

pub async fn get_booking(
    State(state): State<Arc<ApiState>>,
    CallerIdentity(actor): CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<GetBookingResponse>, AppError> {
    let booking = state.services.orchestrator.get_booking(id, &actor).await?;

    Ok(Json(GetBookingResponse { booking }))
}

/// Raw status update: the admin override, or a cancellation for everybody else.
pub async fn update_booking(
    State(state): State<Arc<ApiState>>,
    CallerIdentity(actor): CallerIdentity,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateBookingRequest>, JsonRejection>,
) -> Result<Json<GetBookingResponse>, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let booking = state
        .services
        .orchestrator
        .update_status(id, &actor, payload.status)
        .await?;

    Ok(Json(GetBookingResponse { booking }))
}

pub async fn delete_booking(
    State(state): State<Arc<ApiState>>,
    CallerIdentity(actor): CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<OkResponse>, AppError> {
    state.services.orchestrator.delete_booking(id, &actor).await?;

    Ok(Json(OkResponse::ok()))
}

pub async fn review_eligibility(
    State(state): State<Arc<ApiState>>,
    CallerIdentity(actor): CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewEligibility>, AppError> {
    let eligibility = state
        .services
        .orchestrator
        .review_eligibility(id, &actor)
        .await?;

    Ok(Json(eligibility))
}
