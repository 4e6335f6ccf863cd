use axum::{
    Json,
    extract::{Path, Query, State, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
};
use serde::Deserialize;
use slotbook_core::{
    models::{
        SlotFilter, SlotStatus,
        slot::{CreateSlotRequest, CreateSlotResponse, GetSlotResponse, ListSlotsResponse},
    },
    time_window,
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
pub struct ListSlotsQuery {
    pub tutor_id: Option<Uuid>,
    pub date: Option<String>,
    pub status: Option<SlotStatus>,
}

impl ListSlotsQuery {
    fn into_filter(self) -> Result<SlotFilter, AppError> {
        let date = self
            .date
            .as_deref()
            .map(time_window::parse_date)
            .transpose()?;
        Ok(SlotFilter {
            tutor_id: self.tutor_id,
            date,
            status: self.status,
        })
    }
}

pub async fn create_slot(
    State(state): State<Arc<ApiState>>,
    CallerIdentity(actor): CallerIdentity,
    payload: Result<Json<CreateSlotRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateSlotResponse>), AppError> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let slot = state.services.slots.create_slot(&actor, &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSlotResponse {
            slot_id: slot.id,
            slot,
        }),
    ))
}

pub async fn list_slots(
    State(state): State<Arc<ApiState>>,
    query: Result<Query<ListSlotsQuery>, QueryRejection>,
) -> Result<Json<ListSlotsResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let filter = query.into_filter()?;

    let slots = state.services.orchestrator.list_slots(&filter).await?;

    Ok(Json(ListSlotsResponse { slots }))
}

pub async fn get_slot(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<GetSlotResponse>, AppError> {
    let slot = state.services.slots.get_slot(id).await?;

    Ok(Json(GetSlotResponse { slot }))
}

pub async fn delete_slot(
    State(state): State<Arc<ApiState>>,
    CallerIdentity(actor): CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<OkResponse>, AppError> {
    state.services.slots.delete_slot(id, &actor).await?;

    Ok(Json(OkResponse::ok()))
}
