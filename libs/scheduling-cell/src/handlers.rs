// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    BookingRequest, CancelAppointmentRequest, ClientAppointmentsQuery, SchedulingError,
};
use crate::services::engine::SchedulingEngine;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AvailableSlotsQuery {
    pub professional_id: Uuid,
    pub date: NaiveDate,
}

// ==============================================================================
// ERROR MAPPING
// ==============================================================================

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match &err {
            SchedulingError::InvalidRequest(_)
            | SchedulingError::PastDateRejected
            | SchedulingError::OutsideBusinessHours => AppError::BadRequest(err.to_string()),
            SchedulingError::ServiceNotFound(_) | SchedulingError::NotFound => {
                AppError::NotFound(err.to_string())
            }
            SchedulingError::Forbidden => AppError::Forbidden(err.to_string()),
            SchedulingError::SlotUnavailable
            | SchedulingError::AlreadyCancelled
            | SchedulingError::Immutable => AppError::Conflict(err.to_string()),
            SchedulingError::PersistenceFailure(_) => AppError::Database(err.to_string()),
        }
    }
}

// ==============================================================================
// HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(engine): State<Arc<SchedulingEngine>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<BookingRequest>,
) -> Result<Json<Value>, AppError> {
    let confirmation = engine.book(request, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "appointments": confirmation.appointments,
        "total_duration_minutes": confirmation.total_duration_minutes,
        "total_price": confirmation.total_price,
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(engine): State<Arc<SchedulingEngine>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = engine
        .cancel(appointment_id, request.client_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": outcome.appointment,
        "cancellation_fee": outcome.cancellation_fee,
        "free_cancellation": outcome.free_cancellation,
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(engine): State<Arc<SchedulingEngine>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = engine.complete(appointment_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn list_available_slots(
    State(engine): State<Arc<SchedulingEngine>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = engine
        .list_available_slots(query.professional_id, query.date, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "date": query.date,
        "available_slots": slots,
    })))
}

#[axum::debug_handler]
pub async fn get_client_appointments(
    State(engine): State<Arc<SchedulingEngine>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(client_id): Path<Uuid>,
    Query(query): Query<ClientAppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = engine
        .list_client_appointments(client_id, query, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
    })))
}
