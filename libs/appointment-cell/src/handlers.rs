use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    AvailableSlotsQuery, CreateAppointmentRequest, UpdateAppointmentRequest, MESSAGE_DATE_FORMAT,
};
use crate::services::booking::BookingService;
use crate::services::slots::SlotService;

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);
    let appointments = booking_service.list_appointments().await?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);
    let appointment = booking_service.get_appointment(appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let booking_service = BookingService::new(&state);
    let appointment = booking_service.book_appointment(request).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "message": format!(
            "Appointment for {} with {} at {} created",
            appointment.patient,
            appointment.doctor,
            appointment.date.format(MESSAGE_DATE_FORMAT)
        ),
        "appointment": appointment
    }))))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);
    let (old, new) = booking_service.update_appointment(appointment_id, request).await?;

    Ok(Json(json!({
        "message": format!("Appointment '{}' updated successfully.", new.id),
        "old_data": old,
        "new_data": new
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);
    let appointment = booking_service.delete_appointment(appointment_id).await?;

    let message = format!(
        "Appointment '{}', with patient '{}' at '{}' deleted successfully.",
        appointment.id,
        appointment.patient,
        appointment.date.format(MESSAGE_DATE_FORMAT)
    );

    Ok(Json(json!({ "message": message })))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let slot_service = SlotService::new(&state);
    let slots = slot_service.available_slots(query.doctor_id, query.date).await?;

    Ok(Json(json!(slots)))
}
