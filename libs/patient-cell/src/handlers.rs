use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{CreatePatientRequest, UpdatePatientRequest};
use crate::services::patient::PatientService;

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let patient_service = PatientService::new(&state);
    let patients = patient_service.list_patients().await?;

    Ok(Json(json!(patients)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let patient_service = PatientService::new(&state);
    let patient = patient_service.get_patient(patient_id).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn get_patient_by_email(
    State(state): State<Arc<AppConfig>>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
    let patient_service = PatientService::new(&state);
    let patient = patient_service.get_patient_by_email(&email).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let patient_service = PatientService::new(&state);
    let patient = patient_service.create_patient(request).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "message": format!("Patient {} created", patient.firstname),
        "patient": patient
    }))))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_service = PatientService::new(&state);
    let (old, new) = patient_service.update_patient(patient_id, request).await?;

    Ok(Json(json!({
        "message": format!("Patient '{}', '{}' updated successfully.", new.id, new.full_name()),
        "old_data": old,
        "new_data": new
    })))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let patient_service = PatientService::new(&state);
    let patient = patient_service.delete_patient(patient_id).await?;

    Ok(Json(json!({
        "message": format!("Patient '{}', '{}' deleted successfully.", patient.id, patient.full_name())
    })))
}
