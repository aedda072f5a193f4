use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{CreateClinicRequest, UpdateClinicRequest};
use crate::services::ClinicService;

#[axum::debug_handler]
pub async fn list_clinics(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicService::new(&config);
    let clinics = service.list_clinics().await?;

    Ok(Json(json!(clinics)))
}

#[axum::debug_handler]
pub async fn get_clinic(
    State(config): State<Arc<AppConfig>>,
    Path(clinic_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicService::new(&config);
    let clinic = service.get_clinic(clinic_id).await?;

    Ok(Json(json!(clinic)))
}

#[axum::debug_handler]
pub async fn create_clinic(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<CreateClinicRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = ClinicService::new(&config);
    let clinic = service.create_clinic(request).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "message": format!("Clinic {} created", clinic.name),
        "clinic": clinic
    }))))
}

#[axum::debug_handler]
pub async fn update_clinic(
    State(config): State<Arc<AppConfig>>,
    Path(clinic_id): Path<i64>,
    Json(request): Json<UpdateClinicRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicService::new(&config);
    let (old, new) = service.update_clinic(clinic_id, request).await?;

    Ok(Json(json!({
        "message": format!("Clinic '{}', '{}' updated successfully.", new.id, new.name),
        "old_data": old,
        "new_data": new
    })))
}

#[axum::debug_handler]
pub async fn delete_clinic(
    State(config): State<Arc<AppConfig>>,
    Path(clinic_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicService::new(&config);
    let clinic = service.delete_clinic(clinic_id).await?;

    Ok(Json(json!({
        "message": format!("Clinic '{}', '{}' deleted successfully.", clinic.id, clinic.name)
    })))
}
