use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;

use crate::models::{CatalogState, CreateCatalogEntryRequest, UpdateCatalogEntryRequest};
use crate::services::CatalogService;

fn service(state: &CatalogState) -> CatalogService {
    CatalogService::new(&state.config, state.kind)
}

#[axum::debug_handler]
pub async fn list_entries(
    State(state): State<CatalogState>,
) -> Result<Json<Value>, AppError> {
    let entries = service(&state).list().await?;
    Ok(Json(json!(entries)))
}

#[axum::debug_handler]
pub async fn get_entry(
    State(state): State<CatalogState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let entry = service(&state).get(id).await?;
    Ok(Json(json!(entry)))
}

#[axum::debug_handler]
pub async fn create_entry(
    State(state): State<CatalogState>,
    Json(request): Json<CreateCatalogEntryRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let entry = service(&state).create(request).await?;

    let mut body = json!({
        "message": format!("{} {} created", state.kind.label(), entry.name),
    });
    body[state.kind.key()] = json!(entry);

    Ok((StatusCode::CREATED, Json(body)))
}

#[axum::debug_handler]
pub async fn update_entry(
    State(state): State<CatalogState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateCatalogEntryRequest>,
) -> Result<Json<Value>, AppError> {
    let (old, new) = service(&state).update(id, request).await?;

    Ok(Json(json!({
        "message": format!("{} '{}', '{}' updated successfully.", state.kind.label(), new.id, new.name),
        "old_data": old,
        "new_data": new
    })))
}

#[axum::debug_handler]
pub async fn delete_entry(
    State(state): State<CatalogState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let entry = service(&state).delete(id).await?;

    Ok(Json(json!({
        "message": format!("{} '{}', '{}' deleted successfully.", state.kind.label(), entry.id, entry.name)
    })))
}
