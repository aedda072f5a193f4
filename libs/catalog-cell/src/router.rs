use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use shared_config::AppConfig;

use crate::handlers;
use crate::models::{CatalogKind, CatalogState};

pub fn catalog_routes(config: Arc<AppConfig>, kind: CatalogKind) -> Router {
    Router::new()
        .route("/", get(handlers::list_entries).post(handlers::create_entry))
        .route(
            "/{id}",
            get(handlers::get_entry)
                .put(handlers::update_entry)
                .delete(handlers::delete_entry),
        )
        .with_state(CatalogState { config, kind })
}

pub fn category_routes(config: Arc<AppConfig>) -> Router {
    catalog_routes(config, CatalogKind::Category)
}

pub fn speciality_routes(config: Arc<AppConfig>) -> Router {
    catalog_routes(config, CatalogKind::Speciality)
}
