use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn clinic_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_clinics).post(handlers::create_clinic))
        .route(
            "/{clinic_id}",
            get(handlers::get_clinic)
                .put(handlers::update_clinic)
                .delete(handlers::delete_clinic),
        )
        .with_state(state)
}
