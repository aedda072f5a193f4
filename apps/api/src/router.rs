use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use catalog_cell::router::{category_routes, speciality_routes};
use clinic_cell::router::clinic_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::patient_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    let api = Router::new()
        .nest("/category", category_routes(state.clone()))
        .nest("/speciality", speciality_routes(state.clone()))
        .nest("/clinic", clinic_routes(state.clone()))
        .nest("/doctor", doctor_routes(state.clone()))
        .nest("/patient", patient_routes(state.clone()))
        .nest("/appointment", appointment_routes(state));

    Router::new()
        .route("/", get(|| async { "Clinic Booking API is running!" }))
        .nest("/api", api)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use tower::ServiceExt;
    use wiremock::{MockServer, Mock, ResponseTemplate};
    use wiremock::matchers::{method, path};

    use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

    #[tokio::test]
    async fn root_reports_liveness() {
        let app = create_router(TestConfig::default().to_arc());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Clinic Booking API is running!");
    }

    #[tokio::test]
    async fn unknown_routes_are_404() {
        let app = create_router(TestConfig::default().to_arc());

        let response = app
            .oneshot(Request::builder().uri("/api/nurse").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cells_are_mounted_under_api() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/specialities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                MockSupabaseResponses::named_row(4, "Cardiology")
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let app = create_router(TestConfig::for_mock_server(&mock_server.uri()).to_arc());
        let response = app
            .oneshot(Request::builder().uri("/api/speciality").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
