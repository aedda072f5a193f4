use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use appointment_cell::models::{AppointmentError, UpdateAppointmentRequest};
use appointment_cell::router::appointment_routes;
use appointment_cell::services::BookingService;
use shared_utils::test_utils::{format_datetime, local_datetime, MockSupabaseResponses, TestConfig};

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

async fn mount_rows(mock_server: &MockServer, table: &str, column: &str, id: i64, rows: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/rest/v1/{}", table)))
        .and(query_param(column, format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(mock_server)
        .await;
}

/// Doctor 1 (Gregory House) works at Clinic A; category 2, clinic 1 and patient 1 exist.
async fn mount_booking_parties(mock_server: &MockServer) {
    mount_rows(mock_server, "doctors", "id", 1, json!([
        MockSupabaseResponses::doctor_response(1, "Gregory", "House", Some((1, "Clinic A")), Some((5, "Nephrology")))
    ])).await;
    mount_rows(mock_server, "categories", "id", 2, json!([{ "id": 2 }])).await;
    mount_rows(mock_server, "clinics", "id", 1, json!([{ "name": "Clinic A" }])).await;
    mount_rows(mock_server, "patients", "id", 1, json!([{ "firstname": "Harry", "lastname": "Potter" }])).await;
}

fn booking_body(date: NaiveDateTime) -> Value {
    json!({
        "date": format_datetime(date),
        "category_id": 2,
        "clinic_id": 1,
        "doctor_id": 1,
        "patient_id": 1,
        "patient_note": "Was dead, but resurrected. Lasting effects?"
    })
}

#[tokio::test]
async fn books_free_slot() {
    let mock_server = MockServer::start().await;
    let tomorrow = local_datetime(1, 9, 30);
    mount_booking_parties(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("date", format!("eq.{}", format_datetime(tomorrow))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": 4,
            "date": format_datetime(tomorrow),
            "category_id": 2,
            "clinic_id": 1,
            "doctor_id": 1,
            "patient_id": 1
        }])))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_rows(&mock_server, "appointments", "id", 4, json!([
        MockSupabaseResponses::appointment_response(4, tomorrow, 1, 1, 1, 2)
    ])).await;

    let app = appointment_routes(TestConfig::for_mock_server(&mock_server.uri()).to_arc());
    let (status, body) = send(app, "POST", "/", Some(booking_body(tomorrow))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment"]["id"], 4);
    assert_eq!(body["appointment"]["doctor"], "Gregory House");
    assert_eq!(body["appointment"]["doctor_note"], "");
}

#[tokio::test]
async fn doctor_must_work_at_the_clinic() {
    let mock_server = MockServer::start().await;
    mount_rows(&mock_server, "doctors", "id", 2, json!([
        MockSupabaseResponses::doctor_response(2, "Shaun", "Murphy", Some((2, "Clinic B")), Some((1, "Surgery")))
    ])).await;
    mount_booking_parties(&mock_server).await;

    let mut body = booking_body(local_datetime(1, 10, 0));
    body["doctor_id"] = json!(2);

    let app = appointment_routes(TestConfig::for_mock_server(&mock_server.uri()).to_arc());
    let (status, body) = send(app, "POST", "/", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Doctor Shaun Murphy does not work in clinic Clinic A");
}

#[tokio::test]
async fn unknown_category_is_named_in_the_error() {
    let mock_server = MockServer::start().await;
    mount_booking_parties(&mock_server).await;
    mount_rows(&mock_server, "categories", "id", 9, json!([])).await;

    let mut body = booking_body(local_datetime(1, 10, 0));
    body["category_id"] = json!(9);

    let app = appointment_routes(TestConfig::for_mock_server(&mock_server.uri()).to_arc());
    let (status, body) = send(app, "POST", "/", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Category with ID 9 does not exist");
}

#[tokio::test]
async fn past_dates_are_rejected() {
    let mock_server = MockServer::start().await;
    mount_booking_parties(&mock_server).await;

    let app = appointment_routes(TestConfig::for_mock_server(&mock_server.uri()).to_arc());
    let (status, body) = send(app, "POST", "/", Some(booking_body(local_datetime(-1, 10, 0)))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Appointment date can not be in the past");
}

#[tokio::test]
async fn doctor_cannot_be_double_booked() {
    let mock_server = MockServer::start().await;
    let slot = local_datetime(2, 12, 0);
    mount_booking_parties(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", "eq.1"))
        .and(query_param("date", format!("eq.{}", format_datetime(slot))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = appointment_routes(TestConfig::for_mock_server(&mock_server.uri()).to_arc());
    let (status, body) = send(app, "POST", "/", Some(booking_body(slot))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        format!("Doctor Gregory House already has an appointment at {}", slot.format("%Y-%m-%d %H:%M"))
    );
}

#[tokio::test]
async fn patient_cannot_be_double_booked() {
    let mock_server = MockServer::start().await;
    let slot = local_datetime(3, 9, 45);
    mount_booking_parties(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", "eq.1"))
        .and(query_param("date", format!("eq.{}", format_datetime(slot))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", "eq.1"))
        .and(query_param("date", format!("eq.{}", format_datetime(slot))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 2 }])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = appointment_routes(TestConfig::for_mock_server(&mock_server.uri()).to_arc());
    let (status, body) = send(app, "POST", "/", Some(booking_body(slot))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        format!("Patient Harry Potter already has an appointment at {}", slot.format("%Y-%m-%d %H:%M"))
    );
}

#[tokio::test]
async fn dates_beyond_fifty_years_are_rejected() {
    let mock_server = MockServer::start().await;
    mount_booking_parties(&mock_server).await;

    let app = appointment_routes(TestConfig::for_mock_server(&mock_server.uri()).to_arc());
    let (status, body) = send(app, "POST", "/", Some(booking_body(local_datetime(365 * 51, 10, 0)))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Appointment date can not be more than 50 years ahead");
}

#[tokio::test]
async fn moving_an_appointment_checks_the_doctor_excluding_itself() {
    let mock_server = MockServer::start().await;
    let booked = local_datetime(1, 12, 0);
    let moved_to = local_datetime(2, 13, 0);
    mount_rows(&mock_server, "appointments", "id", 1, json!([
        MockSupabaseResponses::appointment_response(1, booked, 1, 1, 1, 2)
    ])).await;
    mount_booking_parties(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", "eq.1"))
        .and(query_param("date", format!("eq.{}", format_datetime(moved_to))))
        .and(query_param("id", "neq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 3 }])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = appointment_routes(TestConfig::for_mock_server(&mock_server.uri()).to_arc());
    let (status, body) = send(app, "PUT", "/1", Some(json!({ "date": format_datetime(moved_to) }))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        format!("Doctor Gregory House already has an appointment at {}", moved_to.format("%Y-%m-%d %H:%M"))
    );
}

#[tokio::test]
async fn note_only_update_skips_double_booking_checks() {
    let mock_server = MockServer::start().await;
    let slot = local_datetime(1, 12, 0);
    let mut stored = MockSupabaseResponses::appointment_response(1, slot, 1, 1, 1, 2);
    stored["patient_note"] = json!("Was dead, but resurrected. Lasting effects?");
    mount_rows(&mock_server, "appointments", "id", 1, json!([stored])).await;
    mount_booking_parties(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("date", format!("eq.{}", format_datetime(slot))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 1,
            "date": format_datetime(slot),
            "category_id": 2,
            "clinic_id": 1,
            "doctor_id": 1,
            "patient_id": 1
        }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::for_mock_server(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);
    let result = service.update_appointment(1, UpdateAppointmentRequest {
        doctor_note: Some("Scar is fine".into()),
        ..Default::default()
    }).await;

    let (old, _) = result.unwrap();
    assert_eq!(old.patient_note, "Was dead, but resurrected. Lasting effects?");
}

#[tokio::test]
async fn update_rejects_mismatched_ids() {
    let config = TestConfig::default().to_app_config();
    let service = BookingService::new(&config);

    let result = service.update_appointment(1, UpdateAppointmentRequest {
        id: Some(2),
        ..Default::default()
    }).await;

    assert_matches!(result, Err(AppointmentError::IdMismatch));
}

#[tokio::test]
async fn delete_reports_patient_and_time() {
    let mock_server = MockServer::start().await;
    let slot = local_datetime(0, 12, 0);
    mount_rows(&mock_server, "appointments", "id", 1, json!([
        MockSupabaseResponses::appointment_response(1, slot, 1, 1, 1, 1)
    ])).await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = appointment_routes(TestConfig::for_mock_server(&mock_server.uri()).to_arc());
    let (status, body) = send(app, "DELETE", "/1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        format!(
            "Appointment '1', with patient 'Harry Potter' at '{}' deleted successfully.",
            slot.format("%Y-%m-%d %H:%M")
        )
    );
}

#[tokio::test]
async fn available_slots_skip_booked_times() {
    let mock_server = MockServer::start().await;
    mount_rows(&mock_server, "doctors", "id", 1, json!([
        MockSupabaseResponses::doctor_response(1, "Gregory", "House", Some((1, "Clinic A")), None)
    ])).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", "eq.1"))
        .and(query_param("date", "gte.2030-01-02T00:00:00"))
        .and(query_param("date", "lt.2030-01-03T00:00:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "date": "2030-01-02T12:00:00" }
        ])))
        .mount(&mock_server)
        .await;

    let app = appointment_routes(TestConfig::for_mock_server(&mock_server.uri()).to_arc());
    let (status, body) = send(app, "GET", "/available-slots?doctor_id=1&date=2030-01-02", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 15);
    assert_eq!(body["available_slots"][0]["date"], "2030-01-02T09:00:00");
    assert_eq!(body["available_slots"][8]["id"], 10);
    assert_eq!(body["available_slots"][8]["date"], "2030-01-02T12:15:00");
}

#[tokio::test]
async fn available_slots_for_unknown_doctor_is_404() {
    let mock_server = MockServer::start().await;
    mount_rows(&mock_server, "doctors", "id", 42, json!([])).await;

    let app = appointment_routes(TestConfig::for_mock_server(&mock_server.uri()).to_arc());
    let (status, body) = send(app, "GET", "/available-slots?doctor_id=42&date=2030-01-02", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Doctor with ID 42 not found");
}

#[tokio::test]
async fn available_slots_on_the_last_representable_day_is_400() {
    let mock_server = MockServer::start().await;
    mount_rows(&mock_server, "doctors", "id", 1, json!([
        MockSupabaseResponses::doctor_response(1, "Gregory", "House", Some((1, "Clinic A")), None)
    ])).await;

    let uri = format!(
        "/available-slots?doctor_id=1&date={}",
        NaiveDate::MAX.to_string().replace('+', "%2B")
    );
    let app = appointment_routes(TestConfig::for_mock_server(&mock_server.uri()).to_arc());
    let (status, body) = send(app, "GET", &uri, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], format!("Date {} is out of range", NaiveDate::MAX));
}
