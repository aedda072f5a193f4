use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use serde_json::{json, Value};

use shared_config::AppConfig;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Config pointing at a wiremock server.
    pub fn for_mock_server(uri: &str) -> Self {
        Self {
            supabase_url: uri.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// `days` from today at `hour:minute`, the way appointment dates are stored.
pub fn local_datetime(days: i64, hour: u32, minute: u32) -> NaiveDateTime {
    let date = Local::now().date_naive() + Duration::days(days);
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
    date.and_time(time)
}

pub fn format_datetime(date: NaiveDateTime) -> String {
    date.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Canned PostgREST rows, shaped like the embedded selects the services issue.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn named_row(id: i64, name: &str) -> Value {
        json!({
            "id": id,
            "name": name
        })
    }

    pub fn clinic_response(id: i64, name: &str, doctors: Vec<Value>, appointments: Vec<Value>) -> Value {
        json!({
            "id": id,
            "name": name,
            "doctors": doctors,
            "appointments": appointments
        })
    }

    pub fn doctor_response(
        id: i64,
        firstname: &str,
        lastname: &str,
        clinic: Option<(i64, &str)>,
        speciality: Option<(i64, &str)>,
    ) -> Value {
        json!({
            "id": id,
            "firstname": firstname,
            "lastname": lastname,
            "clinic_id": clinic.map(|(id, _)| id),
            "speciality_id": speciality.map(|(id, _)| id),
            "clinic": clinic.map(|(_, name)| json!({ "name": name })),
            "speciality": speciality.map(|(_, name)| json!({ "name": name }))
        })
    }

    pub fn patient_response(id: i64, firstname: &str, lastname: &str, email: &str, birthdate: &str) -> Value {
        json!({
            "id": id,
            "firstname": firstname,
            "lastname": lastname,
            "email": email,
            "birthdate": birthdate,
            "appointments": []
        })
    }

    pub fn appointment_response(
        id: i64,
        date: NaiveDateTime,
        clinic_id: i64,
        doctor_id: i64,
        patient_id: i64,
        category_id: i64,
    ) -> Value {
        json!({
            "id": id,
            "date": format_datetime(date),
            "patient_note": null,
            "doctor_note": null,
            "category_id": category_id,
            "clinic_id": clinic_id,
            "doctor_id": doctor_id,
            "patient_id": patient_id,
            "category": { "name": "Check up" },
            "clinic": { "name": "Clinic A" },
            "doctor": { "firstname": "Gregory", "lastname": "House" },
            "patient": { "firstname": "Harry", "lastname": "Potter" }
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
