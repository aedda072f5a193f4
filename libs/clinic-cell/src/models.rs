use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use shared_models::embed::{name_or, person_or};
use shared_database::is_constraint_violation;
use shared_models::error::AppError;
use shared_models::{full_name, NamedRef, PersonRef};

/// PostgREST select for a clinic with its staff and bookings embedded.
/// Appointments link clinics and doctors too, so every embed names its
/// foreign key column.
pub const CLINIC_SELECT: &str = "id,name,\
doctors!clinic_id(id,firstname,lastname),\
appointments!clinic_id(id,date,category_id,doctor_id,patient_id,\
category:categories!category_id(name),\
doctor:doctors!doctor_id(firstname,lastname),\
patient:patients!patient_id(firstname,lastname))";

#[derive(Debug, Clone, Deserialize)]
pub struct ClinicRow {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub doctors: Vec<ClinicDoctorRow>,
    #[serde(default)]
    pub appointments: Vec<ClinicAppointmentRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClinicDoctorRow {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClinicAppointmentRow {
    pub id: i64,
    pub date: NaiveDateTime,
    pub category_id: i64,
    pub doctor_id: i64,
    pub patient_id: i64,
    pub category: Option<NamedRef>,
    pub doctor: Option<PersonRef>,
    pub patient: Option<PersonRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clinic {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClinicDto {
    pub id: i64,
    pub name: String,
    pub doctors: Vec<ClinicDoctorDto>,
    pub appointments: Vec<ClinicAppointmentDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClinicDoctorDto {
    pub id: i64,
    pub fullname: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClinicAppointmentDto {
    pub id: i64,
    pub date: NaiveDateTime,
    pub category_id: i64,
    pub category: String,
    pub doctor_id: i64,
    pub doctor: String,
    pub patient_id: i64,
    pub patient: String,
}

impl From<ClinicRow> for ClinicDto {
    fn from(row: ClinicRow) -> Self {
        let mut doctors: Vec<ClinicDoctorDto> = row.doctors.into_iter()
            .map(|d| ClinicDoctorDto {
                id: d.id,
                fullname: full_name(&d.firstname, &d.lastname),
            })
            .collect();
        doctors.sort_by_key(|d| d.id);

        let mut appointments: Vec<ClinicAppointmentDto> = row.appointments.into_iter()
            .map(|a| ClinicAppointmentDto {
                id: a.id,
                date: a.date,
                category_id: a.category_id,
                category: name_or(&a.category, ""),
                doctor_id: a.doctor_id,
                doctor: person_or(&a.doctor, ""),
                patient_id: a.patient_id,
                patient: person_or(&a.patient, ""),
            })
            .collect();
        appointments.sort_by_key(|a| (a.date, a.id));

        Self {
            id: row.id,
            name: row.name,
            doctors,
            appointments,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClinicRequest {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateClinicRequest {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("Clinic with ID {0} not found")]
    NotFound(i64),

    #[error("Clinic with name {0} already exists")]
    NameTaken(String),

    #[error("Clinic with ID {0} already exists")]
    IdTaken(i64),

    #[error("Clinic Id and route Id need to be the same")]
    IdMismatch,

    #[error("Clinic with ID {0} is in use! Remove or change from Appointments and/or Doctors")]
    InUse(i64),

    #[error("{0}")]
    ValidationError(String),

    /// A write the database refused on a constraint.
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for ClinicError {
    fn from(err: anyhow::Error) -> Self {
        if is_constraint_violation(&err) {
            return ClinicError::Conflict(err.to_string());
        }
        ClinicError::DatabaseError(err.to_string())
    }
}

impl From<ClinicError> for AppError {
    fn from(err: ClinicError) -> Self {
        let message = err.to_string();
        match err {
            ClinicError::NotFound(_) => AppError::NotFound(message),
            ClinicError::NameTaken(_) | ClinicError::IdTaken(_) | ClinicError::InUse(_) => {
                AppError::Conflict(message)
            }
            ClinicError::IdMismatch => AppError::BadRequest(message),
            ClinicError::ValidationError(_) => AppError::ValidationError(message),
            ClinicError::Conflict(_) => AppError::Conflict(message),
            ClinicError::DatabaseError(_) => AppError::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_flattens_embedded_names() {
        let row: ClinicRow = serde_json::from_value(json!({
            "id": 1,
            "name": "Clinic A",
            "doctors": [
                { "id": 5, "firstname": "Leonard", "lastname": "McCoy" },
                { "id": 1, "firstname": "Gregory", "lastname": "House" }
            ],
            "appointments": [{
                "id": 1,
                "date": "2025-03-01T12:00:00",
                "category_id": 1,
                "doctor_id": 1,
                "patient_id": 1,
                "category": { "name": "Emergency" },
                "doctor": { "firstname": "Gregory", "lastname": "House" },
                "patient": { "firstname": "Harry", "lastname": "Potter" }
            }]
        })).unwrap();

        let dto = ClinicDto::from(row);
        assert_eq!(dto.doctors[0].fullname, "Gregory House");
        assert_eq!(dto.doctors[1].id, 5);
        assert_eq!(dto.appointments[0].category, "Emergency");
        assert_eq!(dto.appointments[0].patient, "Harry Potter");
    }

    #[test]
    fn missing_embeds_default_to_empty_lists() {
        let row: ClinicRow = serde_json::from_value(json!({ "id": 3, "name": "Clinic C" })).unwrap();
        let dto = ClinicDto::from(row);
        assert!(dto.doctors.is_empty());
        assert!(dto.appointments.is_empty());
    }
}
