use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use shared_database::is_constraint_violation;
use shared_models::embed::{name_or, person_or};
use shared_models::error::AppError;
use shared_models::{NamedRef, PersonRef};

pub const APPOINTMENT_SELECT: &str = "id,date,patient_note,doctor_note,\
category_id,clinic_id,doctor_id,patient_id,\
category:categories!category_id(name),\
clinic:clinics!clinic_id(name),\
doctor:doctors!doctor_id(firstname,lastname),\
patient:patients!patient_id(firstname,lastname)";

/// Format used for dates inside user-facing messages.
pub const MESSAGE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

// ==============================================================================
// ROWS AND DTOS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentRow {
    pub id: i64,
    pub date: NaiveDateTime,
    #[serde(default)]
    pub patient_note: Option<String>,
    #[serde(default)]
    pub doctor_note: Option<String>,
    pub category_id: i64,
    pub clinic_id: i64,
    pub doctor_id: i64,
    pub patient_id: i64,
    #[serde(default)]
    pub category: Option<NamedRef>,
    #[serde(default)]
    pub clinic: Option<NamedRef>,
    #[serde(default)]
    pub doctor: Option<PersonRef>,
    #[serde(default)]
    pub patient: Option<PersonRef>,
}

impl AppointmentRow {
    pub fn fields(&self) -> AppointmentFields {
        AppointmentFields {
            date: self.date,
            category_id: self.category_id,
            clinic_id: self.clinic_id,
            doctor_id: self.doctor_id,
            patient_id: self.patient_id,
            patient_note: self.patient_note.clone(),
            doctor_note: self.doctor_note.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentDto {
    pub id: i64,
    pub date: NaiveDateTime,
    pub category_id: i64,
    pub category: String,
    pub clinic_id: i64,
    pub clinic: String,
    pub doctor_id: i64,
    pub doctor: String,
    pub patient_id: i64,
    pub patient: String,
    pub patient_note: String,
    pub doctor_note: String,
}

impl From<AppointmentRow> for AppointmentDto {
    fn from(row: AppointmentRow) -> Self {
        Self {
            category: name_or(&row.category, ""),
            clinic: name_or(&row.clinic, ""),
            doctor: person_or(&row.doctor, ""),
            patient: person_or(&row.patient, ""),
            id: row.id,
            date: row.date,
            category_id: row.category_id,
            clinic_id: row.clinic_id,
            doctor_id: row.doctor_id,
            patient_id: row.patient_id,
            patient_note: row.patient_note.unwrap_or_default(),
            doctor_note: row.doctor_note.unwrap_or_default(),
        }
    }
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    #[serde(default)]
    pub id: Option<i64>,
    pub date: NaiveDateTime,
    pub category_id: i64,
    pub clinic_id: i64,
    pub doctor_id: i64,
    pub patient_id: i64,
    #[serde(default)]
    pub patient_note: Option<String>,
    #[serde(default)]
    pub doctor_note: Option<String>,
}

impl CreateAppointmentRequest {
    pub fn fields(&self) -> AppointmentFields {
        AppointmentFields {
            date: self.date,
            category_id: self.category_id,
            clinic_id: self.clinic_id,
            doctor_id: self.doctor_id,
            patient_id: self.patient_id,
            patient_note: non_blank(&self.patient_note),
            doctor_note: non_blank(&self.doctor_note),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub date: Option<NaiveDateTime>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub clinic_id: Option<i64>,
    #[serde(default)]
    pub doctor_id: Option<i64>,
    #[serde(default)]
    pub patient_id: Option<i64>,
    #[serde(default)]
    pub patient_note: Option<String>,
    #[serde(default)]
    pub doctor_note: Option<String>,
}

impl UpdateAppointmentRequest {
    /// Absent or zero ids, an absent date and absent or blank notes keep
    /// the stored value.
    pub fn merge_onto(&self, current: &AppointmentFields) -> AppointmentFields {
        AppointmentFields {
            date: self.date.unwrap_or(current.date),
            category_id: non_zero(self.category_id).unwrap_or(current.category_id),
            clinic_id: non_zero(self.clinic_id).unwrap_or(current.clinic_id),
            doctor_id: non_zero(self.doctor_id).unwrap_or(current.doctor_id),
            patient_id: non_zero(self.patient_id).unwrap_or(current.patient_id),
            patient_note: non_blank(&self.patient_note).or_else(|| current.patient_note.clone()),
            doctor_note: non_blank(&self.doctor_note).or_else(|| current.doctor_note.clone()),
        }
    }
}

/// Writable appointment columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentFields {
    pub date: NaiveDateTime,
    pub category_id: i64,
    pub clinic_id: i64,
    pub doctor_id: i64,
    pub patient_id: i64,
    pub patient_note: Option<String>,
    pub doctor_note: Option<String>,
}

fn non_zero(id: Option<i64>) -> Option<i64> {
    id.filter(|id| *id != 0)
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ==============================================================================
// SLOTS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AvailableSlotsQuery {
    pub doctor_id: i64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub id: usize,
    pub date: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableSlotsResponse {
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub available_slots: Vec<TimeSlot>,
    pub total: usize,
}

/// Only the booked time is needed when filtering slots.
#[derive(Debug, Clone, Deserialize)]
pub struct BookedTime {
    pub date: NaiveDateTime,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment with ID {0} not found")]
    NotFound(i64),

    #[error("Appointment with ID {0} already exists")]
    IdTaken(i64),

    #[error("Appointment Id and route Id need to be the same")]
    IdMismatch,

    #[error("{entity} with ID {id} does not exist")]
    MissingReference { entity: &'static str, id: i64 },

    #[error("Doctor with ID {0} not found")]
    DoctorNotFound(i64),

    #[error("{0}")]
    DateOutOfRange(String),

    #[error("Doctor {doctor} does not work in clinic {clinic}")]
    DoctorNotInClinic { doctor: String, clinic: String },

    #[error("Doctor {doctor} already has an appointment at {date}")]
    DoctorDoubleBooked { doctor: String, date: String },

    #[error("Patient {patient} already has an appointment at {date}")]
    PatientDoubleBooked { patient: String, date: String },

    #[error("{0}")]
    ValidationError(String),

    /// A write the database refused on a constraint.
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for AppointmentError {
    fn from(err: anyhow::Error) -> Self {
        if is_constraint_violation(&err) {
            return AppointmentError::Conflict(err.to_string());
        }
        AppointmentError::DatabaseError(err.to_string())
    }
}

impl From<doctor_cell::DoctorError> for AppointmentError {
    fn from(err: doctor_cell::DoctorError) -> Self {
        match err {
            doctor_cell::DoctorError::Conflict(message) => AppointmentError::Conflict(message),
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        let message = err.to_string();
        match err {
            AppointmentError::NotFound(_) | AppointmentError::DoctorNotFound(_) => {
                AppError::NotFound(message)
            }
            AppointmentError::IdTaken(_)
            | AppointmentError::DoctorDoubleBooked { .. }
            | AppointmentError::PatientDoubleBooked { .. } => AppError::Conflict(message),
            AppointmentError::IdMismatch
            | AppointmentError::MissingReference { .. }
            | AppointmentError::DoctorNotInClinic { .. } => AppError::BadRequest(message),
            AppointmentError::DateOutOfRange(_) | AppointmentError::ValidationError(_) => {
                AppError::ValidationError(message)
            }
            AppointmentError::Conflict(_) => AppError::Conflict(message),
            AppointmentError::DatabaseError(_) => AppError::Database(message),
        }
    }
}
