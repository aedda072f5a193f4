use chrono::{Months, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use shared_models::embed::{name_or, person_or};
use shared_database::is_constraint_violation;
use shared_models::error::AppError;
use shared_models::{full_name, NamedRef, PersonRef};

/// Patient columns plus their bookings, each with category, doctor and
/// clinic names.
pub const PATIENT_SELECT: &str = "id,firstname,lastname,email,birthdate,\
appointments!patient_id(id,date,category_id,doctor_id,clinic_id,\
category:categories!category_id(name),\
doctor:doctors!doctor_id(firstname,lastname),\
clinic:clinics!clinic_id(name))";

/// Oldest accepted patient, in years.
pub const MAX_AGE_YEARS: u32 = 120;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
const EMAIL_MAX_LEN: usize = 254;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub birthdate: NaiveDate,
}

impl Patient {
    pub fn full_name(&self) -> String {
        full_name(&self.firstname, &self.lastname)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientRow {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub birthdate: NaiveDate,
    #[serde(default)]
    pub appointments: Vec<PatientAppointmentRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientAppointmentRow {
    pub id: i64,
    pub date: NaiveDateTime,
    pub category_id: i64,
    pub doctor_id: i64,
    pub clinic_id: i64,
    pub category: Option<NamedRef>,
    pub doctor: Option<PersonRef>,
    pub clinic: Option<NamedRef>,
}

impl PatientRow {
    pub fn patient(&self) -> Patient {
        Patient {
            id: self.id,
            firstname: self.firstname.clone(),
            lastname: self.lastname.clone(),
            email: self.email.clone(),
            birthdate: self.birthdate,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientDto {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub birthdate: NaiveDate,
    pub appointments: Vec<PatientAppointmentDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientAppointmentDto {
    pub id: i64,
    pub date: NaiveDateTime,
    pub category_id: i64,
    pub category: String,
    pub doctor_id: i64,
    pub doctor: String,
    pub clinic_id: i64,
    pub clinic: String,
}

impl From<PatientRow> for PatientDto {
    fn from(row: PatientRow) -> Self {
        let mut appointments: Vec<PatientAppointmentDto> = row.appointments.into_iter()
            .map(|a| PatientAppointmentDto {
                id: a.id,
                date: a.date,
                category_id: a.category_id,
                category: name_or(&a.category, ""),
                doctor_id: a.doctor_id,
                doctor: person_or(&a.doctor, ""),
                clinic_id: a.clinic_id,
                clinic: name_or(&a.clinic, ""),
            })
            .collect();
        appointments.sort_by_key(|a| (a.date, a.id));

        Self {
            id: row.id,
            firstname: row.firstname,
            lastname: row.lastname,
            email: row.email,
            birthdate: row.birthdate,
            appointments,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    #[serde(default)]
    pub id: Option<i64>,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub birthdate: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub birthdate: Option<NaiveDate>,
}

/// Writable patient columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientFields {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub birthdate: NaiveDate,
}

impl UpdatePatientRequest {
    /// Absent or blank fields keep the stored value.
    pub fn merge_onto(&self, current: &Patient) -> PatientFields {
        PatientFields {
            firstname: non_blank(&self.firstname).unwrap_or_else(|| current.firstname.clone()),
            lastname: non_blank(&self.lastname).unwrap_or_else(|| current.lastname.clone()),
            email: non_blank(&self.email).unwrap_or_else(|| current.email.clone()),
            birthdate: self.birthdate.unwrap_or(current.birthdate),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= EMAIL_MAX_LEN
        && Regex::new(EMAIL_PATTERN)
            .map(|re| re.is_match(email))
            .unwrap_or(false)
}

/// Checks `today - 120 years <= birthdate <= today`.
pub fn check_birthdate(birthdate: NaiveDate, today: NaiveDate) -> Result<(), PatientError> {
    if birthdate > today {
        return Err(PatientError::ValidationError(
            "Birthdate can not be in the future".to_string(),
        ));
    }

    let oldest = today
        .checked_sub_months(Months::new(MAX_AGE_YEARS * 12))
        .unwrap_or(NaiveDate::MIN);
    if birthdate < oldest {
        return Err(PatientError::ValidationError(format!(
            "Birthdate can not be more than {} years ago",
            MAX_AGE_YEARS
        )));
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient with ID {0} not found")]
    NotFound(i64),

    #[error("No patients with this email")]
    EmailNotFound,

    #[error("Patient with email {0} already exists")]
    EmailTaken(String),

    #[error("Patient with ID {0} already exists")]
    IdTaken(i64),

    #[error("Patient Id and route Id need to be the same")]
    IdMismatch,

    #[error("Patient with ID {0} is in use! Remove or change from Appointments")]
    InUse(i64),

    #[error("{0}")]
    ValidationError(String),

    /// A write the database refused on a constraint.
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for PatientError {
    fn from(err: anyhow::Error) -> Self {
        if is_constraint_violation(&err) {
            return PatientError::Conflict(err.to_string());
        }
        PatientError::DatabaseError(err.to_string())
    }
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        let message = err.to_string();
        match err {
            PatientError::NotFound(_) | PatientError::EmailNotFound => AppError::NotFound(message),
            PatientError::EmailTaken(_) | PatientError::IdTaken(_) | PatientError::InUse(_) => {
                AppError::Conflict(message)
            }
            PatientError::IdMismatch => AppError::BadRequest(message),
            PatientError::ValidationError(_) => AppError::ValidationError(message),
            PatientError::Conflict(_) => AppError::Conflict(message),
            PatientError::DatabaseError(_) => AppError::Database(message),
        }
    }
}
