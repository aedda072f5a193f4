use serde::{Deserialize, Serialize};

use shared_models::embed::name_or;
use shared_database::is_constraint_violation;
use shared_models::error::AppError;
use shared_models::{full_name, NamedRef};

pub const DOCTOR_SELECT: &str = "id,firstname,lastname,clinic_id,speciality_id,\
clinic:clinics!clinic_id(name),\
speciality:specialities!speciality_id(name)";

pub const UNKNOWN_CLINIC: &str = "Unknown Clinic";
pub const UNKNOWN_SPECIALITY: &str = "Unknown Speciality";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorRow {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub clinic_id: Option<i64>,
    pub speciality_id: Option<i64>,
    #[serde(default)]
    pub clinic: Option<NamedRef>,
    #[serde(default)]
    pub speciality: Option<NamedRef>,
}

impl DoctorRow {
    pub fn full_name(&self) -> String {
        full_name(&self.firstname, &self.lastname)
    }

    pub fn works_at(&self, clinic_id: i64) -> bool {
        self.clinic_id == Some(clinic_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorDto {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub clinic_id: Option<i64>,
    pub clinic: String,
    pub speciality_id: Option<i64>,
    pub speciality: String,
}

impl From<DoctorRow> for DoctorDto {
    fn from(row: DoctorRow) -> Self {
        Self {
            clinic: name_or(&row.clinic, UNKNOWN_CLINIC),
            speciality: name_or(&row.speciality, UNKNOWN_SPECIALITY),
            id: row.id,
            firstname: row.firstname,
            lastname: row.lastname,
            clinic_id: row.clinic_id,
            speciality_id: row.speciality_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    #[serde(default)]
    pub id: Option<i64>,
    pub firstname: String,
    pub lastname: String,
    #[serde(default)]
    pub clinic_id: Option<i64>,
    #[serde(default)]
    pub speciality_id: Option<i64>,
}

/// Partial update; absent or blank fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub clinic_id: Option<i64>,
    #[serde(default)]
    pub speciality_id: Option<i64>,
}

/// Writable columns of a doctor after merging an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorFields {
    pub firstname: String,
    pub lastname: String,
    pub clinic_id: Option<i64>,
    pub speciality_id: Option<i64>,
}

impl UpdateDoctorRequest {
    pub fn merge_onto(&self, current: &DoctorRow) -> DoctorFields {
        DoctorFields {
            firstname: non_blank(&self.firstname).unwrap_or_else(|| current.firstname.clone()),
            lastname: non_blank(&self.lastname).unwrap_or_else(|| current.lastname.clone()),
            clinic_id: self.clinic_id.or(current.clinic_id),
            speciality_id: self.speciality_id.or(current.speciality_id),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Case-insensitive substring match against first name, last name or both.
pub fn name_matches(firstname: &str, lastname: &str, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }

    firstname.to_lowercase().contains(&needle)
        || lastname.to_lowercase().contains(&needle)
        || full_name(firstname, lastname).to_lowercase().contains(&needle)
}

#[derive(Debug, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor with ID {0} not found")]
    NotFound(i64),

    #[error("Doctor with name containing '{0}' not found")]
    NoneMatching(String),

    #[error("Doctor with ID {0} already exists")]
    IdTaken(i64),

    #[error("Doctor Id in the route and body must match")]
    IdMismatch,

    #[error("Clinic with ID {0} does not exist. Please provide a valid clinic_id")]
    ClinicNotFound(i64),

    #[error("Speciality with ID {0} does not exist. Please provide a valid speciality_id")]
    SpecialityNotFound(i64),

    #[error("Doctor with ID {0} is in use! Remove or change from Appointments")]
    InUse(i64),

    #[error("{0}")]
    ValidationError(String),

    /// A write the database refused on a constraint.
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for DoctorError {
    fn from(err: anyhow::Error) -> Self {
        if is_constraint_violation(&err) {
            return DoctorError::Conflict(err.to_string());
        }
        DoctorError::DatabaseError(err.to_string())
    }
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        let message = err.to_string();
        match err {
            DoctorError::NotFound(_) | DoctorError::NoneMatching(_) => AppError::NotFound(message),
            DoctorError::IdTaken(_) | DoctorError::InUse(_) => AppError::Conflict(message),
            DoctorError::IdMismatch
            | DoctorError::ClinicNotFound(_)
            | DoctorError::SpecialityNotFound(_) => AppError::BadRequest(message),
            DoctorError::ValidationError(_) => AppError::ValidationError(message),
            DoctorError::Conflict(_) => AppError::Conflict(message),
            DoctorError::DatabaseError(_) => AppError::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn house() -> DoctorRow {
        DoctorRow {
            id: 1,
            firstname: "Gregory".into(),
            lastname: "House".into(),
            clinic_id: Some(1),
            speciality_id: Some(5),
            clinic: Some(NamedRef { name: "Clinic A".into() }),
            speciality: None,
        }
    }

    #[test]
    fn dto_falls_back_for_missing_relations() {
        let dto = DoctorDto::from(house());
        assert_eq!(dto.clinic, "Clinic A");
        assert_eq!(dto.speciality, UNKNOWN_SPECIALITY);
    }

    #[test]
    fn merge_keeps_blank_and_absent_fields() {
        let request = UpdateDoctorRequest {
            firstname: Some("  ".into()),
            clinic_id: Some(2),
            ..Default::default()
        };

        let merged = request.merge_onto(&house());
        assert_eq!(merged.firstname, "Gregory");
        assert_eq!(merged.lastname, "House");
        assert_eq!(merged.clinic_id, Some(2));
        assert_eq!(merged.speciality_id, Some(5));
    }

    #[test]
    fn search_matches_parts_and_full_name() {
        assert!(name_matches("Gregory", "House", "greg"));
        assert!(name_matches("Gregory", "House", "HOUSE"));
        assert!(name_matches("Gregory", "House", "ory Hou"));
        assert!(!name_matches("Gregory", "House", "Watson"));
        assert!(!name_matches("Gregory", "House", "   "));
    }

    #[test]
    fn works_at_compares_clinic() {
        assert!(house().works_at(1));
        assert!(!house().works_at(2));
    }
}
