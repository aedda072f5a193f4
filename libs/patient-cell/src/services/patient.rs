use chrono::{Local, NaiveDate};
use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::{PostgrestQuery, SupabaseClient};

use crate::models::{
    check_birthdate, is_valid_email, CreatePatientRequest, Patient, PatientDto,
    PatientError, PatientFields, PatientRow, UpdatePatientRequest, PATIENT_SELECT,
};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_patients(&self) -> Result<Vec<PatientDto>, PatientError> {
        debug!("Listing patients");

        let query = PostgrestQuery::new().select(PATIENT_SELECT).order("id").build();
        let rows: Vec<PatientRow> = self.supabase.select("patients", &query).await?;

        Ok(rows.into_iter().map(PatientDto::from).collect())
    }

    pub async fn get_patient(&self, patient_id: i64) -> Result<PatientDto, PatientError> {
        debug!("Fetching patient {}", patient_id);

        self.find_patient(patient_id).await?
            .map(PatientDto::from)
            .ok_or(PatientError::NotFound(patient_id))
    }

    pub async fn get_patient_by_email(&self, email: &str) -> Result<PatientDto, PatientError> {
        debug!("Looking up patient by email");

        let query = PostgrestQuery::new()
            .select(PATIENT_SELECT)
            .eq("email", email.trim())
            .build();

        self.supabase.select_one::<PatientRow>("patients", &query).await?
            .map(PatientDto::from)
            .ok_or(PatientError::EmailNotFound)
    }

    pub async fn create_patient(&self, request: CreatePatientRequest) -> Result<Patient, PatientError> {
        let fields = PatientFields {
            firstname: required(&request.firstname, "firstname")?,
            lastname: required(&request.lastname, "lastname")?,
            email: request.email.trim().to_string(),
            birthdate: request.birthdate,
        };
        debug!("Creating patient {} {}", fields.firstname, fields.lastname);

        check_email(&fields.email)?;
        check_birthdate(fields.birthdate, today())?;

        let explicit_id = request.id.filter(|id| *id != 0);
        if let Some(id) = explicit_id {
            if self.supabase.exists("patients", PostgrestQuery::new().eq("id", id)).await? {
                return Err(PatientError::IdTaken(id));
            }
        }

        if self.email_taken(&fields.email, None).await? {
            return Err(PatientError::EmailTaken(fields.email));
        }

        let mut row = json!(fields);
        if let Some(id) = explicit_id {
            row["id"] = json!(id);
        }

        let patient: Patient = self.supabase.insert("patients", row).await?;
        info!("Patient {} '{}' created", patient.id, patient.full_name());

        Ok(patient)
    }

    /// Applies a partial update and returns `(old, new)`.
    pub async fn update_patient(
        &self,
        patient_id: i64,
        request: UpdatePatientRequest,
    ) -> Result<(Patient, Patient), PatientError> {
        debug!("Updating patient {}", patient_id);

        if request.id.is_some_and(|body_id| body_id != 0 && body_id != patient_id) {
            return Err(PatientError::IdMismatch);
        }

        let current = self.find_patient(patient_id).await?
            .map(|row| row.patient())
            .ok_or(PatientError::NotFound(patient_id))?;

        let fields = request.merge_onto(&current);
        check_birthdate(fields.birthdate, today())?;

        // Stored addresses predating the format rule stay editable.
        if fields.email != current.email {
            check_email(&fields.email)?;
            if self.email_taken(&fields.email, Some(patient_id)).await? {
                return Err(PatientError::EmailTaken(fields.email));
            }
        }

        let filter = PostgrestQuery::new().eq("id", patient_id).build();
        let updated: Patient = self.supabase
            .update("patients", &filter, json!(fields))
            .await?
            .ok_or(PatientError::NotFound(patient_id))?;

        info!("Patient {} updated", patient_id);
        Ok((current, updated))
    }

    pub async fn delete_patient(&self, patient_id: i64) -> Result<Patient, PatientError> {
        debug!("Deleting patient {}", patient_id);

        let patient = self.find_patient(patient_id).await?
            .map(|row| row.patient())
            .ok_or(PatientError::NotFound(patient_id))?;

        let booked = PostgrestQuery::new().eq("patient_id", patient_id);
        if self.supabase.exists("appointments", booked).await? {
            return Err(PatientError::InUse(patient_id));
        }

        self.supabase
            .delete("patients", &PostgrestQuery::new().eq("id", patient_id).build())
            .await?;

        info!("Patient {} '{}' deleted", patient.id, patient.full_name());
        Ok(patient)
    }

    async fn find_patient(&self, patient_id: i64) -> Result<Option<PatientRow>, PatientError> {
        let query = PostgrestQuery::new()
            .select(PATIENT_SELECT)
            .eq("id", patient_id)
            .build();

        Ok(self.supabase.select_one("patients", &query).await?)
    }

    async fn email_taken(&self, email: &str, except_id: Option<i64>) -> Result<bool, PatientError> {
        let mut filter = PostgrestQuery::new().eq("email", email);
        if let Some(id) = except_id {
            filter = filter.neq("id", id);
        }

        Ok(self.supabase.exists("patients", filter).await?)
    }
}

fn check_email(email: &str) -> Result<(), PatientError> {
    if !is_valid_email(email) {
        return Err(PatientError::ValidationError(format!(
            "Email {} is not a valid email address",
            email
        )));
    }
    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn required(value: &str, field: &str) -> Result<String, PatientError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PatientError::ValidationError(format!("Patient {} is required", field)));
    }
    Ok(trimmed.to_string())
}
