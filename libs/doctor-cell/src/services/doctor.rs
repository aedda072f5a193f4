use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::{PostgrestQuery, SupabaseClient};

use crate::models::{
    name_matches, CreateDoctorRequest, DoctorDto, DoctorError, DoctorFields,
    DoctorRow, UpdateDoctorRequest, DOCTOR_SELECT,
};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_doctors(&self) -> Result<Vec<DoctorDto>, DoctorError> {
        debug!("Listing doctors");

        let rows = self.all_doctors().await?;
        Ok(rows.into_iter().map(DoctorDto::from).collect())
    }

    pub async fn get_doctor(&self, doctor_id: i64) -> Result<DoctorDto, DoctorError> {
        debug!("Fetching doctor {}", doctor_id);

        self.find_doctor(doctor_id).await?
            .map(DoctorDto::from)
            .ok_or(DoctorError::NotFound(doctor_id))
    }

    /// Doctor row with clinic and speciality names, if it exists.
    pub async fn find_doctor(&self, doctor_id: i64) -> Result<Option<DoctorRow>, DoctorError> {
        let query = PostgrestQuery::new()
            .select(DOCTOR_SELECT)
            .eq("id", doctor_id)
            .build();

        Ok(self.supabase.select_one("doctors", &query).await?)
    }

    /// Doctors whose first, last or full name contains `query`.
    pub async fn search_doctors(&self, query: &str) -> Result<Vec<DoctorDto>, DoctorError> {
        let needle = query.trim();
        if needle.is_empty() {
            return Err(DoctorError::ValidationError("Search query must not be empty".to_string()));
        }
        debug!("Searching doctors by name '{}'", needle);

        let matches: Vec<DoctorDto> = self.all_doctors().await?
            .into_iter()
            .filter(|d| name_matches(&d.firstname, &d.lastname, needle))
            .map(DoctorDto::from)
            .collect();

        if matches.is_empty() {
            return Err(DoctorError::NoneMatching(needle.to_string()));
        }

        Ok(matches)
    }

    pub async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<DoctorDto, DoctorError> {
        let fields = DoctorFields {
            firstname: required(&request.firstname, "firstname")?,
            lastname: required(&request.lastname, "lastname")?,
            clinic_id: request.clinic_id,
            speciality_id: request.speciality_id,
        };
        debug!("Creating doctor {} {}", fields.firstname, fields.lastname);

        let explicit_id = request.id.filter(|id| *id != 0);
        if let Some(id) = explicit_id {
            if self.supabase.exists("doctors", PostgrestQuery::new().eq("id", id)).await? {
                return Err(DoctorError::IdTaken(id));
            }
        }

        self.check_references(&fields).await?;

        let mut row = json!(fields);
        if let Some(id) = explicit_id {
            row["id"] = json!(id);
        }

        let created: DoctorRow = self.supabase.insert("doctors", row).await?;
        info!("Doctor {} '{}' created", created.id, created.full_name());

        self.get_doctor(created.id).await
    }

    /// Applies a partial update and returns `(old, new)`.
    pub async fn update_doctor(
        &self,
        doctor_id: i64,
        request: UpdateDoctorRequest,
    ) -> Result<(DoctorDto, DoctorDto), DoctorError> {
        debug!("Updating doctor {}", doctor_id);

        if request.id.is_some_and(|body_id| body_id != 0 && body_id != doctor_id) {
            return Err(DoctorError::IdMismatch);
        }

        let current = self.find_doctor(doctor_id).await?
            .ok_or(DoctorError::NotFound(doctor_id))?;

        let fields = request.merge_onto(&current);
        self.check_references(&fields).await?;

        let filter = PostgrestQuery::new().eq("id", doctor_id).build();
        self.supabase
            .update::<DoctorRow>("doctors", &filter, json!(fields))
            .await?
            .ok_or(DoctorError::NotFound(doctor_id))?;

        let updated = self.get_doctor(doctor_id).await?;
        info!("Doctor {} updated", doctor_id);

        Ok((DoctorDto::from(current), updated))
    }

    pub async fn delete_doctor(&self, doctor_id: i64) -> Result<DoctorDto, DoctorError> {
        debug!("Deleting doctor {}", doctor_id);

        let doctor = self.get_doctor(doctor_id).await?;

        let booked = PostgrestQuery::new().eq("doctor_id", doctor_id);
        if self.supabase.exists("appointments", booked).await? {
            return Err(DoctorError::InUse(doctor_id));
        }

        self.supabase
            .delete("doctors", &PostgrestQuery::new().eq("id", doctor_id).build())
            .await?;

        info!("Doctor {} '{} {}' deleted", doctor.id, doctor.firstname, doctor.lastname);
        Ok(doctor)
    }

    async fn all_doctors(&self) -> Result<Vec<DoctorRow>, DoctorError> {
        let query = PostgrestQuery::new().select(DOCTOR_SELECT).order("id").build();
        Ok(self.supabase.select("doctors", &query).await?)
    }

    async fn check_references(&self, fields: &DoctorFields) -> Result<(), DoctorError> {
        if let Some(clinic_id) = fields.clinic_id {
            let filter = PostgrestQuery::new().eq("id", clinic_id);
            if !self.supabase.exists("clinics", filter).await? {
                return Err(DoctorError::ClinicNotFound(clinic_id));
            }
        }

        if let Some(speciality_id) = fields.speciality_id {
            let filter = PostgrestQuery::new().eq("id", speciality_id);
            if !self.supabase.exists("specialities", filter).await? {
                return Err(DoctorError::SpecialityNotFound(speciality_id));
            }
        }

        Ok(())
    }
}

fn required(value: &str, field: &str) -> Result<String, DoctorError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DoctorError::ValidationError(format!("Doctor {} is required", field)));
    }
    Ok(trimmed.to_string())
}
