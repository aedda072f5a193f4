use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::{PostgrestQuery, SupabaseClient};

use crate::models::{
    Clinic, ClinicDto, ClinicError, ClinicRow, CreateClinicRequest,
    UpdateClinicRequest, CLINIC_SELECT,
};

pub struct ClinicService {
    supabase: SupabaseClient,
}

impl ClinicService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_clinics(&self) -> Result<Vec<ClinicDto>, ClinicError> {
        debug!("Listing clinics");

        let query = PostgrestQuery::new().select(CLINIC_SELECT).order("id").build();
        let rows: Vec<ClinicRow> = self.supabase.select("clinics", &query).await?;

        Ok(rows.into_iter().map(ClinicDto::from).collect())
    }

    pub async fn get_clinic(&self, id: i64) -> Result<ClinicDto, ClinicError> {
        debug!("Fetching clinic {}", id);

        let query = PostgrestQuery::new().select(CLINIC_SELECT).eq("id", id).build();
        let row: ClinicRow = self.supabase.select_one("clinics", &query).await?
            .ok_or(ClinicError::NotFound(id))?;

        Ok(ClinicDto::from(row))
    }

    pub async fn create_clinic(&self, request: CreateClinicRequest) -> Result<Clinic, ClinicError> {
        let name = normalize_name(&request.name)?;
        debug!("Creating clinic '{}'", name);

        if self.name_taken(&name, None).await? {
            return Err(ClinicError::NameTaken(name));
        }

        let mut row = json!({ "name": name });
        if let Some(id) = request.id.filter(|id| *id != 0) {
            if self.clinic_exists(id).await? {
                return Err(ClinicError::IdTaken(id));
            }
            row["id"] = json!(id);
        }

        let clinic: Clinic = self.supabase.insert("clinics", row).await?;
        info!("Clinic {} '{}' created", clinic.id, clinic.name);

        Ok(clinic)
    }

    /// Renames a clinic and returns `(old, new)`.
    pub async fn update_clinic(
        &self,
        id: i64,
        request: UpdateClinicRequest,
    ) -> Result<(Clinic, Clinic), ClinicError> {
        debug!("Updating clinic {}", id);

        if request.id.is_some_and(|body_id| body_id != 0 && body_id != id) {
            return Err(ClinicError::IdMismatch);
        }

        let old = self.find_clinic(id).await?.ok_or(ClinicError::NotFound(id))?;
        let name = normalize_name(&request.name)?;

        if self.name_taken(&name, Some(id)).await? {
            return Err(ClinicError::NameTaken(name));
        }

        let filter = PostgrestQuery::new().eq("id", id).build();
        let updated: Clinic = self.supabase
            .update("clinics", &filter, json!({ "name": name }))
            .await?
            .ok_or(ClinicError::NotFound(id))?;

        info!("Clinic {} renamed '{}' -> '{}'", id, old.name, updated.name);
        Ok((old, updated))
    }

    /// Deletes a clinic nothing points at.
    pub async fn delete_clinic(&self, id: i64) -> Result<Clinic, ClinicError> {
        debug!("Deleting clinic {}", id);

        let clinic = self.find_clinic(id).await?.ok_or(ClinicError::NotFound(id))?;

        let filter = PostgrestQuery::new().eq("clinic_id", id);
        if self.supabase.exists("appointments", filter.clone()).await?
            || self.supabase.exists("doctors", filter).await?
        {
            return Err(ClinicError::InUse(id));
        }

        self.supabase
            .delete("clinics", &PostgrestQuery::new().eq("id", id).build())
            .await?;

        info!("Clinic {} '{}' deleted", clinic.id, clinic.name);
        Ok(clinic)
    }

    async fn find_clinic(&self, id: i64) -> Result<Option<Clinic>, ClinicError> {
        let query = PostgrestQuery::new().select("id,name").eq("id", id).build();
        Ok(self.supabase.select_one("clinics", &query).await?)
    }

    async fn clinic_exists(&self, id: i64) -> Result<bool, ClinicError> {
        Ok(self.supabase.exists("clinics", PostgrestQuery::new().eq("id", id)).await?)
    }

    async fn name_taken(&self, name: &str, except_id: Option<i64>) -> Result<bool, ClinicError> {
        let mut filter = PostgrestQuery::new().eq("name", name);
        if let Some(id) = except_id {
            filter = filter.neq("id", id);
        }
        Ok(self.supabase.exists("clinics", filter).await?)
    }
}

fn normalize_name(raw: &str) -> Result<String, ClinicError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ClinicError::ValidationError("Clinic name is required".to_string()));
    }
    Ok(name.to_string())
}
