use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::{PostgrestQuery, SupabaseClient};

use crate::models::{
    normalize_name, CatalogEntry, CatalogError, CatalogKind,
    CreateCatalogEntryRequest, UpdateCatalogEntryRequest,
};

const COLUMNS: &str = "id,name";

pub struct CatalogService {
    supabase: SupabaseClient,
    kind: CatalogKind,
}

impl CatalogService {
    pub fn new(config: &AppConfig, kind: CatalogKind) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            kind,
        }
    }

    pub async fn list(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        debug!("Listing {}", self.kind.table());

        let query = PostgrestQuery::new().select(COLUMNS).order("id").build();
        let entries = self.supabase.select(self.kind.table(), &query).await?;
        Ok(entries)
    }

    pub async fn get(&self, id: i64) -> Result<CatalogEntry, CatalogError> {
        debug!("Fetching {} {}", self.kind.label(), id);

        let query = PostgrestQuery::new().select(COLUMNS).eq("id", id).build();
        self.supabase.select_one(self.kind.table(), &query).await?
            .ok_or(CatalogError::NotFound { label: self.kind.label(), id })
    }

    pub async fn create(&self, request: CreateCatalogEntryRequest) -> Result<CatalogEntry, CatalogError> {
        let name = normalize_name(self.kind, &request.name)?;
        debug!("Creating {} '{}'", self.kind.label(), name);

        if self.name_taken(&name, None).await? {
            return Err(CatalogError::NameTaken { label: self.kind.label(), name });
        }

        let mut row = json!({ "name": name });
        if let Some(id) = request.id.filter(|id| *id != 0) {
            if self.id_exists(id).await? {
                return Err(CatalogError::IdTaken { label: self.kind.label(), id });
            }
            row["id"] = json!(id);
        }

        let entry: CatalogEntry = self.supabase.insert(self.kind.table(), row).await?;
        info!("{} {} '{}' created", self.kind.label(), entry.id, entry.name);

        Ok(entry)
    }

    /// Renames an entry and returns `(old, new)`.
    pub async fn update(
        &self,
        id: i64,
        request: UpdateCatalogEntryRequest,
    ) -> Result<(CatalogEntry, CatalogEntry), CatalogError> {
        debug!("Updating {} {}", self.kind.label(), id);

        if request.id.is_some_and(|body_id| body_id != 0 && body_id != id) {
            return Err(CatalogError::IdMismatch { label: self.kind.label() });
        }

        let old = self.get(id).await?;
        let name = normalize_name(self.kind, &request.name)?;

        if self.name_taken(&name, Some(id)).await? {
            return Err(CatalogError::NameTaken { label: self.kind.label(), name });
        }

        let filter = PostgrestQuery::new().eq("id", id).build();
        let updated: CatalogEntry = self.supabase
            .update(self.kind.table(), &filter, json!({ "name": name }))
            .await?
            .ok_or(CatalogError::NotFound { label: self.kind.label(), id })?;

        info!("{} {} renamed '{}' -> '{}'", self.kind.label(), id, old.name, updated.name);
        Ok((old, updated))
    }

    pub async fn delete(&self, id: i64) -> Result<CatalogEntry, CatalogError> {
        debug!("Deleting {} {}", self.kind.label(), id);

        let entry = self.get(id).await?;

        let referrer = self.kind.referrer();
        let in_use = self.supabase
            .exists(referrer.table, PostgrestQuery::new().eq(referrer.column, id))
            .await?;
        if in_use {
            return Err(CatalogError::InUse {
                label: self.kind.label(),
                id,
                referrers: referrer.label,
            });
        }

        self.supabase
            .delete(self.kind.table(), &PostgrestQuery::new().eq("id", id).build())
            .await?;

        info!("{} {} '{}' deleted", self.kind.label(), entry.id, entry.name);
        Ok(entry)
    }

    async fn id_exists(&self, id: i64) -> Result<bool, CatalogError> {
        Ok(self.supabase.exists(self.kind.table(), PostgrestQuery::new().eq("id", id)).await?)
    }

    async fn name_taken(&self, name: &str, except_id: Option<i64>) -> Result<bool, CatalogError> {
        let mut filter = PostgrestQuery::new().eq("name", name);
        if let Some(id) = except_id {
            filter = filter.neq("id", id);
        }
        Ok(self.supabase.exists(self.kind.table(), filter).await?)
    }
}
