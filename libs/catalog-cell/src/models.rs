use std::sync::Arc;

use serde::{Deserialize, Serialize};

use shared_config::AppConfig;
use shared_database::is_constraint_violation;
use shared_models::error::AppError;

/// The two named lookup tables. They differ only in storage and in who
/// references them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Category,
    Speciality,
}

/// Column in another table that points at a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Referrer {
    pub table: &'static str,
    pub column: &'static str,
    pub label: &'static str,
}

impl CatalogKind {
    pub fn table(self) -> &'static str {
        match self {
            CatalogKind::Category => "categories",
            CatalogKind::Speciality => "specialities",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CatalogKind::Category => "Category",
            CatalogKind::Speciality => "Speciality",
        }
    }

    /// Key of the entry in create responses.
    pub fn key(self) -> &'static str {
        match self {
            CatalogKind::Category => "category",
            CatalogKind::Speciality => "speciality",
        }
    }

    pub fn referrer(self) -> Referrer {
        match self {
            CatalogKind::Category => Referrer {
                table: "appointments",
                column: "category_id",
                label: "Appointments",
            },
            CatalogKind::Speciality => Referrer {
                table: "doctors",
                column: "speciality_id",
                label: "Doctors",
            },
        }
    }
}

#[derive(Clone)]
pub struct CatalogState {
    pub config: Arc<AppConfig>,
    pub kind: CatalogKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCatalogEntryRequest {
    /// Explicit id; `None` or `0` lets the database assign one.
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCatalogEntryRequest {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{label} with ID {id} not found")]
    NotFound { label: &'static str, id: i64 },

    #[error("{label} with name {name} already exists")]
    NameTaken { label: &'static str, name: String },

    #[error("{label} with ID {id} already exists")]
    IdTaken { label: &'static str, id: i64 },

    #[error("{label} Id and route Id need to be the same")]
    IdMismatch { label: &'static str },

    #[error("{label} with ID {id} is in use! Remove or change from {referrers}")]
    InUse { label: &'static str, id: i64, referrers: &'static str },

    #[error("{0}")]
    ValidationError(String),

    /// A write the database refused on a constraint.
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        if is_constraint_violation(&err) {
            return CatalogError::Conflict(err.to_string());
        }
        CatalogError::DatabaseError(err.to_string())
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::NotFound { .. } => AppError::NotFound(message),
            CatalogError::NameTaken { .. }
            | CatalogError::IdTaken { .. }
            | CatalogError::InUse { .. } => AppError::Conflict(message),
            CatalogError::IdMismatch { .. } => AppError::BadRequest(message),
            CatalogError::ValidationError(_) => AppError::ValidationError(message),
            CatalogError::Conflict(_) => AppError::Conflict(message),
            CatalogError::DatabaseError(_) => AppError::Database(message),
        }
    }
}

/// Trimmed, non-empty name.
pub fn normalize_name(kind: CatalogKind, raw: &str) -> Result<String, CatalogError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(CatalogError::ValidationError(format!("{} name is required", kind.label())));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_point_at_their_referrers() {
        assert_eq!(CatalogKind::Category.referrer().table, "appointments");
        assert_eq!(CatalogKind::Speciality.referrer().column, "speciality_id");
    }

    #[test]
    fn name_is_trimmed_and_required() {
        assert_eq!(normalize_name(CatalogKind::Category, "  Emergency ").unwrap(), "Emergency");
        assert!(matches!(
            normalize_name(CatalogKind::Speciality, "   "),
            Err(CatalogError::ValidationError(_))
        ));
    }

    #[test]
    fn in_use_maps_to_conflict() {
        let err = CatalogError::InUse { label: "Category", id: 1, referrers: "Appointments" };
        let app: AppError = err.into();
        assert_eq!(app.message(), "Category with ID 1 is in use! Remove or change from Appointments");
        assert_eq!(app.status(), axum::http::StatusCode::CONFLICT);
    }
}
