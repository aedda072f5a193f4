use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::PostgrestQuery;

const REST_PREFIX: &str = "/rest/v1";

/// Failures callers branch on. Everything else stays a plain `anyhow` error.
#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    /// PostgREST answered 409: a unique, primary key or foreign key
    /// constraint rejected the write.
    #[error("Constraint violation: {0}")]
    Conflict(String),
}

/// True when `err` carries a [`SupabaseError::Conflict`].
pub fn is_constraint_violation(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<SupabaseError>(), Some(SupabaseError::Conflict(_)))
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: config.supabase_service_key.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.api_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                409 => SupabaseError::Conflict(error_text).into(),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// `GET /rest/v1/{table}?{query}`
    pub async fn select<T>(&self, table: &str, query: &str) -> Result<Vec<T>>
    where T: DeserializeOwned {
        let path = table_path(table, query);
        self.request(Method::GET, &path, None).await
    }

    pub async fn select_one<T>(&self, table: &str, query: &str) -> Result<Option<T>>
    where T: DeserializeOwned {
        let rows: Vec<T> = self.select(table, query).await?;
        Ok(rows.into_iter().next())
    }

    /// True when at least one row matches `filter`.
    pub async fn exists(&self, table: &str, filter: PostgrestQuery) -> Result<bool> {
        let query = filter.select("id").limit(1).build();
        let rows: Vec<Value> = self.select(table, &query).await?;
        Ok(!rows.is_empty())
    }

    pub async fn insert<T>(&self, table: &str, body: Value) -> Result<T>
    where T: DeserializeOwned {
        let path = table_path(table, "");
        let rows: Vec<T> = self.request_with_headers(
            Method::POST,
            &path,
            Some(body),
            Some(return_representation()),
        ).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow!("Insert into {} returned no rows", table))
    }

    pub async fn update<T>(&self, table: &str, filter: &str, body: Value) -> Result<Option<T>>
    where T: DeserializeOwned {
        let path = table_path(table, filter);
        let rows: Vec<T> = self.request_with_headers(
            Method::PATCH,
            &path,
            Some(body),
            Some(return_representation()),
        ).await?;

        Ok(rows.into_iter().next())
    }

    /// Deletes matching rows and returns how many were removed.
    pub async fn delete(&self, table: &str, filter: &str) -> Result<usize> {
        let path = table_path(table, filter);
        let rows: Vec<Value> = self.request_with_headers(
            Method::DELETE,
            &path,
            None,
            Some(return_representation()),
        ).await?;

        Ok(rows.len())
    }
}

fn table_path(table: &str, query: &str) -> String {
    if query.is_empty() {
        format!("{}/{}", REST_PREFIX, table)
    } else {
        format!("{}/{}?{}", REST_PREFIX, table, query)
    }
}

fn return_representation() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_path_appends_query_only_when_present() {
        assert_eq!(table_path("clinics", ""), "/rest/v1/clinics");
        assert_eq!(table_path("clinics", "id=eq.1"), "/rest/v1/clinics?id=eq.1");
    }

    #[test]
    fn only_conflicts_count_as_constraint_violations() {
        let conflict: anyhow::Error = SupabaseError::Conflict("duplicate key value".into()).into();
        assert!(is_constraint_violation(&conflict));
        assert_eq!(conflict.to_string(), "Constraint violation: duplicate key value");

        let other = anyhow!("API error (500): boom");
        assert!(!is_constraint_violation(&other));
    }
}
