//! Supabase REST API client using service_role key

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use crate::config::Config;

/// Supabase client for server-side database operations
/// Uses service_role key which bypasses RLS - handle with care!
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            service_role_key: config.supabase_service_role_key.clone(),
        }
    }

    /// Get the REST API URL for a table
    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Attach the service-role auth headers to a request
    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.service_role_key)
            .header(
                "Authorization",
                format!("Bearer {}", self.service_role_key),
            )
            .header("Content-Type", "application/json")
    }

    /// Turn a non-2xx response into an error, preserving status and body
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SupabaseError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(SupabaseError::Api {
            status: status.as_u16(),
            body,
        })
    }

    /// Make an authenticated GET request
    pub async fn get<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
    ) -> Result<Vec<T>, SupabaseError> {
        let url = format!("{}?{}", self.rest_url(table), query);

        let response = self
            .authed(self.client.get(&url))
            .send()
            .await
            .map_err(SupabaseError::Request)?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(SupabaseError::Parse)
    }

    /// Make an authenticated GET request expecting a single row
    pub async fn get_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
    ) -> Result<Option<T>, SupabaseError> {
        let url = format!("{}?{}", self.rest_url(table), query);

        let response = self
            .authed(self.client.get(&url))
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await
            .map_err(SupabaseError::Request)?;

        if response.status() == StatusCode::NOT_ACCEPTABLE {
            // No rows found
            return Ok(None);
        }

        Self::check(response)
            .await?
            .json()
            .await
            .map(Some)
            .map_err(SupabaseError::Parse)
    }

    /// Make an authenticated POST request (insert)
    pub async fn insert<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        data: &T,
    ) -> Result<R, SupabaseError> {
        let response = self
            .authed(self.client.post(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .json(data)
            .send()
            .await
            .map_err(SupabaseError::Request)?;

        // PostgREST returns an array, get first element
        let results: Vec<R> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(SupabaseError::Parse)?;
        results.into_iter().next().ok_or(SupabaseError::NoRowReturned)
    }

    /// Make an authenticated PATCH request (update)
    pub async fn update<T: Serialize>(
        &self,
        table: &str,
        query: &str,
        data: &T,
    ) -> Result<(), SupabaseError> {
        let url = format!("{}?{}", self.rest_url(table), query);

        let response = self
            .authed(self.client.patch(&url))
            .json(data)
            .send()
            .await
            .map_err(SupabaseError::Request)?;

        Self::check(response).await.map(|_| ())
    }

    /// Upsert (insert or update on conflict)
    pub async fn upsert<T: Serialize>(
        &self,
        table: &str,
        data: &T,
        on_conflict: &str,
    ) -> Result<(), SupabaseError> {
        let response = self
            .authed(self.client.post(self.rest_url(table)))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .header("On-Conflict", on_conflict)
            .json(data)
            .send()
            .await
            .map_err(SupabaseError::Request)?;

        Self::check(response).await.map(|_| ())
    }

    /// Make an authenticated DELETE request
    pub async fn delete(&self, table: &str, query: &str) -> Result<(), SupabaseError> {
        let url = format!("{}?{}", self.rest_url(table), query);

        let response = self
            .authed(self.client.delete(&url))
            .send()
            .await
            .map_err(SupabaseError::Request)?;

        Self::check(response).await.map(|_| ())
    }
}

/// Supabase errors
#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(reqwest::Error),

    #[error("No row returned from insert")]
    NoRowReturned,
}

impl SupabaseError {
    /// True when the database rejected the write on a unique constraint.
    /// PostgREST surfaces these as HTTP 409 with Postgres code 23505.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, SupabaseError::Api { status: 409, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_detection() {
        let conflict = SupabaseError::Api {
            status: 409,
            body: r#"{"code":"23505","message":"duplicate key value"}"#.to_string(),
        };
        assert!(conflict.is_unique_violation());

        let other = SupabaseError::Api {
            status: 500,
            body: String::new(),
        };
        assert!(!other.is_unique_violation());
        assert!(!SupabaseError::NoRowReturned.is_unique_violation());
    }
}
