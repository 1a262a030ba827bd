//! Client for the hosted Postgres backend's REST interface.
//!
//! Tables are reached at `<url>/rest/v1/<table>`. Every request carries the
//! project's anon key; a signed-in user's access token replaces it in the
//! `Authorization` header so row-level security applies to that user.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Equality filter on a column, sent as `column=eq.value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    fn to_query(&self) -> (String, String) {
        (self.column.clone(), format!("eq.{}", self.value))
    }
}

/// Table-level access to the backend.
///
/// Returned futures are `Send` so they can run inside background cache refreshes.
pub trait Backend: Send + Sync + 'static {
    fn select<T>(
        &self,
        table: &str,
        filters: &[Filter],
    ) -> impl Future<Output = Result<Vec<T>, ApiError>> + Send
    where
        T: DeserializeOwned + Send;

    fn insert<B>(&self, table: &str, row: &B) -> impl Future<Output = Result<(), ApiError>> + Send
    where
        B: Serialize + Sync;

    /// Patch the row whose `id` column equals `id`.
    fn update<B>(
        &self,
        table: &str,
        id: &str,
        patch: &B,
    ) -> impl Future<Output = Result<(), ApiError>> + Send
    where
        B: Serialize + Sync;

    fn delete(&self, table: &str, id: &str) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Connection settings for the hosted backend project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    pub url: String,
    pub anon_key: String,
}

/// REST client for the hosted backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: Arc<str>,
    access_token: Option<Arc<String>>,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.access_token.is_some())
            .finish()
    }
}

impl SupabaseClient {
    pub fn new(settings: &BackendSettings) -> Result<Self, ApiError> {
        let base_url = settings.url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ApiError::NotConfigured("backend URL is empty".to_string()));
        }
        if settings.anon_key.trim().is_empty() {
            return Err(ApiError::NotConfigured("anon key is empty".to_string()));
        }

        let mut headers = header::HeaderMap::new();
        let key = header::HeaderValue::from_str(settings.anon_key.trim())
            .map_err(|_| ApiError::NotConfigured("anon key is not a valid header value".to_string()))?;
        headers.insert("apikey", key);
        headers.insert(
            header::AUTHORIZATION,
            Self::bearer(settings.anon_key.trim())?,
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url),
            access_token: None,
        })
    }

    /// Create a client acting as a signed-in user, sharing the connection pool.
    pub fn with_access_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: Arc::clone(&self.base_url),
            access_token: Some(Arc::new(token.into())),
        }
    }

    fn bearer(token: &str) -> Result<header::HeaderValue, ApiError> {
        header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::NotConfigured("token is not a valid header value".to_string()))
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, builder: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        match self.access_token {
            Some(ref token) => Ok(builder.header(header::AUTHORIZATION, Self::bearer(token)?)),
            None => Ok(builder),
        }
    }

    /// Send a request, retrying rate-limited (429) responses with exponential backoff.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let attempt = request
                .try_clone()
                .ok_or_else(|| ApiError::InvalidResponse("request cannot be retried".to_string()))?;
            let response = attempt.send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RATE_LIMIT_RETRIES {
                retries += 1;
                warn!(retry = retries, backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }
    }

    fn id_filter(id: &str) -> [(String, String); 1] {
        [Filter::eq("id", id).to_query()]
    }
}

impl Backend for SupabaseClient {
    async fn select<T>(&self, table: &str, filters: &[Filter]) -> Result<Vec<T>, ApiError>
    where
        T: DeserializeOwned + Send,
    {
        let query: Vec<(String, String)> = filters.iter().map(Filter::to_query).collect();
        let request = self.request(
            self.client
                .get(self.table_url(table))
                .query(&[("select", "*")])
                .query(&query),
        )?;

        debug!(table, filters = filters.len(), "Selecting rows");
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    async fn insert<B>(&self, table: &str, row: &B) -> Result<(), ApiError>
    where
        B: Serialize + Sync,
    {
        let request = self.request(
            self.client
                .post(self.table_url(table))
                .header("Prefer", "return=minimal")
                .json(row),
        )?;

        debug!(table, "Inserting row");
        self.send(request).await?;
        Ok(())
    }

    async fn update<B>(&self, table: &str, id: &str, patch: &B) -> Result<(), ApiError>
    where
        B: Serialize + Sync,
    {
        let request = self.request(
            self.client
                .patch(self.table_url(table))
                .query(&Self::id_filter(id))
                .header("Prefer", "return=minimal")
                .json(patch),
        )?;

        debug!(table, id, "Updating row");
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), ApiError> {
        let request = self.request(
            self.client
                .delete(self.table_url(table))
                .query(&Self::id_filter(id)),
        )?;

        debug!(table, id, "Deleting row");
        self.send(request).await?;
        Ok(())
    }
}
