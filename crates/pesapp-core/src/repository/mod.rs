//! Cached data access for each backend table.
//!
//! Reads go through the shared [`CacheManager`] with stale-while-revalidate
//! semantics; writes go straight to the backend and then invalidate the
//! affected cache keys, since the cache has no push invalidation of its own.

pub mod announcements;
pub mod events;
pub mod financial_reports;
pub mod users;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

use crate::api::{ApiError, Backend, Filter};
use crate::cache::CacheManager;

pub use announcements::AnnouncementRepository;
pub use events::EventRepository;
pub use financial_reports::FinancialReportRepository;
pub use users::UserRepository;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("No {table} row with id {id}")]
    NotFound { table: &'static str, id: String },

    #[error("Event {0} is full")]
    EventFull(String),
}

impl RepositoryError {
    /// True when retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RepositoryError::Api(e) => e.is_transient(),
            RepositoryError::NotFound { .. } | RepositoryError::EventFull(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Fetch a single row by id, failing with `NotFound` if it does not exist.
async fn fetch_by_id<B, T>(backend: &B, table: &'static str, id: &str) -> Result<T>
where
    B: Backend,
    T: DeserializeOwned + Send,
{
    let rows: Vec<T> = backend.select(table, &[Filter::eq("id", id)]).await?;
    rows.into_iter().next().ok_or_else(|| RepositoryError::NotFound {
        table,
        id: id.to_string(),
    })
}

/// Turn a missing row into `None`, keeping every other error.
fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(RepositoryError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Caller-side fallback for list screens: log the failure and show nothing.
pub fn or_empty<T>(result: Result<Vec<T>>, what: &str) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            warn!(what, error = %e, "Failed to load data, showing empty list");
            Vec::new()
        }
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Every repository wired to one backend and one shared cache.
pub struct Repositories<B> {
    pub announcements: AnnouncementRepository<B>,
    pub events: EventRepository<B>,
    pub financial_reports: FinancialReportRepository<B>,
    pub users: UserRepository<B>,
    pub cache: CacheManager,
}

impl<B: Backend> Repositories<B> {
    pub fn new(backend: B, cache: CacheManager) -> Self {
        Self::from_shared(Arc::new(backend), cache)
    }

    pub fn from_shared(backend: Arc<B>, cache: CacheManager) -> Self {
        Self {
            announcements: AnnouncementRepository::new(Arc::clone(&backend), cache.clone()),
            events: EventRepository::new(Arc::clone(&backend), cache.clone()),
            financial_reports: FinancialReportRepository::new(Arc::clone(&backend), cache.clone()),
            users: UserRepository::new(backend, cache.clone()),
            cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_maps_not_found_to_none() {
        let missing: Result<u8> = Err(RepositoryError::NotFound {
            table: "events",
            id: "e9".to_string(),
        });
        assert!(optional(missing).unwrap().is_none());
        assert_eq!(optional(Ok(3u8)).unwrap(), Some(3));
        assert!(optional::<u8>(Err(ApiError::RateLimited.into())).is_err());
    }

    #[test]
    fn test_or_empty_swallows_errors() {
        let failed: Result<Vec<u8>> = Err(ApiError::Unauthorized.into());
        assert!(or_empty(failed, "events").is_empty());
        assert_eq!(or_empty(Ok(vec![1, 2]), "events"), vec![1, 2]);
    }

    #[test]
    fn test_transient_follows_api_error() {
        assert!(RepositoryError::from(ApiError::RateLimited).is_transient());
        assert!(RepositoryError::from(ApiError::ServerError("502".to_string())).is_transient());
        assert!(!RepositoryError::from(ApiError::Unauthorized).is_transient());
        assert!(!RepositoryError::EventFull("e1".to_string()).is_transient());
    }

    #[test]
    fn test_new_ids_are_unique() {
        assert_ne!(new_id(), new_id());
    }
}
