//! Core library for pesapp - the school community client.
//!
//! Provides the backend REST client, row models, cached repositories for
//! announcements, events, financial reports and users, the expiring cache
//! that fronts every read, and application configuration.

pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod repository;

pub use api::{ApiError, Backend, BackendSettings, Filter, SupabaseClient};
pub use cache::{CacheManager, CacheTtls, ExpiringCache, Lookup};
pub use config::Config;
pub use repository::{Repositories, RepositoryError};
