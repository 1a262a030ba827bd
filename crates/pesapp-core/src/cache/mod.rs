//! In-memory caching layer for backend reads.
//!
//! `ExpiringCache` is a typed, thread-safe key/value table where every entry
//! carries its own TTL. Entries turn stale at 70% of the TTL: stale data is
//! still served, while a background task refreshes it. `CacheManager` holds
//! one cache per data class and is shared by all repositories.
//!
//! Cached data classes:
//! - Users and individual user profiles
//! - Announcements
//! - Events
//! - Financial reports

pub mod entry;
pub mod expiring;
pub mod manager;

pub use entry::CacheEntry;
pub use expiring::{CacheStats, ExpiringCache, Lookup};
pub use manager::{keys, CacheManager, CacheTtls};
