//! Thread-safe in-memory cache with per-entry TTL and stale-while-revalidate reads.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::{DashMap, DashSet};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::entry::CacheEntry;

/// Counts of entries by freshness at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total: usize,
    pub expired: usize,
    pub stale: usize,
    pub valid: usize,
}

impl CacheStats {
    pub fn combine(self, other: CacheStats) -> CacheStats {
        CacheStats {
            total: self.total + other.total,
            expired: self.expired + other.expired,
            stale: self.stale + other.stale,
            valid: self.valid + other.valid,
        }
    }
}

/// Outcome of [`ExpiringCache::lookup`].
#[derive(Debug)]
pub enum Lookup<V> {
    /// The value was fetched synchronously and stored.
    Fetched(V),
    /// The value came from the cache. `refresh` is set when the entry was
    /// stale and a background refresh was spawned for it.
    Cached {
        value: V,
        refresh: Option<JoinHandle<()>>,
    },
}

impl<V> Lookup<V> {
    pub fn value(&self) -> &V {
        match self {
            Lookup::Fetched(value) => value,
            Lookup::Cached { value, .. } => value,
        }
    }

    pub fn into_value(self) -> V {
        self.into_parts().0
    }

    pub fn into_parts(self) -> (V, Option<JoinHandle<()>>) {
        match self {
            Lookup::Fetched(value) => (value, None),
            Lookup::Cached { value, refresh } => (value, refresh),
        }
    }

    pub fn was_cached(&self) -> bool {
        matches!(self, Lookup::Cached { .. })
    }

    pub fn spawned_refresh(&self) -> bool {
        matches!(self, Lookup::Cached { refresh: Some(_), .. })
    }
}

struct Inner<V> {
    entries: DashMap<String, CacheEntry<V>>,
    /// Keys with a background refresh currently running.
    refreshing: DashSet<String>,
}

/// Expiring key/value cache for one data class.
///
/// Cloning is cheap and every clone shares the same table, so one instance
/// is built at startup and handed to each collaborator that needs it.
pub struct ExpiringCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for ExpiringCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for ExpiringCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for ExpiringCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("entries", &self.inner.entries.len())
            .field("refreshing", &self.inner.refreshing.len())
            .finish()
    }
}

impl<V> ExpiringCache<V> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                refreshing: DashSet::new(),
            }),
        }
    }

    /// Store `value` under `key`, replacing any existing entry.
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.inner.entries.insert(key.into(), CacheEntry::new(value, ttl));
    }

    pub fn put_batch<K, I>(&self, entries: I, ttl: Duration)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.put(key, value, ttl);
        }
    }

    pub fn remove(&self, key: &str) {
        self.inner.entries.remove(key);
    }

    pub fn clear(&self) {
        self.inner.entries.clear();
    }

    /// Remove every entry whose key contains `pattern`. Returns how many were removed.
    pub fn remove_by_pattern(&self, pattern: &str) -> usize {
        let mut removed = 0;
        self.inner.entries.retain(|key, _| {
            let matches = key.contains(pattern);
            if matches {
                removed += 1;
            }
            !matches
        });
        debug!(pattern, removed, "Removed cache entries by pattern");
        removed
    }

    pub fn has_valid(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// A missing entry counts as stale: the caller has to fetch.
    pub fn is_stale(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .entries
            .get(key)
            .map_or(true, |entry| entry.is_stale(now))
    }

    pub fn mark_stale(&self, key: &str) {
        if let Some(mut entry) = self.inner.entries.get_mut(key) {
            entry.forced_stale = true;
        }
    }

    pub fn is_refreshing(&self, key: &str) -> bool {
        self.inner.refreshing.contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let mut stats = CacheStats::default();
        for entry in self.inner.entries.iter() {
            stats.total += 1;
            if entry.is_expired(now) {
                stats.expired += 1;
            } else {
                stats.valid += 1;
            }
            if entry.is_stale(now) {
                stats.stale += 1;
            }
        }
        stats
    }

    /// Drop every expired entry now instead of waiting for the next read.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut purged = 0;
        self.inner.entries.retain(|_, entry| {
            let expired = entry.is_expired(now);
            if expired {
                purged += 1;
            }
            !expired
        });
        purged
    }
}

impl<V: Clone> ExpiringCache<V> {
    /// Returns the value if present and not expired. Expired entries are evicted.
    pub fn get(&self, key: &str) -> Option<V> {
        self.peek(key).map(|(value, _)| value)
    }

    /// Value plus its staleness, evicting the entry if it has expired.
    fn peek(&self, key: &str) -> Option<(V, bool)> {
        let now = Instant::now();
        let expired = match self.inner.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                return Some((entry.data.clone(), entry.is_stale(now)));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            // Only evict if no fresh write landed since the check above.
            self.inner
                .entries
                .remove_if(key, |_, entry| entry.is_expired(now));
            debug!(key, "Evicted expired cache entry");
        }
        None
    }
}

impl<V> ExpiringCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Stale-while-revalidate read.
    ///
    /// Without a valid entry (or with `force_refresh`) `fetch` is awaited, its
    /// result stored and returned; fetch errors are returned unchanged. With a
    /// valid entry the cached value is returned immediately, and if the entry
    /// is stale `fetch` runs in a background task whose failure only marks the
    /// entry stale again.
    pub async fn get_with_background_refresh<F, Fut, E>(
        &self,
        key: &str,
        fetch: F,
        ttl: Duration,
        force_refresh: bool,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.lookup(key, fetch, ttl, force_refresh)
            .await
            .map(Lookup::into_value)
    }

    /// Same as [`get_with_background_refresh`](Self::get_with_background_refresh)
    /// but reports where the value came from and hands back the refresh task.
    pub async fn lookup<F, Fut, E>(
        &self,
        key: &str,
        fetch: F,
        ttl: Duration,
        force_refresh: bool,
    ) -> Result<Lookup<V>, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        if !force_refresh {
            // Also covers an entry evicted between a validity check and the read:
            // both fall through to the synchronous fetch below.
            if let Some((value, stale)) = self.peek(key) {
                let refresh = if stale {
                    self.spawn_refresh(key, fetch, ttl)
                } else {
                    None
                };
                debug!(key, stale, "Cache hit");
                return Ok(Lookup::Cached { value, refresh });
            }
        }

        debug!(key, force_refresh, "Cache miss, fetching");
        let value = fetch().await?;
        self.put(key, value.clone(), ttl);
        Ok(Lookup::Fetched(value))
    }

    fn spawn_refresh<F, Fut, E>(&self, key: &str, fetch: F, ttl: Duration) -> Option<JoinHandle<()>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        if !self.inner.refreshing.insert(key.to_string()) {
            debug!(key, "Background refresh already in flight");
            return None;
        }

        let guard = RefreshGuard {
            cache: self.clone(),
            key: key.to_string(),
        };

        Some(tokio::spawn(async move {
            let guard = guard;
            match fetch().await {
                Ok(value) => {
                    guard.cache.put(guard.key.clone(), value, ttl);
                    debug!(key = %guard.key, "Background refresh stored fresh data");
                }
                Err(e) => {
                    guard.cache.mark_stale(&guard.key);
                    debug!(key = %guard.key, error = %e, "Background refresh failed, keeping stale data");
                }
            }
        }))
    }
}

/// Clears the in-flight marker for a key when the refresh task ends, even on panic.
struct RefreshGuard<V> {
    cache: ExpiringCache<V>,
    key: String,
}

impl<V> Drop for RefreshGuard<V> {
    fn drop(&mut self) {
        self.cache.inner.refreshing.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    const TEN_MINUTES: Duration = Duration::from_secs(600);

    #[test]
    fn test_get_missing_key_is_none() {
        let cache: ExpiringCache<i32> = ExpiringCache::new();
        assert_eq!(cache.get("nope"), None);
        assert!(!cache.has_valid("nope"));
        assert!(cache.is_stale("nope"));
    }

    #[test]
    fn test_put_replaces_existing_entry() {
        let cache = ExpiringCache::new();
        cache.put("events", vec![1], TEN_MINUTES);
        cache.put("events", vec![1, 2], TEN_MINUTES);
        assert_eq!(cache.get("events"), Some(vec![1, 2]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = ExpiringCache::new();
        cache.put("a", 1, TEN_MINUTES);
        cache.put("b", 2, TEN_MINUTES);

        cache.remove("a");
        cache.remove("missing");
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove_by_pattern_leaves_other_families() {
        let cache = ExpiringCache::new();
        cache.put("user_profile_1", "alice", TEN_MINUTES);
        cache.put("user_profile_2", "bob", TEN_MINUTES);
        cache.put("events", "calendar", TEN_MINUTES);

        assert_eq!(cache.remove_by_pattern("user_profile_"), 2);
        assert_eq!(cache.get("user_profile_1"), None);
        assert_eq!(cache.get("user_profile_2"), None);
        assert_eq!(cache.get("events"), Some("calendar"));
    }

    #[test]
    fn test_mark_stale_on_missing_key_is_noop() {
        let cache: ExpiringCache<i32> = ExpiringCache::new();
        cache.mark_stale("ghost");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_mark_stale_flags_fresh_entry() {
        let cache = ExpiringCache::new();
        cache.put("k", 1, TEN_MINUTES);
        assert!(!cache.is_stale("k"));

        cache.mark_stale("k");
        assert!(cache.is_stale("k"));
        assert!(cache.has_valid("k"));
        assert_eq!(cache.get("k"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_at_ttl_and_is_evicted() {
        let cache = ExpiringCache::new();
        cache.put("k", 7, TEN_MINUTES);

        advance(TEN_MINUTES - Duration::from_millis(1)).await;
        assert_eq!(cache.get("k"), Some(7));

        advance(Duration::from_millis(1)).await;
        assert!(!cache.has_valid("k"));
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty(), "expired entry should be evicted on read");
    }

    #[tokio::test(start_paused = true)]
    async fn test_staleness_precedes_expiry() {
        let cache = ExpiringCache::new();
        cache.put("k", 1, TEN_MINUTES);

        advance(Duration::from_secs(420)).await;
        assert!(!cache.is_stale("k"));

        advance(Duration::from_secs(1)).await;
        assert!(cache.is_stale("k"));
        assert!(cache.has_valid("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_and_purge_expired() {
        let cache = ExpiringCache::new();
        cache.put("short", 1, Duration::from_secs(60));
        cache.put("long", 2, Duration::from_secs(3600));
        cache.put("stale", 3, Duration::from_secs(100));

        advance(Duration::from_secs(80)).await;
        let stats = cache.stats();
        assert_eq!(
            stats,
            CacheStats {
                total: 3,
                expired: 1,
                stale: 2,
                valid: 2,
            }
        );

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("long"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_ttl_is_served_from_cache() {
        let cache = ExpiringCache::new();
        cache.put("k", 1, Duration::MAX);
        advance(Duration::from_secs(30 * 24 * 3600)).await;

        assert!(cache.has_valid("k"));
        assert!(!cache.is_stale("k"));
        assert_eq!(cache.stats().valid, 1);

        let lookup = cache
            .lookup(
                "k",
                || async { Err::<i32, _>("should not be called".to_string()) },
                Duration::MAX,
                false,
            )
            .await
            .unwrap();
        assert!(lookup.was_cached());
        assert!(!lookup.spawned_refresh());
        assert_eq!(lookup.into_value(), 1);
    }

    #[test]
    fn test_put_batch() {
        let cache = ExpiringCache::new();
        cache.put_batch([("a", 1), ("b", 2)], TEN_MINUTES);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn test_clones_share_storage() {
        let cache = ExpiringCache::new();
        let other = cache.clone();
        cache.put("shared", 42, TEN_MINUTES);
        assert_eq!(other.get("shared"), Some(42));
    }
}
