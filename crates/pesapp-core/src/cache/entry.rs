use std::time::Duration;

use tokio::time::Instant;

/// An entry turns stale after 7/10 of its TTL.
/// Stale entries are still served but trigger a background refresh.
const STALE_NUMERATOR: u32 = 7;
const STALE_DENOMINATOR: u32 = 10;

/// A single cached value with its write time and expiration window.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub data: V,
    pub written_at: Instant,
    pub ttl: Duration,
    /// Set when a background refresh failed, so the next read retries.
    pub forced_stale: bool,
}

impl<V> CacheEntry<V> {
    pub fn new(data: V, ttl: Duration) -> Self {
        Self::with_timestamp(data, ttl, Instant::now())
    }

    pub fn with_timestamp(data: V, ttl: Duration, written_at: Instant) -> Self {
        Self {
            data,
            written_at,
            ttl,
            forced_stale: false,
        }
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.written_at)
    }

    /// An entry is expired once its age reaches the TTL.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.age(now) >= self.ttl
    }

    /// Saturates instead of overflowing for very long TTLs such as `Duration::MAX`.
    pub fn stale_after(&self) -> Duration {
        match self.ttl.checked_mul(STALE_NUMERATOR) {
            Some(scaled) => scaled / STALE_DENOMINATOR,
            None => self.ttl / STALE_DENOMINATOR * STALE_NUMERATOR,
        }
    }

    /// Expired entries always count as stale, even with a zero TTL.
    pub fn is_stale(&self, now: Instant) -> bool {
        self.forced_stale || self.is_expired(now) || self.age(now) > self.stale_after()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_entry_is_neither_stale_nor_expired() {
        let now = Instant::now();
        let entry = CacheEntry::with_timestamp(1, Duration::from_secs(100), now);
        assert!(!entry.is_stale(now));
        assert!(!entry.is_expired(now));
    }

    #[test]
    fn test_stale_threshold_is_seventy_percent_of_ttl() {
        let now = Instant::now();
        let entry = CacheEntry::with_timestamp(1, Duration::from_secs(100), now);
        assert_eq!(entry.stale_after(), Duration::from_secs(70));
        assert!(!entry.is_stale(now + Duration::from_secs(70)));
        assert!(entry.is_stale(now + Duration::from_secs(71)));
        assert!(!entry.is_expired(now + Duration::from_secs(71)));
    }

    #[test]
    fn test_expires_exactly_at_ttl() {
        let now = Instant::now();
        let entry = CacheEntry::with_timestamp(1, Duration::from_secs(100), now);
        assert!(!entry.is_expired(now + Duration::from_secs(99)));
        assert!(entry.is_expired(now + Duration::from_secs(100)));
    }

    #[test]
    fn test_forced_stale_overrides_age() {
        let now = Instant::now();
        let mut entry = CacheEntry::with_timestamp(1, Duration::from_secs(100), now);
        entry.forced_stale = true;
        assert!(entry.is_stale(now));
        assert!(!entry.is_expired(now));
    }

    #[test]
    fn test_unbounded_ttl_never_goes_stale() {
        let now = Instant::now();
        let entry = CacheEntry::with_timestamp(1, Duration::MAX, now);
        assert_eq!(entry.stale_after(), Duration::MAX / 10 * 7);
        assert!(!entry.is_stale(now + Duration::from_secs(365 * 24 * 3600)));
        assert!(!entry.is_expired(now + Duration::from_secs(365 * 24 * 3600)));
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let now = Instant::now();
        let entry = CacheEntry::with_timestamp("x", Duration::ZERO, now);
        assert!(entry.is_expired(now));
        assert!(entry.is_stale(now));
    }
}
