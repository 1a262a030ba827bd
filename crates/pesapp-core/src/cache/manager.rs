use std::time::Duration;

use tracing::info;

use crate::models::{Announcement, Event, FinancialReport, User};

use super::expiring::{CacheStats, ExpiringCache};

/// Cache key names. Entity keys are a prefix plus the row id, so a whole
/// family can be dropped with `remove_by_pattern(prefix)`.
pub mod keys {
    pub const USERS: &str = "users";
    pub const ANNOUNCEMENTS: &str = "announcements";
    pub const FINANCIAL_REPORTS: &str = "financial_reports";
    pub const EVENTS: &str = "events";
    pub const USER_PROFILE: &str = "user_profile_";
    pub const ANNOUNCEMENT_DETAIL: &str = "announcement_detail_";
    pub const FINANCIAL_REPORT_DETAIL: &str = "financial_report_detail_";
    pub const EVENT_DETAIL: &str = "event_detail_";

    pub fn user_profile(id: &str) -> String {
        format!("{}{}", USER_PROFILE, id)
    }

    pub fn announcement_detail(id: &str) -> String {
        format!("{}{}", ANNOUNCEMENT_DETAIL, id)
    }

    pub fn financial_report_detail(id: &str) -> String {
        format!("{}{}", FINANCIAL_REPORT_DETAIL, id)
    }

    pub fn event_detail(id: &str) -> String {
        format!("{}{}", EVENT_DETAIL, id)
    }
}

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;

/// Time-to-live per data class. These are policy defaults; every cache call
/// still takes an explicit TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// User directory changes rarely.
    pub users: Duration,
    pub announcements: Duration,
    pub financial_reports: Duration,
    /// Events change often around the school calendar.
    pub events: Duration,
    pub user_profile: Duration,
    pub details: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            users: Duration::from_secs(HOUR),
            announcements: Duration::from_secs(15 * MINUTE),
            financial_reports: Duration::from_secs(30 * MINUTE),
            events: Duration::from_secs(10 * MINUTE),
            user_profile: Duration::from_secs(2 * HOUR),
            details: Duration::from_secs(HOUR),
        }
    }
}

/// One typed cache per data class, built once at startup and shared.
///
/// Clone is cheap - every field is an `Arc` handle to the same tables.
#[derive(Debug, Clone, Default)]
pub struct CacheManager {
    pub users: ExpiringCache<Vec<User>>,
    pub user_profiles: ExpiringCache<User>,
    pub announcements: ExpiringCache<Vec<Announcement>>,
    pub announcement_details: ExpiringCache<Announcement>,
    pub events: ExpiringCache<Vec<Event>>,
    pub event_details: ExpiringCache<Event>,
    pub financial_reports: ExpiringCache<Vec<FinancialReport>>,
    pub financial_report_details: ExpiringCache<FinancialReport>,
    ttls: CacheTtls,
}

impl CacheManager {
    pub fn new(ttls: CacheTtls) -> Self {
        Self {
            ttls,
            ..Self::default()
        }
    }

    pub fn ttls(&self) -> &CacheTtls {
        &self.ttls
    }

    /// Drop everything, e.g. on sign-out.
    pub fn clear_all(&self) {
        self.users.clear();
        self.user_profiles.clear();
        self.announcements.clear();
        self.announcement_details.clear();
        self.events.clear();
        self.event_details.clear();
        self.financial_reports.clear();
        self.financial_report_details.clear();
        info!("Cleared all cached data");
    }

    pub fn purge_expired(&self) -> usize {
        self.users.purge_expired()
            + self.user_profiles.purge_expired()
            + self.announcements.purge_expired()
            + self.announcement_details.purge_expired()
            + self.events.purge_expired()
            + self.event_details.purge_expired()
            + self.financial_reports.purge_expired()
            + self.financial_report_details.purge_expired()
    }

    pub fn stats(&self) -> CacheStats {
        [
            self.users.stats(),
            self.user_profiles.stats(),
            self.announcements.stats(),
            self.announcement_details.stats(),
            self.events.stats(),
            self.event_details.stats(),
            self.financial_reports.stats(),
            self.financial_report_details.stats(),
        ]
        .into_iter()
        .fold(CacheStats::default(), CacheStats::combine)
    }
}
