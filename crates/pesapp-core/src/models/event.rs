use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "UPPERCASE")]
pub enum EventCategory {
    #[default]
    General,
    Academic,
    Cultural,
    Sports,
    Workshop,
    Meeting,
    Holiday,
    #[serde(other)]
    Other,
}

fn default_true() -> bool {
    true
}

/// A row of the `events` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub event_date: DateTime<Utc>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub category: EventCategory,
    #[serde(default)]
    pub image_url: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub author_name: String,
    /// User ids of registered attendees.
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub max_attendees: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn new(title: impl Into<String>, event_date: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            title: title.into(),
            description: String::new(),
            event_date,
            end_date: None,
            location: String::new(),
            category: EventCategory::default(),
            image_url: String::new(),
            is_active: true,
            author_id: String::new(),
            author_name: String::new(),
            attendees: Vec::new(),
            max_attendees: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Not yet over: starts in the future or is still running.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.end_date.unwrap_or(self.event_date) >= now
    }

    pub fn has_capacity(&self) -> bool {
        self.max_attendees
            .map_or(true, |max| self.attendees.len() < max as usize)
    }

    pub fn is_attending(&self, user_id: &str) -> bool {
        self.attendees.iter().any(|a| a == user_id)
    }

    pub fn formatted_date(&self) -> String {
        match self.end_date {
            Some(end) if end.date_naive() != self.event_date.date_naive() => format!(
                "{} - {}",
                self.event_date.format("%b %d, %Y"),
                end.format("%b %d, %Y")
            ),
            _ => self.event_date.format("%b %d, %Y").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample(date: DateTime<Utc>) -> Event {
        Event::new("Foundation Day", date)
    }

    #[test]
    fn test_is_upcoming_uses_end_date() {
        let now = Utc::now();
        let mut event = sample(now - Duration::hours(2));
        assert!(!event.is_upcoming(now));

        event.end_date = Some(now + Duration::hours(1));
        assert!(event.is_upcoming(now));
    }

    #[test]
    fn test_capacity() {
        let mut event = sample(Utc::now());
        assert!(event.has_capacity());

        event.max_attendees = Some(1);
        event.attendees.push("u1".to_string());
        assert!(!event.has_capacity());
        assert!(event.is_attending("u1"));
    }

    #[test]
    fn test_formatted_date() {
        let start = Utc.with_ymd_and_hms(2025, 6, 12, 8, 0, 0).unwrap();
        let mut event = sample(start);
        assert_eq!(event.formatted_date(), "Jun 12, 2025");

        event.end_date = Some(Utc.with_ymd_and_hms(2025, 6, 14, 17, 0, 0).unwrap());
        assert_eq!(event.formatted_date(), "Jun 12, 2025 - Jun 14, 2025");
    }

    #[test]
    fn test_unknown_category_maps_to_other() {
        let json = r#"{"id":"e1","title":"Fair","event_date":"2025-03-01T00:00:00Z","category":"FAIR"}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.category, EventCategory::Other);
        assert!(event.is_active);
    }
}
