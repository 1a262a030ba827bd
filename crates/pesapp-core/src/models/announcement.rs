use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "UPPERCASE")]
pub enum AnnouncementCategory {
    #[default]
    General,
    Academic,
    Event,
    Emergency,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "UPPERCASE")]
pub enum AnnouncementPriority {
    Low,
    #[default]
    #[serde(alias = "NORMAL")]
    Medium,
    High,
    Urgent,
}

fn all_member_roles() -> Vec<UserRole> {
    vec![UserRole::Parent, UserRole::Teacher, UserRole::Admin]
}

fn default_true() -> bool {
    true
}

/// A row of the `announcements` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Announcement {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub category: AnnouncementCategory,
    #[serde(default)]
    pub priority: AnnouncementPriority,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "all_member_roles")]
    pub target_roles: Vec<UserRole>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Announcement {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            title: title.into(),
            content: content.into(),
            author_id: String::new(),
            author_name: String::new(),
            category: AnnouncementCategory::default(),
            priority: AnnouncementPriority::default(),
            is_active: true,
            target_roles: all_member_roles(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Admins see everything; everyone else only what targets their role.
    pub fn is_visible_to(&self, role: UserRole) -> bool {
        role == UserRole::Admin || self.target_roles.contains(&role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_defaults() {
        let json = r#"{"id":"a1","title":"Enrollment","priority":"NORMAL","category":"SPORTS"}"#;
        let a: Announcement = serde_json::from_str(json).unwrap();
        assert!(a.is_active);
        assert_eq!(a.priority, AnnouncementPriority::Medium);
        assert_eq!(a.category, AnnouncementCategory::Other);
        assert_eq!(a.target_roles.len(), 3);
    }

    #[test]
    fn test_visibility_by_role() {
        let mut a = Announcement::new("PTA meeting", "Friday 3pm");
        a.target_roles = vec![UserRole::Parent];
        assert!(a.is_visible_to(UserRole::Parent));
        assert!(a.is_visible_to(UserRole::Admin));
        assert!(!a.is_visible_to(UserRole::Teacher));
        assert!(!a.is_visible_to(UserRole::Guest));
    }

    #[test]
    fn test_priority_ordering() {
        assert!(AnnouncementPriority::Urgent > AnnouncementPriority::High);
        assert!(AnnouncementPriority::Low < AnnouncementPriority::Medium);
    }
}
