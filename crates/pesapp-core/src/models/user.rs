use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    Teacher,
    Parent,
    #[default]
    #[serde(other)]
    Guest,
}

/// Sections shown on a role's home dashboard, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardSection {
    Announcements,
    Events,
    FinancialReports,
    UserManagement,
}

impl UserRole {
    pub fn can_manage_users(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Admins and teachers can post announcements and events.
    pub fn can_publish(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Teacher)
    }

    pub fn can_manage_finances(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub fn can_view_finances(&self) -> bool {
        !matches!(self, UserRole::Guest)
    }

    pub fn dashboard_sections(&self) -> &'static [DashboardSection] {
        use DashboardSection::*;
        match self {
            UserRole::Admin => &[Announcements, Events, FinancialReports, UserManagement],
            UserRole::Teacher | UserRole::Parent => &[Announcements, Events, FinancialReports],
            UserRole::Guest => &[Announcements, Events],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Teacher => "TEACHER",
            UserRole::Parent => "PARENT",
            UserRole::Guest => "GUEST",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "Admin"),
            UserRole::Teacher => write!(f, "Teacher"),
            UserRole::Parent => write!(f, "Parent"),
            UserRole::Guest => write!(f, "Guest"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "teacher" => Ok(UserRole::Teacher),
            "parent" => Ok(UserRole::Parent),
            "guest" => Ok(UserRole::Guest),
            other => Err(format!(
                "Unknown role '{}'. Valid roles: admin, teacher, parent, guest",
                other
            )),
        }
    }
}

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub profile_image: String,
    /// Names of enrolled children, for parents.
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Display name, falling back to the email address.
    pub fn name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.email
        } else {
            &self.display_name
        }
    }
}

/// Partial update of a user's own profile. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.contact_number.is_none()
            && self.profile_image.is_none()
            && self.children.is_none()
    }
}
