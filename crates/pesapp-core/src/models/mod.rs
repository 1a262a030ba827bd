//! Data models for the school community backend.
//!
//! Each struct mirrors a row of the hosted Postgres tables (snake_case JSON):
//!
//! - `User`, `UserRole`, `ProfileUpdate`: directory and role-based access
//! - `Announcement`: notices targeted at roles
//! - `Event`: school calendar with attendee tracking
//! - `FinancialReport`, `FinancialSummary`: income and expense records

pub mod announcement;
pub mod event;
pub mod financial_report;
pub mod user;

pub use announcement::{Announcement, AnnouncementCategory, AnnouncementPriority};
pub use event::{Event, EventCategory};
pub use financial_report::{FinancialReport, FinancialSummary, ReportCategory, ReportType};
pub use user::{DashboardSection, ProfileUpdate, User, UserRole};
