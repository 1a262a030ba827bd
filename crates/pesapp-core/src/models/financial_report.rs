use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportType {
    #[default]
    Income,
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportCategory {
    Solicitations,
    ProjectsFund,
    Expenses,
    General,
    Infrastructure,
    Events,
    Maintenance,
    Supplies,
    Utilities,
    #[default]
    #[serde(other)]
    Other,
}

impl FromStr for ReportCategory {
    type Err = String;

    /// Accepts the wire name in any case, with `-` or `_` between words.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "solicitations" => Ok(ReportCategory::Solicitations),
            "projects_fund" => Ok(ReportCategory::ProjectsFund),
            "expenses" => Ok(ReportCategory::Expenses),
            "general" => Ok(ReportCategory::General),
            "infrastructure" => Ok(ReportCategory::Infrastructure),
            "events" => Ok(ReportCategory::Events),
            "maintenance" => Ok(ReportCategory::Maintenance),
            "supplies" => Ok(ReportCategory::Supplies),
            "utilities" => Ok(ReportCategory::Utilities),
            "other" => Ok(ReportCategory::Other),
            other => Err(format!(
                "Unknown report category '{}'. Valid categories: solicitations, projects_fund, \
                 expenses, general, infrastructure, events, maintenance, supplies, utilities, other",
                other
            )),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A row of the `financial_reports` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct FinancialReport {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub report_type: ReportType,
    #[serde(default)]
    pub category: ReportCategory,
    #[serde(default = "Utc::now")]
    pub report_date: DateTime<Utc>,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub author_name: String,
    /// URLs of uploaded receipts and documents.
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl FinancialReport {
    pub fn new(title: impl Into<String>, amount: f64, report_type: ReportType) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            title: title.into(),
            description: String::new(),
            amount,
            report_type,
            category: ReportCategory::default(),
            report_date: now,
            author_id: String::new(),
            author_name: String::new(),
            attachments: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Positive for income, negative for expenses.
    pub fn signed_amount(&self) -> f64 {
        match self.report_type {
            ReportType::Income => self.amount,
            ReportType::Expense => -self.amount,
        }
    }
}

/// Totals across a set of reports, as shown on the finance dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FinancialSummary {
    pub income: f64,
    pub expenses: f64,
    pub balance: f64,
    pub count: usize,
}

impl FinancialSummary {
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a FinancialReport>) -> Self {
        let mut summary = Self::default();
        for report in reports {
            match report.report_type {
                ReportType::Income => summary.income += report.amount,
                ReportType::Expense => summary.expenses += report.amount,
            }
            summary.balance += report.signed_amount();
            summary.count += 1;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_totals() {
        let reports = vec![
            FinancialReport::new("Donation", 5000.0, ReportType::Income),
            FinancialReport::new("Paint", 1200.0, ReportType::Expense),
            FinancialReport::new("Canteen", 800.0, ReportType::Income),
        ];
        let summary = FinancialSummary::from_reports(&reports);
        assert_eq!(summary.income, 5800.0);
        assert_eq!(summary.expenses, 1200.0);
        assert_eq!(summary.balance, 4600.0);
        assert_eq!(summary.count, 3);
    }

    #[test]
    fn test_category_wire_names() {
        let json = r#"{"id":"r1","title":"Fund","amount":10.5,"report_type":"EXPENSE","category":"PROJECTS_FUND"}"#;
        let report: FinancialReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.category, ReportCategory::ProjectsFund);
        assert_eq!(report.signed_amount(), -10.5);
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("projects-fund".parse::<ReportCategory>(), Ok(ReportCategory::ProjectsFund));
        assert_eq!("UTILITIES".parse::<ReportCategory>(), Ok(ReportCategory::Utilities));
        assert!("lottery".parse::<ReportCategory>().is_err());
    }
}
