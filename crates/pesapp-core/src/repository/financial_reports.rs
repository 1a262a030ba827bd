use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::api::Backend;
use crate::cache::{keys, CacheManager};
use crate::models::{FinancialReport, FinancialSummary, ReportCategory};

use super::{fetch_by_id, new_id, optional, RepositoryError, Result};

const TABLE: &str = "financial_reports";

pub struct FinancialReportRepository<B> {
    backend: Arc<B>,
    cache: CacheManager,
}

impl<B> Clone for FinancialReportRepository<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            cache: self.cache.clone(),
        }
    }
}

impl<B: Backend> FinancialReportRepository<B> {
    pub fn new(backend: Arc<B>, cache: CacheManager) -> Self {
        Self { backend, cache }
    }

    /// Active reports, newest report date first.
    pub async fn list(&self, force_refresh: bool) -> Result<Vec<FinancialReport>> {
        let backend = Arc::clone(&self.backend);
        self.cache
            .financial_reports
            .get_with_background_refresh(
                keys::FINANCIAL_REPORTS,
                move || async move {
                    let mut rows: Vec<FinancialReport> = backend.select(TABLE, &[]).await?;
                    rows.retain(|r| r.is_active);
                    rows.sort_by(|a, b| b.report_date.cmp(&a.report_date));
                    Ok::<_, RepositoryError>(rows)
                },
                self.cache.ttls().financial_reports,
                force_refresh,
            )
            .await
    }

    pub async fn by_category(
        &self,
        category: ReportCategory,
        force_refresh: bool,
    ) -> Result<Vec<FinancialReport>> {
        let mut reports = self.list(force_refresh).await?;
        reports.retain(|r| r.category == category);
        Ok(reports)
    }

    pub async fn summary(&self, force_refresh: bool) -> Result<FinancialSummary> {
        let reports = self.list(force_refresh).await?;
        Ok(FinancialSummary::from_reports(&reports))
    }

    pub async fn get(&self, id: &str, force_refresh: bool) -> Result<Option<FinancialReport>> {
        let backend = Arc::clone(&self.backend);
        let row_id = id.to_string();
        let result = self
            .cache
            .financial_report_details
            .get_with_background_refresh(
                &keys::financial_report_detail(id),
                move || async move { fetch_by_id(&*backend, TABLE, &row_id).await },
                self.cache.ttls().details,
                force_refresh,
            )
            .await;
        optional(result)
    }

    pub async fn create(&self, report: FinancialReport) -> Result<FinancialReport> {
        let now = Utc::now();
        let report = FinancialReport {
            id: new_id(),
            created_at: now,
            updated_at: now,
            ..report
        };
        self.backend.insert(TABLE, &report).await?;
        info!(id = %report.id, amount = report.amount, "Created financial report");
        self.invalidate(None);
        Ok(report)
    }

    pub async fn update(&self, report: FinancialReport) -> Result<FinancialReport> {
        let report = FinancialReport {
            updated_at: Utc::now(),
            ..report
        };
        self.backend.update(TABLE, &report.id, &report).await?;
        self.invalidate(Some(&report.id));
        Ok(report)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.backend.delete(TABLE, id).await?;
        info!(id, "Deleted financial report");
        self.invalidate(Some(id));
        Ok(())
    }

    fn invalidate(&self, id: Option<&str>) {
        self.cache.financial_reports.remove(keys::FINANCIAL_REPORTS);
        if let Some(id) = id {
            self.cache
                .financial_report_details
                .remove(&keys::financial_report_detail(id));
        }
    }
}
