// src/services/report_service.rs

use sqlx::{Postgres, Executor, Acquire};
use crate::{
    common::error::AppError,
    db::ReportRepository,
    models::{
        inventory::BatchListing,
        report::{
            ActivityFilter, ActivityLog, InventorySummary, Pagination, ProfitReport,
            ProfitTotals, ReportPeriod,
        },
    },
};

pub const DEFAULT_EXPIRY_WINDOW_DAYS: i32 = 60;
pub const MAX_EXPIRY_WINDOW_DAYS: i32 = 3650;
pub const DEFAULT_ACTIVITY_LIMIT: i64 = 100;
pub const MAX_ACTIVITY_LIMIT: i64 = 1000;

// Janela de validade: negativa ou ausente cai no padrão, teto de dez anos.
fn expiry_window(days: Option<i32>) -> i32 {
    days.filter(|d| *d >= 0)
        .unwrap_or(DEFAULT_EXPIRY_WINDOW_DAYS)
        .min(MAX_EXPIRY_WINDOW_DAYS)
}

// Limite não positivo cai no padrão, teto de 1000 por página.
fn normalize_page(filter: &mut ActivityFilter) {
    filter.limit = if filter.limit <= 0 {
        DEFAULT_ACTIVITY_LIMIT
    } else {
        filter.limit.min(MAX_ACTIVITY_LIMIT)
    };
    filter.offset = filter.offset.max(0);
}

#[derive(Clone)]
pub struct ReportService {
    repo: ReportRepository,
}

impl ReportService {
    pub fn new(repo: ReportRepository) -> Self {
        Self { repo }
    }

    pub async fn get_expiring_items<'e, E>(
        &self,
        executor: E,
        days: Option<i32>,
    ) -> Result<Vec<BatchListing>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.get_expiring_batches(executor, expiry_window(days)).await
    }

    pub async fn calculate_profit<'e, E>(
        &self,
        executor: E,
        period: ReportPeriod,
    ) -> Result<ProfitReport, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = self.repo
            .get_profit_lines(executor, period.starts_at(), period.ends_at())
            .await?;
        let totals = ProfitTotals::from_lines(&items);
        Ok(ProfitReport { items, totals })
    }

    pub async fn get_summary<'e, A>(
        &self,
        db: A,
        period: ReportPeriod,
    ) -> Result<InventorySummary, AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        self.repo.get_summary(db, period.starts_at(), period.ends_at()).await
    }

    /// Página de movimentações de todos os itens, total e lista de usuários.
    pub async fn get_activity_log<'e, A>(
        &self,
        db: A,
        mut filter: ActivityFilter,
    ) -> Result<ActivityLog, AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        normalize_page(&mut filter);

        let mut conn = db.acquire().await?;
        let entries = self.repo.get_activity(&mut *conn, &filter).await?;
        let total = self.repo.count_activity(&mut *conn, &filter).await?;
        let users = self.repo.get_activity_users(&mut *conn).await?;

        Ok(ActivityLog {
            entries,
            pagination: Pagination::new(total, filter.limit, filter.offset),
            users,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_window_defaults_and_caps() {
        assert_eq!(expiry_window(None), 60);
        assert_eq!(expiry_window(Some(-5)), 60);
        assert_eq!(expiry_window(Some(0)), 0);
        assert_eq!(expiry_window(Some(30)), 30);
        assert_eq!(expiry_window(Some(i32::MAX)), MAX_EXPIRY_WINDOW_DAYS);
    }

    #[test]
    fn activity_page_is_clamped() {
        let mut filter = ActivityFilter { limit: i64::MAX, offset: -3, ..Default::default() };
        normalize_page(&mut filter);
        assert_eq!(filter.limit, MAX_ACTIVITY_LIMIT);
        assert_eq!(filter.offset, 0);

        let mut filter = ActivityFilter::default();
        normalize_page(&mut filter);
        assert_eq!(filter.limit, DEFAULT_ACTIVITY_LIMIT);
        assert_eq!(Pagination::new(3, filter.limit, filter.offset).pages, 1);
    }
}
