// src/models/report.rs

use serde::{Serialize, Deserialize};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::models::inventory::{MovementType, StockMovement};

// --- Período do relatório ---
/// Período inclusivo sobre `created_at`. Sem limites, vai do primeiro dia
/// do mês corrente até hoje.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ReportPeriod {
    pub fn resolve(start: Option<NaiveDate>, end: Option<NaiveDate>, today: NaiveDate) -> Self {
        let month_start = today.with_day(1).unwrap_or(today);
        Self {
            start_date: start.unwrap_or(month_start),
            end_date: end.unwrap_or(today),
        }
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.start_date.and_time(NaiveTime::MIN).and_utc()
    }

    /// Último microssegundo de `end_date`.
    pub fn ends_at(&self) -> DateTime<Utc> {
        let end_of_day =
            NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or(NaiveTime::MIN);
        self.end_date.and_time(end_of_day).and_utc()
    }
}

/// Lucro como percentual da receita, duas casas; zero sem receita.
pub fn profit_margin(profit: Decimal, revenue: Decimal) -> Decimal {
    if revenue > Decimal::ZERO {
        (profit / revenue * Decimal::ONE_HUNDRED).round_dp(2)
    } else {
        Decimal::ZERO
    }
}

// --- Lucro por item ---
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProfitLine {
    pub item_id: i64,
    pub name: String,
    pub code: String,
    pub selling_price: Decimal,
    pub qty_sold: i64,
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitTotals {
    pub total_qty_sold: i64,
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub profit_margin: Decimal,
}

impl ProfitTotals {
    pub fn from_lines(lines: &[ProfitLine]) -> Self {
        let (qty, revenue, cost, profit) = lines.iter().fold(
            (0_i64, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
            |(qty, revenue, cost, profit), line| {
                (
                    qty + line.qty_sold,
                    revenue + line.revenue,
                    cost + line.cost,
                    profit + line.profit,
                )
            },
        );
        Self {
            total_qty_sold: qty,
            total_revenue: revenue,
            total_cost: cost,
            total_profit: profit,
            profit_margin: profit_margin(profit, revenue),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitReport {
    pub items: Vec<ProfitLine>,
    pub totals: ProfitTotals,
}

// --- Resumo do dashboard ---
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
    pub profit_margin: Decimal,
    pub expiring_items_count: i64,
    pub low_stock_count: i64,
}

// --- Log de atividades ---
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub movement_type: Option<MovementType>,
    pub created_by: Option<String>,
    pub item_id: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub movement: StockMovement,
    pub item_code: String,
    pub item_name: String,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(total: i64, limit: i64, offset: i64) -> Self {
        let pages = if limit > 0 {
            total / limit + i64::from(total % limit != 0)
        } else {
            0
        };
        Self { total, limit, offset, pages }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub entries: Vec<ActivityEntry>,
    pub pagination: Pagination,
    // Usuários distintos, para os filtros.
    pub users: Vec<String>,
}
