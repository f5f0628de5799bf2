// src/db/report_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Acquire, Executor, Postgres};
use rust_decimal::Decimal;
use crate::{
    common::error::AppError,
    models::{
        inventory::BatchListing,
        report::{ActivityEntry, ActivityFilter, InventorySummary, ProfitLine, profit_margin},
    },
};

/// Horizonte fixo do contador de validade do dashboard.
pub const SUMMARY_EXPIRY_HORIZON_DAYS: i32 = 60;

#[derive(Clone, Default)]
pub struct ReportRepository;

impl ReportRepository {
    pub fn new() -> Self {
        Self
    }

    // 1. Lotes abertos vencendo em até `days` (vencidos inclusos), mais próximos primeiro.
    pub async fn get_expiring_batches<'e, E>(
        &self,
        executor: E,
        days: i32,
    ) -> Result<Vec<BatchListing>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let batches = sqlx::query_as::<_, BatchListing>(
            r#"
            SELECT ob.id, ob.item_id, ob.supplier_id, ob.batch_number, ob.purchase_date,
                   ob.expiry_date, ob.cost_price, ob.quantity_purchased, ob.quantity_remaining,
                   ob.invoice_number, ob.notes, ob.created_by, ob.created_at,
                   s.name AS supplier_name, s.code AS supplier_code,
                   i.name AS item_name, i.code AS item_code, i.price AS selling_price,
                   (ob.expiry_date - CURRENT_DATE) AS days_until_expiry
            FROM item_batches ob
            JOIN items i ON ob.item_id = i.id
            LEFT JOIN suppliers s ON ob.supplier_id = s.id
            WHERE ob.expiry_date IS NOT NULL
              AND ob.expiry_date <= CURRENT_DATE + $1::INTEGER
              AND ob.quantity_remaining > 0
            ORDER BY ob.expiry_date ASC, ob.id ASC
            "#,
        )
            .bind(days)
            .fetch_all(executor)
            .await?;
        Ok(batches)
    }

    // 2. Lucro por item a partir das vendas: receita pelo preço de venda atual,
    //    custo pelo preço gravado em cada movimentação.
    pub async fn get_profit_lines<'e, E>(
        &self,
        executor: E,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProfitLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, ProfitLine>(
            r#"
            SELECT
                i.id AS item_id,
                i.name,
                i.code,
                i.price AS selling_price,
                COALESCE(SUM(ABS(sm.quantity)), 0)::BIGINT AS qty_sold,
                COALESCE(SUM(ABS(sm.quantity) * i.price), 0) AS revenue,
                COALESCE(SUM(ABS(sm.quantity) * sm.cost_price), 0) AS cost,
                COALESCE(SUM(ABS(sm.quantity) * (i.price - sm.cost_price)), 0) AS profit
            FROM stock_movements sm
            JOIN items i ON sm.item_id = i.id
            WHERE sm.movement_type = 'sale'
              AND sm.created_at BETWEEN $1 AND $2
            GROUP BY i.id
            ORDER BY profit DESC, i.id ASC
            "#,
        )
            .bind(start)
            .bind(end)
            .fetch_all(executor)
            .await?;
        Ok(lines)
    }

    // 3. Cards do dashboard
    pub async fn get_summary<'e, E>(
        &self,
        executor: E,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<InventorySummary, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        // A. Vendas no período
        let (revenue, cost): (Decimal, Decimal) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(ABS(sm.quantity) * i.price), 0),
                COALESCE(SUM(ABS(sm.quantity) * sm.cost_price), 0)
            FROM stock_movements sm
            JOIN items i ON sm.item_id = i.id
            WHERE sm.movement_type = 'sale'
              AND sm.created_at BETWEEN $1 AND $2
            "#,
        )
            .bind(start)
            .bind(end)
            .fetch_one(&mut *tx)
            .await?;

        // B. Lotes vencendo em breve
        let expiring_items_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM item_batches
            WHERE expiry_date IS NOT NULL
              AND expiry_date <= CURRENT_DATE + $1::INTEGER
              AND quantity_remaining > 0
            "#,
        )
            .bind(SUMMARY_EXPIRY_HORIZON_DAYS)
            .fetch_one(&mut *tx)
            .await?;

        // C. Itens no ponto de reposição ou abaixo
        let low_stock_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM items WHERE stock <= min_stock AND is_active",
        )
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        let profit = revenue - cost;
        Ok(InventorySummary {
            revenue,
            cost,
            profit,
            profit_margin: profit_margin(profit, revenue),
            expiring_items_count,
            low_stock_count,
        })
    }

    // 4. Log de atividades de todos os itens
    pub async fn get_activity<'e, E>(
        &self,
        executor: E,
        filter: &ActivityFilter,
    ) -> Result<Vec<ActivityEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entries = sqlx::query_as::<_, ActivityEntry>(
            r#"
            SELECT sm.id, sm.item_id, sm.batch_id, sm.movement_type, sm.quantity, sm.cost_price,
                   sm.reference_type, sm.reference_id, sm.notes, sm.created_by, sm.created_at,
                   ob.batch_number,
                   i.code AS item_code, i.name AS item_name,
                   ob.expiry_date, s.name AS supplier_name
            FROM stock_movements sm
            JOIN items i ON sm.item_id = i.id
            LEFT JOIN item_batches ob ON sm.batch_id = ob.id
            LEFT JOIN suppliers s ON ob.supplier_id = s.id
            WHERE ($1::DATE IS NULL OR sm.created_at::DATE >= $1)
              AND ($2::DATE IS NULL OR sm.created_at::DATE <= $2)
              AND ($3::movement_type IS NULL OR sm.movement_type = $3)
              AND ($4::TEXT IS NULL OR sm.created_by ILIKE '%' || $4 || '%')
              AND ($5::BIGINT IS NULL OR sm.item_id = $5)
            ORDER BY sm.created_at DESC, sm.id DESC
            LIMIT $6 OFFSET $7
            "#,
        )
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(filter.movement_type)
            .bind(filter.created_by.as_deref())
            .bind(filter.item_id)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(executor)
            .await?;
        Ok(entries)
    }

    pub async fn count_activity<'e, E>(
        &self,
        executor: E,
        filter: &ActivityFilter,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM stock_movements sm
            WHERE ($1::DATE IS NULL OR sm.created_at::DATE >= $1)
              AND ($2::DATE IS NULL OR sm.created_at::DATE <= $2)
              AND ($3::movement_type IS NULL OR sm.movement_type = $3)
              AND ($4::TEXT IS NULL OR sm.created_by ILIKE '%' || $4 || '%')
              AND ($5::BIGINT IS NULL OR sm.item_id = $5)
            "#,
        )
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(filter.movement_type)
            .bind(filter.created_by.as_deref())
            .bind(filter.item_id)
            .fetch_one(executor)
            .await?;
        Ok(total)
    }

    pub async fn get_activity_users<'e, E>(&self, executor: E) -> Result<Vec<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let users: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT created_by
            FROM stock_movements
            WHERE created_by IS NOT NULL
            ORDER BY created_by
            "#,
        )
            .fetch_all(executor)
            .await?;
        Ok(users)
    }
}
