// src/db/inventory_repo.rs

use sqlx::{Executor, Postgres};
use rust_decimal::Decimal;
use crate::{
    common::error::AppError,
    models::inventory::{
        BatchFilter, BatchListing, BatchStock, ItemBatch, ItemStockRow, LockedItem, NewBatch,
        NewMovement, StockMovement,
    },
};

#[derive(Clone, Default)]
pub struct InventoryRepository;

impl InventoryRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // Contador do item
    // ---

    /// Trava a linha do item até o fim da transação. Toda mutação de
    /// estoque pega esta trava primeiro, então mutações no mesmo item rodam uma por vez.
    pub async fn lock_item<'e, E>(
        &self,
        executor: E,
        item_id: i64,
    ) -> Result<Option<LockedItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, LockedItem>(
            "SELECT id, stock, default_cost_price FROM items WHERE id = $1 FOR UPDATE",
        )
            .bind(item_id)
            .fetch_optional(executor)
            .await?;
        Ok(item)
    }

    /// Soma um delta com sinal ao contador agregado e devolve o novo valor.
    pub async fn change_item_stock<'e, E>(
        &self,
        executor: E,
        item_id: i64,
        delta: i32,
    ) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stock: i32 = sqlx::query_scalar(
            r#"
            UPDATE items
            SET stock = stock + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING stock
            "#,
        )
            .bind(item_id)
            .bind(delta)
            .fetch_one(executor)
            .await?;
        Ok(stock)
    }

    /// Preço da primeira compra: só preenche um padrão nulo ou zero.
    pub async fn set_default_cost_if_unset<'e, E>(
        &self,
        executor: E,
        item_id: i64,
        cost_price: Decimal,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET default_cost_price = $2
            WHERE id = $1 AND (default_cost_price IS NULL OR default_cost_price = 0)
            "#,
        )
            .bind(item_id)
            .bind(cost_price)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_item_stock<'e, E>(
        &self,
        executor: E,
        item_id: i64,
    ) -> Result<Option<ItemStockRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, ItemStockRow>(
            r#"
            SELECT
                i.id AS item_id, i.code, i.name, i.price, i.stock, i.min_stock,
                i.default_cost_price,
                COALESCE(
                    (SELECT SUM(b.quantity_remaining) FROM item_batches b WHERE b.item_id = i.id),
                    0
                )::BIGINT AS batch_remaining
            FROM items i
            WHERE i.id = $1
            "#,
        )
            .bind(item_id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    // ---
    // Lotes
    // ---

    /// Lotes abertos em ordem FIFO, travados até o fim da transação.
    pub async fn batches_for_consumption<'e, E>(
        &self,
        executor: E,
        item_id: i64,
    ) -> Result<Vec<BatchStock>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let batches = sqlx::query_as::<_, BatchStock>(
            r#"
            SELECT id, quantity_remaining, cost_price
            FROM item_batches
            WHERE item_id = $1 AND quantity_remaining > 0
            ORDER BY purchase_date ASC, id ASC
            FOR UPDATE
            "#,
        )
            .bind(item_id)
            .fetch_all(executor)
            .await?;
        Ok(batches)
    }

    /// Média simples dos custos dos lotes abertos.
    pub async fn average_open_cost<'e, E>(
        &self,
        executor: E,
        item_id: i64,
    ) -> Result<Option<Decimal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let avg: Option<Decimal> = sqlx::query_scalar(
            "SELECT AVG(cost_price) FROM item_batches WHERE item_id = $1 AND quantity_remaining > 0",
        )
            .bind(item_id)
            .fetch_one(executor)
            .await?;
        Ok(avg)
    }

    pub async fn insert_batch<'e, E>(
        &self,
        executor: E,
        batch: &NewBatch<'_>,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO item_batches
                (item_id, supplier_id, batch_number, purchase_date, expiry_date,
                 cost_price, quantity_purchased, quantity_remaining, invoice_number, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
            .bind(batch.item_id)
            .bind(batch.supplier_id)
            .bind(batch.batch_number)
            .bind(batch.purchase_date)
            .bind(batch.expiry_date)
            .bind(batch.cost_price)
            .bind(batch.quantity)
            .bind(batch.invoice_number)
            .bind(batch.notes)
            .bind(batch.created_by)
            .fetch_one(executor)
            .await?;
        Ok(id)
    }

    pub async fn decrement_batch<'e, E>(
        &self,
        executor: E,
        batch_id: i64,
        quantity: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE item_batches SET quantity_remaining = quantity_remaining - $2 WHERE id = $1",
        )
            .bind(batch_id)
            .bind(quantity)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn get_batches<'e, E>(
        &self,
        executor: E,
        item_id: i64,
        include_empty: bool,
    ) -> Result<Vec<ItemBatch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let batches = sqlx::query_as::<_, ItemBatch>(
            r#"
            SELECT ob.id, ob.item_id, ob.supplier_id, ob.batch_number, ob.purchase_date,
                   ob.expiry_date, ob.cost_price, ob.quantity_purchased, ob.quantity_remaining,
                   ob.invoice_number, ob.notes, ob.created_by, ob.created_at,
                   s.name AS supplier_name, s.code AS supplier_code
            FROM item_batches ob
            LEFT JOIN suppliers s ON ob.supplier_id = s.id
            WHERE ob.item_id = $1
              AND ($2 OR ob.quantity_remaining > 0)
            ORDER BY ob.purchase_date ASC, ob.id ASC
            "#,
        )
            .bind(item_id)
            .bind(include_empty)
            .fetch_all(executor)
            .await?;
        Ok(batches)
    }

    /// Lotes de todos os itens, compra mais recente primeiro.
    pub async fn list_batches<'e, E>(
        &self,
        executor: E,
        filter: &BatchFilter,
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
            WHERE ($1::BIGINT IS NULL OR ob.item_id = $1)
              AND ($2::BIGINT IS NULL OR ob.supplier_id = $2)
              AND ($3 OR ob.quantity_remaining > 0)
            ORDER BY ob.purchase_date DESC, ob.id DESC
            "#,
        )
            .bind(filter.item_id)
            .bind(filter.supplier_id)
            .bind(filter.include_empty)
            .fetch_all(executor)
            .await?;
        Ok(batches)
    }

    // ---
    // Movimentações
    // ---

    pub async fn insert_movement<'e, E>(
        &self,
        executor: E,
        movement: &NewMovement<'_>,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO stock_movements
                (item_id, batch_id, movement_type, quantity, cost_price,
                 reference_type, reference_id, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
            .bind(movement.item_id)
            .bind(movement.batch_id)
            .bind(movement.movement_type)
            .bind(movement.quantity)
            .bind(movement.cost_price)
            .bind(movement.reference_type)
            .bind(movement.reference_id)
            .bind(movement.notes)
            .bind(movement.created_by)
            .fetch_one(executor)
            .await?;
        Ok(id)
    }

    /// Histórico de movimentações de um item, mais recente primeiro.
    pub async fn get_movements<'e, E>(
        &self,
        executor: E,
        item_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StockMovement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT sm.id, sm.item_id, sm.batch_id, sm.movement_type, sm.quantity, sm.cost_price,
                   sm.reference_type, sm.reference_id, sm.notes, sm.created_by, sm.created_at,
                   ob.batch_number
            FROM stock_movements sm
            LEFT JOIN item_batches ob ON sm.batch_id = ob.id
            WHERE sm.item_id = $1
            ORDER BY sm.created_at DESC, sm.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
            .bind(item_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await?;
        Ok(movements)
    }
}
