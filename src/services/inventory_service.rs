// src/services/inventory_service.rs

use crate::{
    common::{
        cache::{item_cache_key, CacheTier, TieredCache, ITEM_CACHE_PREFIX},
        db_utils::finish_transaction,
        error::AppError,
    },
    db::InventoryRepository,
    models::inventory::{
        AdjustmentRecorded, BatchFilter, BatchListing, DeductionResult, ItemBatch, ItemStock,
        MovementType, NewBatch, NewMovement, PurchaseRecorded, RecordPurchase, StockMovement,
    },
    services::fifo::FifoPlan,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use tracing::instrument;

pub const DEFAULT_MOVEMENTS_LIMIT: i64 = 50;
pub const MAX_MOVEMENTS_LIMIT: i64 = 1000;
const LEGACY_DEDUCTION_NOTE: &str = "Legacy stock (no batch)";

#[derive(Clone)]
pub struct InventoryService {
    inventory_repo: InventoryRepository,
    cache: TieredCache<ItemStock>,
}

impl InventoryService {
    pub fn new(inventory_repo: InventoryRepository, cache: TieredCache<ItemStock>) -> Self {
        Self { inventory_repo, cache }
    }

    async fn invalidate_item_views(&self) {
        self.cache.invalidate_prefix(ITEM_CACHE_PREFIX).await;
    }

    // --- REGISTRAR COMPRA (NOVO LOTE) ---
    #[instrument(skip(self, db), fields(item_id = purchase.item_id, quantity = purchase.quantity))]
    pub async fn record_purchase<'e, A>(
        &self,
        db: A,
        purchase: &RecordPurchase,
    ) -> Result<PurchaseRecorded, AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        if purchase.quantity <= 0 {
            return Err(AppError::InvalidQuantity(format!(
                "purchase quantity must be positive, got {}",
                purchase.quantity
            )));
        }

        let mut tx = db.begin().await?;
        let outcome = self.record_purchase_in(&mut tx, purchase).await;
        let recorded = finish_transaction(tx, outcome, "record_purchase").await?;

        self.invalidate_item_views().await;
        tracing::info!(
            item_id = purchase.item_id,
            quantity = purchase.quantity,
            batch_id = recorded.batch_id,
            "purchase recorded"
        );
        Ok(recorded)
    }

    async fn record_purchase_in(
        &self,
        conn: &mut PgConnection,
        purchase: &RecordPurchase,
    ) -> Result<PurchaseRecorded, AppError> {
        self.inventory_repo
            .lock_item(&mut *conn, purchase.item_id)
            .await?
            .ok_or(AppError::ItemNotFound(purchase.item_id))?;

        // 1. Novo lote, quantidade cheia restante
        let batch_id = self.inventory_repo.insert_batch(&mut *conn, &NewBatch {
            item_id: purchase.item_id,
            supplier_id: purchase.supplier_id,
            batch_number: purchase.batch_number.as_deref(),
            purchase_date: purchase.purchase_date,
            expiry_date: purchase.expiry_date,
            cost_price: purchase.cost_price,
            quantity: purchase.quantity,
            invoice_number: purchase.invoice_number.as_deref(),
            notes: purchase.notes.as_deref(),
            created_by: &purchase.created_by,
        }).await?;

        // 2. Movimentação apontando para o lote
        let batch_ref = batch_id.to_string();
        let movement_id = self.inventory_repo.insert_movement(&mut *conn, &NewMovement {
            item_id: purchase.item_id,
            batch_id: Some(batch_id),
            movement_type: MovementType::Purchase,
            quantity: purchase.quantity,
            cost_price: purchase.cost_price,
            reference_type: Some("purchase"),
            reference_id: Some(&batch_ref),
            notes: purchase.notes.as_deref(),
            created_by: &purchase.created_by,
        }).await?;

        // 3. Contador agregado
        let stock = self.inventory_repo
            .change_item_stock(&mut *conn, purchase.item_id, purchase.quantity)
            .await?;

        // 4. A primeira compra define o custo padrão
        self.inventory_repo
            .set_default_cost_if_unset(&mut *conn, purchase.item_id, purchase.cost_price)
            .await?;

        Ok(PurchaseRecorded { success: true, batch_id, movement_id, stock })
    }

    // --- BAIXA DE ESTOQUE (FIFO) ---
    /// Tira `quantity` dos lotes abertos mais antigos. Itens sem lote aberto
    /// usam o contador agregado. Nada é gravado se a quantidade inteira
    /// não estiver disponível.
    #[instrument(skip(self, db))]
    pub async fn deduct_stock_fifo<'e, A>(
        &self,
        db: A,
        item_id: i64,
        quantity: i32,
        reference_type: &str,
        reference_id: Option<&str>,
        actor: &str,
    ) -> Result<DeductionResult, AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        if quantity <= 0 {
            return Err(AppError::InvalidQuantity(format!(
                "deduction quantity must be positive, got {quantity}"
            )));
        }

        let mut tx = db.begin().await?;
        let outcome = self
            .deduct_stock_fifo_in(&mut tx, item_id, quantity, reference_type, reference_id, actor)
            .await;
        let result = finish_transaction(tx, outcome, "deduct_stock_fifo").await?;

        self.invalidate_item_views().await;
        let legacy = result.deductions.iter().any(|d| d.legacy);
        tracing::info!(
            item_id,
            quantity,
            total_cost = %result.total_cost,
            legacy,
            "stock deducted"
        );
        Ok(result)
    }

    async fn deduct_stock_fifo_in(
        &self,
        conn: &mut PgConnection,
        item_id: i64,
        quantity: i32,
        reference_type: &str,
        reference_id: Option<&str>,
        actor: &str,
    ) -> Result<DeductionResult, AppError> {
        let item = self.inventory_repo
            .lock_item(&mut *conn, item_id)
            .await?
            .ok_or(AppError::ItemNotFound(item_id))?;

        let batches = self.inventory_repo
            .batches_for_consumption(&mut *conn, item_id)
            .await?;

        let plan = if batches.is_empty() {
            FifoPlan::legacy(item.stock, item.default_cost_price, quantity)?
        } else {
            FifoPlan::build(&batches, quantity)?
        };

        for slice in &plan.slices {
            if let Some(batch_id) = slice.batch_id {
                self.inventory_repo
                    .decrement_batch(&mut *conn, batch_id, slice.quantity)
                    .await?;
            }

            self.inventory_repo.insert_movement(&mut *conn, &NewMovement {
                item_id,
                batch_id: slice.batch_id,
                movement_type: MovementType::Sale,
                quantity: -slice.quantity,
                cost_price: slice.cost_price,
                reference_type: Some(reference_type),
                reference_id,
                notes: slice.legacy.then_some(LEGACY_DEDUCTION_NOTE),
                created_by: actor,
            }).await?;
        }

        // Uma atualização do contador para o pedido inteiro
        self.inventory_repo
            .change_item_stock(&mut *conn, item_id, -quantity)
            .await?;

        Ok(plan.into_result())
    }

    // --- AJUSTE MANUAL ---
    /// Aplica uma correção manual com sinal. Ajustes positivos abrem um
    /// lote sintético no custo padrão; negativos consomem os lotes abertos em
    /// ordem FIFO até onde alcançarem.
    #[instrument(skip(self, db))]
    pub async fn adjust_stock<'e, A>(
        &self,
        db: A,
        item_id: i64,
        adjustment: i32,
        reason: Option<&str>,
        actor: &str,
    ) -> Result<AdjustmentRecorded, AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        if adjustment == 0 {
            return Err(AppError::InvalidQuantity("adjustment must not be zero".into()));
        }

        let mut tx = db.begin().await?;
        let outcome = self.adjust_stock_in(&mut tx, item_id, adjustment, reason, actor).await;
        let recorded = finish_transaction(tx, outcome, "adjust_stock").await?;

        self.invalidate_item_views().await;
        tracing::info!(item_id, adjustment, stock = recorded.stock, "stock adjusted");
        Ok(recorded)
    }

    async fn adjust_stock_in(
        &self,
        conn: &mut PgConnection,
        item_id: i64,
        adjustment: i32,
        reason: Option<&str>,
        actor: &str,
    ) -> Result<AdjustmentRecorded, AppError> {
        let item = self.inventory_repo
            .lock_item(&mut *conn, item_id)
            .await?
            .ok_or(AppError::ItemNotFound(item_id))?;

        // 1. Custo representativo do que está na prateleira
        let cost_price = self.inventory_repo
            .average_open_cost(&mut *conn, item_id)
            .await?
            .map(|avg| avg.round_dp(2))
            .unwrap_or(Decimal::ZERO);

        // 2. Movimentação
        let movement_id = self.inventory_repo.insert_movement(&mut *conn, &NewMovement {
            item_id,
            batch_id: None,
            movement_type: MovementType::Adjustment,
            quantity: adjustment,
            cost_price,
            reference_type: Some("manual"),
            reference_id: None,
            notes: reason,
            created_by: actor,
        }).await?;

        // 3. Contador, como correção manual
        let stock = self.inventory_repo
            .change_item_stock(&mut *conn, item_id, adjustment)
            .await?;

        // 4. Mantém os lotes alinhados ao contador
        let mut batch_id = None;
        let mut drained = Vec::new();
        if adjustment > 0 {
            let notes = format!("Adjustment: {}", reason.unwrap_or("Manual"));
            batch_id = Some(self.inventory_repo.insert_batch(&mut *conn, &NewBatch {
                item_id,
                supplier_id: None,
                batch_number: None,
                purchase_date: Utc::now().date_naive(),
                expiry_date: None,
                cost_price: item.default_cost_price.unwrap_or(Decimal::ZERO),
                quantity: adjustment,
                invoice_number: None,
                notes: Some(notes.as_str()),
                created_by: actor,
            }).await?);
        } else {
            let batches = self.inventory_repo
                .batches_for_consumption(&mut *conn, item_id)
                .await?;
            let plan = FifoPlan::drain(&batches, adjustment.saturating_neg());
            for slice in &plan.slices {
                if let Some(id) = slice.batch_id {
                    self.inventory_repo.decrement_batch(&mut *conn, id, slice.quantity).await?;
                }
            }
            drained = plan.slices;
        }

        Ok(AdjustmentRecorded { success: true, movement_id, stock, batch_id, drained })
    }

    // --- LEITURAS ---

    pub async fn get_batches<'e, E>(
        &self,
        executor: E,
        item_id: i64,
        include_empty: bool,
    ) -> Result<Vec<ItemBatch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.inventory_repo.get_batches(executor, item_id, include_empty).await
    }

    pub async fn list_batches<'e, E>(
        &self,
        executor: E,
        filter: &BatchFilter,
    ) -> Result<Vec<BatchListing>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.inventory_repo.list_batches(executor, filter).await
    }

    pub async fn get_movements<'e, E>(
        &self,
        executor: E,
        item_id: i64,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<StockMovement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_MOVEMENTS_LIMIT)
            .min(MAX_MOVEMENTS_LIMIT);
        let offset = offset.filter(|o| *o >= 0).unwrap_or(0);
        self.inventory_repo.get_movements(executor, item_id, limit, offset).await
    }

    /// Retrato do estoque de um item, servido do nível médio do cache.
    pub async fn get_item_stock<'e, E>(
        &self,
        executor: E,
        item_id: i64,
    ) -> Result<ItemStock, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let key = item_cache_key(item_id);
        self.cache
            .get_or_try_insert_with(&key, CacheTier::Medium, async move {
                self.inventory_repo
                    .get_item_stock(executor, item_id)
                    .await?
                    .map(ItemStock::from)
                    .ok_or(AppError::ItemNotFound(item_id))
            })
            .await
    }
}
