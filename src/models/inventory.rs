// src/models/inventory.rs

use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc, NaiveDate};
use rust_decimal::Decimal;
use sqlx::FromRow;

// --- 1. Tipo de movimentação ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "movement_type", rename_all = "lowercase")] // Banco
#[serde(rename_all = "lowercase")] // JSON
pub enum MovementType {
    Purchase,
    Sale,
    Adjustment,
}

// --- 2. Linha do item travada para mutação de estoque ---
#[derive(Debug, Clone, FromRow)]
pub struct LockedItem {
    pub id: i64,
    pub stock: i32,
    pub default_cost_price: Option<Decimal>,
}

// --- 3. Retrato do estoque (em cache) ---
#[derive(Debug, Clone, FromRow)]
pub struct ItemStockRow {
    pub item_id: i64,
    pub code: String,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub min_stock: i32,
    pub default_cost_price: Option<Decimal>,
    pub batch_remaining: i64,
}

/// Contador agregado ao lado da soma dos lotes. `drift` é diferente de zero
/// com estoque legado ou depois de correções manuais.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStock {
    pub item_id: i64,
    pub code: String,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub min_stock: i32,
    pub default_cost_price: Option<Decimal>,
    pub batch_remaining: i64,
    pub drift: i64,
    pub low_stock: bool,
}

impl From<ItemStockRow> for ItemStock {
    fn from(row: ItemStockRow) -> Self {
        Self {
            drift: i64::from(row.stock) - row.batch_remaining,
            low_stock: row.stock <= row.min_stock,
            item_id: row.item_id,
            code: row.code,
            name: row.name,
            price: row.price,
            stock: row.stock,
            min_stock: row.min_stock,
            default_cost_price: row.default_cost_price,
            batch_remaining: row.batch_remaining,
        }
    }
}

// --- 4. Lotes ---

/// Saldo de um lote, em ordem FIFO.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct BatchStock {
    pub id: i64,
    pub quantity_remaining: i32,
    pub cost_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ItemBatch {
    pub id: i64,
    pub item_id: i64,
    pub supplier_id: Option<i64>,
    pub batch_number: Option<String>,
    pub purchase_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub cost_price: Decimal,
    pub quantity_purchased: i32,
    pub quantity_remaining: i32,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub supplier_name: Option<String>,
    pub supplier_code: Option<String>,
}

/// Lote com o item a que pertence, para listagens gerais e alertas de validade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BatchListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub batch: ItemBatch,
    pub item_name: String,
    pub item_code: String,
    pub selling_price: Decimal,
    pub days_until_expiry: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    pub item_id: Option<i64>,
    pub supplier_id: Option<i64>,
    pub include_empty: bool,
}

// Novo lote, comprado ou criado por um ajuste positivo.
#[derive(Debug, Clone)]
pub struct NewBatch<'a> {
    pub item_id: i64,
    pub supplier_id: Option<i64>,
    pub batch_number: Option<&'a str>,
    pub purchase_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub cost_price: Decimal,
    pub quantity: i32,
    pub invoice_number: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub created_by: &'a str,
}

// --- 5. Movimentações ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: i64,
    pub item_id: i64,
    pub batch_id: Option<i64>,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub cost_price: Decimal,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub batch_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMovement<'a> {
    pub item_id: i64,
    pub batch_id: Option<i64>,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub cost_price: Decimal,
    pub reference_type: Option<&'a str>,
    pub reference_id: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub created_by: &'a str,
}

// --- 6. Entradas e resultados das operações ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPurchase {
    pub item_id: i64,
    pub supplier_id: Option<i64>,
    pub batch_number: Option<String>,
    pub purchase_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub cost_price: Decimal,
    pub quantity: i32,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecorded {
    pub success: bool,
    pub batch_id: i64,
    pub movement_id: i64,
    pub stock: i32,
}

/// Uma parte da baixa: fatia de um lote, ou o pedido inteiro no modo legado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionSlice {
    pub batch_id: Option<i64>,
    pub quantity: i32,
    pub cost_price: Decimal,
    pub legacy: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionResult {
    pub success: bool,
    pub total_cost: Decimal,
    pub avg_cost_per_unit: Decimal,
    pub deductions: Vec<DeductionSlice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentRecorded {
    pub success: bool,
    pub movement_id: i64,
    pub stock: i32,
    // Preenchido quando um ajuste positivo abriu um lote sintético.
    pub batch_id: Option<i64>,
    // Unidades tiradas dos lotes por um ajuste negativo.
    pub drained: Vec<DeductionSlice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(stock: i32, min_stock: i32, batch_remaining: i64) -> ItemStockRow {
        ItemStockRow {
            item_id: 1,
            code: "PCT500".into(),
            name: "Paracetamol 500mg".into(),
            price: Decimal::from(2000),
            stock,
            min_stock,
            default_cost_price: Some(Decimal::from(1200)),
            batch_remaining,
        }
    }

    #[test]
    fn item_stock_reports_drift_against_batches() {
        let stock = ItemStock::from(row(20, 5, 12));
        assert_eq!(stock.drift, 8);
        assert!(!stock.low_stock);
    }

    #[test]
    fn item_stock_at_threshold_is_low() {
        let stock = ItemStock::from(row(5, 5, 5));
        assert_eq!(stock.drift, 0);
        assert!(stock.low_stock);
    }

    #[test]
    fn movement_type_uses_lowercase_json() {
        assert_eq!(serde_json::to_string(&MovementType::Sale).unwrap(), "\"sale\"");
        let parsed: MovementType = serde_json::from_str("\"adjustment\"").unwrap();
        assert_eq!(parsed, MovementType::Adjustment);
    }
}
