// src/handlers/inventory.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::actor::Actor,
    models::inventory::{BatchFilter, RecordPurchase},
};

// ---
// Validação customizada
// ---
fn validate_positive_price(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("The cost price must be greater than zero.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_non_zero(val: i32) -> Result<(), ValidationError> {
    if val == 0 {
        let mut err = ValidationError::new("non_zero");
        err.message = Some("The adjustment must not be zero.".into());
        return Err(err);
    }
    Ok(())
}

fn validated<T: Validate>(payload: &T) -> Result<(), ApiError> {
    payload.validate().map_err(|e| ApiError::from(AppError::ValidationError(e)))
}

// ---
// Payload: RecordPurchase
// ---
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordPurchasePayload {
    #[validate(range(min = 1, message = "An item must be selected."))]
    pub item_id: i64,

    pub supplier_id: Option<i64>,

    #[validate(length(max = 100, message = "The batch number is too long."))]
    pub batch_number: Option<String>,

    // Padrão: hoje.
    pub purchase_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,

    #[validate(custom(function = "validate_positive_price"))]
    pub cost_price: Decimal,

    #[validate(range(min = 1, max = 1_000_000, message = "The quantity must be between 1 and 1000000."))]
    pub quantity: i32,

    pub invoice_number: Option<String>,
    pub notes: Option<String>,
}

impl RecordPurchasePayload {
    fn into_purchase(self, today: NaiveDate, actor: Actor) -> RecordPurchase {
        RecordPurchase {
            item_id: self.item_id,
            supplier_id: self.supplier_id,
            batch_number: self.batch_number.filter(|b| !b.trim().is_empty()),
            purchase_date: self.purchase_date.unwrap_or(today),
            expiry_date: self.expiry_date,
            cost_price: self.cost_price,
            quantity: self.quantity,
            invoice_number: self.invoice_number,
            notes: self.notes,
            created_by: actor.0,
        }
    }
}

// POST /api/inventory/purchase
pub async fn record_purchase(
    State(app_state): State<AppState>,
    actor: Actor,
    Json(payload): Json<RecordPurchasePayload>,
) -> Result<impl IntoResponse, ApiError> {
    validated(&payload)?;

    let purchase = payload.into_purchase(Utc::now().date_naive(), actor);
    let recorded = app_state
        .inventory_service
        .record_purchase(&app_state.db_pool, &purchase)
        .await?;

    Ok((StatusCode::CREATED, Json(recorded)))
}

// ---
// Payload: Baixa
// ---
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeductStockPayload {
    #[validate(range(min = 1, message = "An item must be selected."))]
    pub item_id: i64,

    #[validate(range(min = 1, max = 1_000_000, message = "The quantity must be between 1 and 1000000."))]
    pub quantity: i32,

    // ex.: "sale", "billing"; padrão "manual".
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
}

// POST /api/inventory/deduct
pub async fn deduct_stock(
    State(app_state): State<AppState>,
    actor: Actor,
    Json(payload): Json<DeductStockPayload>,
) -> Result<impl IntoResponse, ApiError> {
    validated(&payload)?;

    let reference_type = payload.reference_type.as_deref().unwrap_or("manual");
    let result = app_state
        .inventory_service
        .deduct_stock_fifo(
            &app_state.db_pool,
            payload.item_id,
            payload.quantity,
            reference_type,
            payload.reference_id.as_deref(),
            actor.as_str(),
        )
        .await?;

    Ok((StatusCode::OK, Json(result)))
}

// ---
// Payload: Ajuste
// ---
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockPayload {
    #[validate(range(min = 1, message = "An item must be selected."))]
    pub item_id: i64,

    #[validate(
        custom(function = "validate_non_zero"),
        range(min = -1_000_000, max = 1_000_000, message = "The adjustment is out of range.")
    )]
    pub adjustment: i32,

    pub reason: Option<String>,
}

// POST /api/inventory/adjust
pub async fn adjust_stock(
    State(app_state): State<AppState>,
    actor: Actor,
    Json(payload): Json<AdjustStockPayload>,
) -> Result<impl IntoResponse, ApiError> {
    validated(&payload)?;

    let recorded = app_state
        .inventory_service
        .adjust_stock(
            &app_state.db_pool,
            payload.item_id,
            payload.adjustment,
            payload.reason.as_deref().filter(|r| !r.trim().is_empty()),
            actor.as_str(),
        )
        .await?;

    Ok((StatusCode::OK, Json(recorded)))
}

// ---
// Lotes
// ---
#[derive(Debug, Default, Deserialize)]
pub struct BatchListQuery {
    pub item_id: Option<i64>,
    pub supplier_id: Option<i64>,
    #[serde(default)]
    pub include_empty: bool,
}

// GET /api/inventory/batches
pub async fn list_batches(
    State(app_state): State<AppState>,
    Query(query): Query<BatchListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = BatchFilter {
        item_id: query.item_id,
        supplier_id: query.supplier_id,
        include_empty: query.include_empty,
    };
    let batches = app_state
        .inventory_service
        .list_batches(&app_state.db_pool, &filter)
        .await?;

    Ok((StatusCode::OK, Json(batches)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemBatchesQuery {
    #[serde(default)]
    pub include_empty: bool,
}

// GET /api/inventory/batches/{item_id}
pub async fn get_item_batches(
    State(app_state): State<AppState>,
    Path(item_id): Path<i64>,
    Query(query): Query<ItemBatchesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let batches = app_state
        .inventory_service
        .get_batches(&app_state.db_pool, item_id, query.include_empty)
        .await?;

    Ok((StatusCode::OK, Json(batches)))
}

// ---
// Movimentações e retrato do estoque
// ---
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// GET /api/inventory/movements/{item_id}
pub async fn get_movements(
    State(app_state): State<AppState>,
    Path(item_id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let movements = app_state
        .inventory_service
        .get_movements(&app_state.db_pool, item_id, page.limit, page.offset)
        .await?;

    Ok((StatusCode::OK, Json(movements)))
}

// GET /api/inventory/items/{item_id}/stock
pub async fn get_item_stock(
    State(app_state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let stock = app_state
        .inventory_service
        .get_item_stock(&app_state.db_pool, item_id)
        .await?;

    Ok((StatusCode::OK, Json(stock)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn purchase_payload(body: serde_json::Value) -> RecordPurchasePayload {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn purchase_payload_accepts_camel_case_body() {
        let payload = purchase_payload(json!({
            "itemId": 7,
            "costPrice": 1250.5,
            "quantity": 10,
            "expiryDate": "2027-03-31",
            "batchNumber": "LOT-22A"
        }));

        assert!(payload.validate().is_ok());
        assert_eq!(payload.cost_price, Decimal::new(12505, 1));
    }

    #[test]
    fn purchase_requires_positive_quantity_and_cost() {
        let payload = purchase_payload(json!({ "itemId": 7, "costPrice": 0, "quantity": 0 }));

        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("cost_price"));
        assert!(fields.contains_key("quantity"));
    }

    #[test]
    fn purchase_date_defaults_to_today_and_actor_is_recorded() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let payload = purchase_payload(json!({
            "itemId": 3, "costPrice": 10, "quantity": 2, "batchNumber": "  "
        }));

        let purchase = payload.into_purchase(today, Actor("apoteker".into()));

        assert_eq!(purchase.purchase_date, today);
        assert_eq!(purchase.created_by, "apoteker");
        assert_eq!(purchase.batch_number, None);
    }

    #[test]
    fn deduct_rejects_missing_item_and_negative_quantity() {
        let payload: DeductStockPayload =
            serde_json::from_value(json!({ "itemId": 0, "quantity": -3 })).unwrap();

        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("item_id"));
        assert!(errors.field_errors().contains_key("quantity"));
    }

    #[test]
    fn zero_adjustment_is_rejected() {
        let payload: AdjustStockPayload =
            serde_json::from_value(json!({ "itemId": 1, "adjustment": 0 })).unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn negative_adjustment_is_allowed() {
        let payload: AdjustStockPayload =
            serde_json::from_value(json!({ "itemId": 1, "adjustment": -4, "reason": "Broken vial" }))
                .unwrap();
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn validation_errors_become_bad_request() {
        let payload: AdjustStockPayload =
            serde_json::from_value(json!({ "itemId": 1, "adjustment": 0 })).unwrap();

        let err = validated(&payload).unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.details.is_some());
    }
}
