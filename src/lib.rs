// src/lib.rs

use axum::{
    routing::{get, post},
    Router,
};

pub mod common;
pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::config::AppState;

/// Rotas HTTP completas do serviço, com o estado anexado.
pub fn app(app_state: AppState) -> Router {
    let inventory_routes = Router::new()
        .route("/purchase", post(handlers::inventory::record_purchase))
        .route("/deduct", post(handlers::inventory::deduct_stock))
        .route("/adjust", post(handlers::inventory::adjust_stock))
        .route("/batches", get(handlers::inventory::list_batches))
        .route("/batches/{item_id}", get(handlers::inventory::get_item_batches))
        .route("/movements/{item_id}", get(handlers::inventory::get_movements))
        .route("/items/{item_id}/stock", get(handlers::inventory::get_item_stock))
        .route("/activity-log", get(handlers::reports::get_activity_log))
        .route("/expiring", get(handlers::reports::get_expiring))
        .route("/profit", get(handlers::reports::get_profit))
        .route("/summary", get(handlers::reports::get_summary));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/inventory", inventory_routes)
        .with_state(app_state)
}
