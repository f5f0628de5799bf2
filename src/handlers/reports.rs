// src/handlers/reports.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::{
    common::error::ApiError,
    config::AppState,
    models::{
        inventory::MovementType,
        report::{ActivityFilter, ReportPeriod},
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl PeriodQuery {
    fn resolve(&self, today: NaiveDate) -> Result<ReportPeriod, ApiError> {
        let period = ReportPeriod::resolve(self.start_date, self.end_date, today);
        if period.start_date > period.end_date {
            return Err(ApiError::bad_request("start_date must not be after end_date."));
        }
        Ok(period)
    }
}

// GET /api/inventory/profit
pub async fn get_profit(
    State(app_state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let period = query.resolve(Utc::now().date_naive())?;

    let report = app_state.report_service
        .calculate_profit(&app_state.db_pool, period)
        .await?;

    Ok((StatusCode::OK, Json(report)))
}

// GET /api/inventory/summary
pub async fn get_summary(
    State(app_state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let period = query.resolve(Utc::now().date_naive())?;

    let summary = app_state.report_service
        .get_summary(&app_state.db_pool, period)
        .await?;

    Ok((StatusCode::OK, Json(summary)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<i32>,
}

// GET /api/inventory/expiring
pub async fn get_expiring(
    State(app_state): State<AppState>,
    Query(query): Query<ExpiringQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let batches = app_state.report_service
        .get_expiring_items(&app_state.db_pool, query.days)
        .await?;

    Ok((StatusCode::OK, Json(batches)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub movement_type: Option<MovementType>,
    pub created_by: Option<String>,
    pub item_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<ActivityQuery> for ActivityFilter {
    fn from(query: ActivityQuery) -> Self {
        Self {
            start_date: query.start_date,
            end_date: query.end_date,
            movement_type: query.movement_type,
            created_by: query.created_by.filter(|c| !c.trim().is_empty()),
            item_id: query.item_id,
            // Valores não positivos caem nos padrões do serviço.
            limit: query.limit.unwrap_or(0),
            offset: query.offset.unwrap_or(0),
        }
    }
}

// GET /api/inventory/activity-log
pub async fn get_activity_log(
    State(app_state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let log = app_state.report_service
        .get_activity_log(&app_state.db_pool, ActivityFilter::from(query))
        .await?;

    Ok((StatusCode::OK, Json(log)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_period_is_month_to_date() {
        let period = PeriodQuery::default().resolve(date(2026, 2, 14)).unwrap();
        assert_eq!(period.start_date, date(2026, 2, 1));
        assert_eq!(period.end_date, date(2026, 2, 14));
    }

    #[test]
    fn inverted_period_is_rejected() {
        let query = PeriodQuery {
            start_date: Some(date(2026, 3, 10)),
            end_date: Some(date(2026, 3, 1)),
        };
        let err = query.resolve(date(2026, 3, 31)).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn activity_query_parses_snake_case_params() {
        let query: ActivityQuery = serde_json::from_value(serde_json::json!({
            "movement_type": "sale",
            "created_by": "  ",
            "item_id": 4,
            "limit": 25
        }))
        .unwrap();

        let filter = ActivityFilter::from(query);

        assert_eq!(filter.movement_type, Some(MovementType::Sale));
        assert_eq!(filter.created_by, None);
        assert_eq!(filter.item_id, Some(4));
        assert_eq!(filter.limit, 25);
        assert_eq!(filter.offset, 0);
    }
}
