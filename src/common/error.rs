// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Insufficient stock. Available: {available}, Required: {required}")]
    InsufficientStock { available: i64, required: i64 },

    #[error("Item {0} not found")]
    ItemNotFound(i64),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    // Falhas de transação: conexão, constraint violada, deadlock.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InsufficientStock { .. } => StatusCode::CONFLICT,
            AppError::ItemNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidQuantity(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Formato de erro devolvido por extractors e handlers.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = err.status();
        match err {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                ApiError {
                    status,
                    message: "One or more fields are invalid.".to_string(),
                    details: Some(json!(details)),
                }
            }
            AppError::InsufficientStock { available, required } => ApiError {
                status,
                message: format!(
                    "Insufficient stock. Available: {available}, Required: {required}"
                ),
                details: Some(json!({ "available": available, "required": required })),
            },
            AppError::ItemNotFound(_) | AppError::InvalidQuantity(_) => ApiError {
                status,
                message: err.to_string(),
                details: None,
            },
            // O detalhe vai para o log; o cliente recebe uma mensagem genérica.
            ref e => {
                tracing::error!("Internal server error: {}", e);
                ApiError {
                    status,
                    message: "The operation failed unexpectedly.".to_string(),
                    details: None,
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "success": false, "message": self.message, "details": details }),
            None => json!({ "success": false, "message": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_maps_to_conflict_with_amounts() {
        let api = ApiError::from(AppError::InsufficientStock {
            available: 4,
            required: 7,
        });
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.message, "Insufficient stock. Available: 4, Required: 7");
        let details = api.details.expect("details present");
        assert_eq!(details["available"], 4);
        assert_eq!(details["required"], 7);
    }

    #[test]
    fn not_found_and_invalid_quantity_keep_their_message() {
        let api = ApiError::from(AppError::ItemNotFound(42));
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.message, "Item 42 not found");

        let api = ApiError::from(AppError::InvalidQuantity("must be positive".into()));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert!(api.message.contains("must be positive"));
    }

    #[test]
    fn database_errors_are_hidden_behind_a_generic_message() {
        let api = ApiError::from(AppError::DatabaseError(sqlx::Error::RowNotFound));
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message, "The operation failed unexpectedly.");
        assert!(api.details.is_none());
    }

    #[test]
    fn validation_errors_list_fields() {
        let mut errors = validator::ValidationErrors::new();
        let mut err = validator::ValidationError::new("range");
        err.message = Some("Quantity must be at least 1".into());
        errors.add("quantity", err);

        let api = ApiError::from(AppError::ValidationError(errors));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.expect("details present");
        assert_eq!(details["quantity"][0], "Quantity must be at least 1");
    }
}
